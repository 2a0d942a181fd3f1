//! Stage-gate evaluation.
//!
//! Each stage has a fixed list of named gates. A gate is built from the
//! [`ParticipantFacts`] recorded for the user and their partner, and
//! [`evaluate`] folds the list into an [`AdvanceDecision`].
//!
//! Gate kinds:
//! - [`GateKind::Hard`] -- the user's own work; always blocks.
//! - [`GateKind::Soft`] -- waiting on the partner; blocks unless forced.
//! - [`GateKind::Advisory`] -- shown to the user, never blocks.

use serde::Serialize;

use crate::stage::{Stage, StagePosition, StageStatus};

// ---------------------------------------------------------------------------
// Gate identifiers
// ---------------------------------------------------------------------------

pub const GATE_COMPACT_SIGNED: &str = "compactSigned";
pub const GATE_PARTNER_COMPACT_SIGNED: &str = "partnerCompactSigned";
pub const GATE_FEEL_HEARD: &str = "feelHeardConfirmed";
pub const GATE_EMOTION_CHECK_IN: &str = "emotionCheckIn";
pub const GATE_EMPATHY_SHARED: &str = "empathyShared";
pub const GATE_PARTNER_EMPATHY_VALIDATED: &str = "partnerEmpathyValidated";
pub const GATE_PARTNER_EMPATHY_REVIEWED: &str = "partnerEmpathyReviewed";
pub const GATE_NEEDS_CONFIRMED: &str = "needsConfirmed";
pub const GATE_NEEDS_SHARED: &str = "needsShared";
pub const GATE_PARTNER_NEEDS_SHARED: &str = "partnerNeedsShared";
pub const GATE_RANKING_SUBMITTED: &str = "rankingSubmitted";
pub const GATE_AGREEMENT_CONFIRMED: &str = "agreementConfirmed";

/// Reason reported when the user's current stage is not in progress.
pub const REASON_NOT_IN_PROGRESS: &str = "Current stage is not in progress";
/// Reason reported when the user has already finished the protocol.
pub const REASON_FINISHED: &str = "All stages are complete";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How a gate participates in the advance decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GateKind {
    Hard,
    Soft,
    Advisory,
}

/// A named precondition for leaving a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Gate {
    pub id: &'static str,
    pub description: &'static str,
    pub satisfied: bool,
    pub kind: GateKind,
    pub required_for_advance: bool,
}

impl Gate {
    fn new(id: &'static str, description: &'static str, kind: GateKind, satisfied: bool) -> Self {
        Self {
            id,
            description,
            satisfied,
            kind,
            required_for_advance: kind != GateKind::Advisory,
        }
    }

    /// Whether this gate stops the user from advancing.
    pub fn blocks(&self, force: bool) -> bool {
        if self.satisfied {
            return false;
        }
        match self.kind {
            GateKind::Hard => true,
            GateKind::Soft => !force,
            GateKind::Advisory => false,
        }
    }
}

/// Facts recorded by one participant that gates are computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParticipantFacts {
    pub compact_signed: bool,
    pub feel_heard_confirmed: bool,
    pub emotion_recorded: bool,
    pub empathy_shared: bool,
    /// The partner has validated this participant's empathy attempt.
    pub empathy_validated_by_partner: bool,
    /// This participant has validated (or rejected) the partner's attempt.
    pub reviewed_partner_empathy: bool,
    pub needs_confirmed: bool,
    pub needs_shared: bool,
    pub ranking_submitted: bool,
    pub agreement_confirmed: bool,
}

/// Outcome of the gate check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceDecision {
    pub can_advance: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
}

impl AdvanceDecision {
    fn allowed() -> Self {
        Self {
            can_advance: true,
            blocked_reason: None,
        }
    }

    fn blocked(reason: impl Into<String>) -> Self {
        Self {
            can_advance: false,
            blocked_reason: Some(reason.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Gate construction
// ---------------------------------------------------------------------------

/// Build the gate list for `stage` from the user's and partner's facts.
///
/// A missing partner (invitation not yet accepted) counts as a partner who
/// has recorded nothing.
pub fn gates_for(
    stage: Stage,
    own: &ParticipantFacts,
    partner: Option<&ParticipantFacts>,
) -> Vec<Gate> {
    let partner = partner.copied().unwrap_or_default();
    match stage {
        Stage::Compact => vec![
            Gate::new(
                GATE_COMPACT_SIGNED,
                "Sign the compact",
                GateKind::Hard,
                own.compact_signed,
            ),
            Gate::new(
                GATE_PARTNER_COMPACT_SIGNED,
                "Waiting for your partner to sign the compact",
                GateKind::Soft,
                partner.compact_signed,
            ),
        ],
        Stage::Witness => vec![
            Gate::new(
                GATE_FEEL_HEARD,
                "Confirm that you feel heard",
                GateKind::Hard,
                own.feel_heard_confirmed,
            ),
            Gate::new(
                GATE_EMOTION_CHECK_IN,
                "Record an emotional check-in",
                GateKind::Advisory,
                own.emotion_recorded,
            ),
        ],
        Stage::Empathy => vec![
            Gate::new(
                GATE_EMPATHY_SHARED,
                "Share your empathy attempt",
                GateKind::Hard,
                own.empathy_shared,
            ),
            // Satisfied only by a positive verdict. Verdicts are recorded
            // once, so a rejection leaves `force` as the only way past.
            Gate::new(
                GATE_PARTNER_EMPATHY_VALIDATED,
                "Waiting for your partner to validate your empathy attempt",
                GateKind::Soft,
                own.empathy_validated_by_partner,
            ),
            Gate::new(
                GATE_PARTNER_EMPATHY_REVIEWED,
                "Review your partner's empathy attempt",
                GateKind::Hard,
                own.reviewed_partner_empathy,
            ),
        ],
        Stage::Needs => vec![
            Gate::new(
                GATE_NEEDS_CONFIRMED,
                "Confirm your needs",
                GateKind::Hard,
                own.needs_confirmed,
            ),
            Gate::new(
                GATE_NEEDS_SHARED,
                "Share your needs with your partner",
                GateKind::Hard,
                own.needs_shared,
            ),
            Gate::new(
                GATE_PARTNER_NEEDS_SHARED,
                "Waiting for your partner to share their needs",
                GateKind::Soft,
                partner.needs_shared,
            ),
        ],
        Stage::Strategies => vec![
            Gate::new(
                GATE_RANKING_SUBMITTED,
                "Submit your strategy ranking",
                GateKind::Hard,
                own.ranking_submitted,
            ),
            Gate::new(
                GATE_AGREEMENT_CONFIRMED,
                "Confirm an agreement with your partner",
                GateKind::Hard,
                own.agreement_confirmed,
            ),
        ],
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Decide whether a user at `position` may advance past the given gates.
///
/// The blocked reason is the description of the first blocking gate, in
/// the order [`gates_for`] lists them. `force` only lifts soft gates.
pub fn evaluate(position: StagePosition, gates: &[Gate], force: bool) -> AdvanceDecision {
    if position.is_finished() {
        return AdvanceDecision::blocked(REASON_FINISHED);
    }
    if position.status != StageStatus::InProgress {
        return AdvanceDecision::blocked(REASON_NOT_IN_PROGRESS);
    }
    match gates.iter().find(|gate| gate.blocks(force)) {
        Some(gate) => AdvanceDecision::blocked(gate.description),
        None => AdvanceDecision::allowed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_progress(stage: Stage) -> StagePosition {
        StagePosition {
            stage,
            status: StageStatus::InProgress,
        }
    }

    #[test]
    fn compact_blocks_until_own_signature() {
        let own = ParticipantFacts::default();
        let gates = gates_for(Stage::Compact, &own, None);
        let decision = evaluate(in_progress(Stage::Compact), &gates, false);
        assert!(!decision.can_advance);
        assert_eq!(decision.blocked_reason.as_deref(), Some("Sign the compact"));
    }

    #[test]
    fn first_unsatisfied_gate_is_reported() {
        let own = ParticipantFacts {
            compact_signed: true,
            ..Default::default()
        };
        let gates = gates_for(Stage::Compact, &own, None);
        let decision = evaluate(in_progress(Stage::Compact), &gates, false);
        assert_eq!(
            decision.blocked_reason.as_deref(),
            Some("Waiting for your partner to sign the compact")
        );
    }

    #[test]
    fn force_lifts_soft_gates_only() {
        let own = ParticipantFacts {
            compact_signed: true,
            ..Default::default()
        };
        let gates = gates_for(Stage::Compact, &own, None);
        assert!(evaluate(in_progress(Stage::Compact), &gates, true).can_advance);

        let unsigned = gates_for(Stage::Compact, &ParticipantFacts::default(), None);
        let forced = evaluate(in_progress(Stage::Compact), &unsigned, true);
        assert!(!forced.can_advance, "hard gates survive force");
    }

    #[test]
    fn advisory_gates_never_block() {
        let own = ParticipantFacts {
            feel_heard_confirmed: true,
            emotion_recorded: false,
            ..Default::default()
        };
        let gates = gates_for(Stage::Witness, &own, None);
        let advisory = gates.iter().find(|g| g.id == GATE_EMOTION_CHECK_IN).unwrap();
        assert!(!advisory.required_for_advance);
        assert!(evaluate(in_progress(Stage::Witness), &gates, false).can_advance);
    }

    #[test]
    fn empathy_requires_share_validation_and_review() {
        let mut own = ParticipantFacts {
            empathy_shared: true,
            reviewed_partner_empathy: true,
            ..Default::default()
        };
        let gates = gates_for(Stage::Empathy, &own, None);
        let decision = evaluate(in_progress(Stage::Empathy), &gates, false);
        assert_eq!(
            decision.blocked_reason.as_deref(),
            Some("Waiting for your partner to validate your empathy attempt")
        );

        own.empathy_validated_by_partner = true;
        let gates = gates_for(Stage::Empathy, &own, None);
        assert!(evaluate(in_progress(Stage::Empathy), &gates, false).can_advance);
    }

    #[test]
    fn rejected_empathy_passes_only_with_force() {
        let own = ParticipantFacts {
            empathy_shared: true,
            reviewed_partner_empathy: true,
            empathy_validated_by_partner: false,
            ..Default::default()
        };
        let gates = gates_for(Stage::Empathy, &own, None);

        assert!(!evaluate(in_progress(Stage::Empathy), &gates, false).can_advance);
        assert!(evaluate(in_progress(Stage::Empathy), &gates, true).can_advance);
    }

    #[test]
    fn needs_wait_for_partner_share() {
        let own = ParticipantFacts {
            needs_confirmed: true,
            needs_shared: true,
            ..Default::default()
        };
        let partner = ParticipantFacts {
            needs_shared: true,
            ..Default::default()
        };
        let blocked = gates_for(Stage::Needs, &own, None);
        assert!(!evaluate(in_progress(Stage::Needs), &blocked, false).can_advance);

        let open = gates_for(Stage::Needs, &own, Some(&partner));
        assert!(evaluate(in_progress(Stage::Needs), &open, false).can_advance);
    }

    #[test]
    fn completed_stage_cannot_advance_again() {
        let own = ParticipantFacts {
            compact_signed: true,
            ..Default::default()
        };
        let gates = gates_for(Stage::Compact, &own, Some(&own));
        let position = StagePosition {
            stage: Stage::Compact,
            status: StageStatus::Completed,
        };
        let decision = evaluate(position, &gates, false);
        assert_eq!(decision.blocked_reason.as_deref(), Some(REASON_NOT_IN_PROGRESS));
    }

    #[test]
    fn finished_protocol_reports_finished() {
        let position = StagePosition {
            stage: Stage::Strategies,
            status: StageStatus::Completed,
        };
        let decision = evaluate(position, &[], true);
        assert_eq!(decision.blocked_reason.as_deref(), Some(REASON_FINISHED));
    }

    #[test]
    fn gate_serializes_in_api_shape() {
        let gates = gates_for(Stage::Strategies, &ParticipantFacts::default(), None);
        let json = serde_json::to_value(&gates[0]).unwrap();
        assert_eq!(json["id"], "rankingSubmitted");
        assert_eq!(json["satisfied"], false);
        assert_eq!(json["requiredForAdvance"], true);
        assert_eq!(json["kind"], "hard");
    }
}
