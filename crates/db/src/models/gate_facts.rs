//! Per-participant facts read for gate evaluation.

use beheard_core::gates::ParticipantFacts;
use sqlx::FromRow;

/// One boolean per fact, computed in a single query by
/// [`crate::repositories::StageRepo::participant_facts`].
#[derive(Debug, Clone, Copy, FromRow)]
pub struct GateFactsRow {
    pub compact_signed: bool,
    pub feel_heard_confirmed: bool,
    pub emotion_recorded: bool,
    pub empathy_shared: bool,
    pub empathy_validated_by_partner: bool,
    pub reviewed_partner_empathy: bool,
    pub needs_confirmed: bool,
    pub needs_shared: bool,
    pub ranking_submitted: bool,
    pub agreement_confirmed: bool,
}

impl From<GateFactsRow> for ParticipantFacts {
    fn from(row: GateFactsRow) -> Self {
        ParticipantFacts {
            compact_signed: row.compact_signed,
            feel_heard_confirmed: row.feel_heard_confirmed,
            emotion_recorded: row.emotion_recorded,
            empathy_shared: row.empathy_shared,
            empathy_validated_by_partner: row.empathy_validated_by_partner,
            reviewed_partner_empathy: row.reviewed_partner_empathy,
            needs_confirmed: row.needs_confirmed,
            needs_shared: row.needs_shared,
            ranking_submitted: row.ranking_submitted,
            agreement_confirmed: row.agreement_confirmed,
        }
    }
}
