//! Session events delivered to a partner over realtime or push.

use serde::Serialize;

/// Events one participant's actions raise for the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SessionEvent {
    #[serde(rename = "partner.signed_compact")]
    PartnerSignedCompact,
    #[serde(rename = "partner.stage_completed")]
    PartnerStageCompleted,
    #[serde(rename = "partner.advanced")]
    PartnerAdvanced,
    #[serde(rename = "partner.empathy_shared")]
    PartnerEmpathyShared,
    #[serde(rename = "partner.needs_shared")]
    PartnerNeedsShared,
    #[serde(rename = "partner.ranking_submitted")]
    PartnerRankingSubmitted,
    #[serde(rename = "agreement.proposed")]
    AgreementProposed,
    #[serde(rename = "agreement.confirmed")]
    AgreementConfirmed,
    #[serde(rename = "session.paused")]
    SessionPaused,
    #[serde(rename = "session.resumed")]
    SessionResumed,
    #[serde(rename = "session.resolved")]
    SessionResolved,
    #[serde(rename = "invitation.accepted")]
    InvitationAccepted,
    #[serde(rename = "invitation.declined")]
    InvitationDeclined,
}

impl SessionEvent {
    /// Wire name used as the realtime message name.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionEvent::PartnerSignedCompact => "partner.signed_compact",
            SessionEvent::PartnerStageCompleted => "partner.stage_completed",
            SessionEvent::PartnerAdvanced => "partner.advanced",
            SessionEvent::PartnerEmpathyShared => "partner.empathy_shared",
            SessionEvent::PartnerNeedsShared => "partner.needs_shared",
            SessionEvent::PartnerRankingSubmitted => "partner.ranking_submitted",
            SessionEvent::AgreementProposed => "agreement.proposed",
            SessionEvent::AgreementConfirmed => "agreement.confirmed",
            SessionEvent::SessionPaused => "session.paused",
            SessionEvent::SessionResumed => "session.resumed",
            SessionEvent::SessionResolved => "session.resolved",
            SessionEvent::InvitationAccepted => "invitation.accepted",
            SessionEvent::InvitationDeclined => "invitation.declined",
        }
    }

    /// Title and body of the push notification sent when the partner is away.
    pub fn push_copy(self) -> (&'static str, &'static str) {
        match self {
            SessionEvent::PartnerSignedCompact => {
                ("Your partner is ready", "Your partner signed the compact.")
            }
            SessionEvent::PartnerStageCompleted => (
                "Progress in your session",
                "Your partner completed a stage.",
            ),
            SessionEvent::PartnerAdvanced => (
                "Progress in your session",
                "Your partner moved on to the next stage.",
            ),
            SessionEvent::PartnerEmpathyShared => (
                "Your partner shared their understanding",
                "Take a moment to read what your partner heard.",
            ),
            SessionEvent::PartnerNeedsShared => (
                "Your partner shared their needs",
                "See what matters most to your partner.",
            ),
            SessionEvent::PartnerRankingSubmitted => (
                "Strategies ranked",
                "Your partner ranked the proposed strategies.",
            ),
            SessionEvent::AgreementProposed => (
                "New agreement proposed",
                "Your partner proposed an agreement.",
            ),
            SessionEvent::AgreementConfirmed => (
                "Agreement reached",
                "Your partner responded to your agreement.",
            ),
            SessionEvent::SessionPaused => ("Session paused", "Your partner paused the session."),
            SessionEvent::SessionResumed => {
                ("Session resumed", "Your partner is ready to continue.")
            }
            SessionEvent::SessionResolved => (
                "Session resolved",
                "You and your partner completed the process.",
            ),
            SessionEvent::InvitationAccepted => (
                "Invitation accepted",
                "Your partner joined the session.",
            ),
            SessionEvent::InvitationDeclined => (
                "Invitation declined",
                "Your partner declined the invitation.",
            ),
        }
    }
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_name_matches_wire_name() {
        for event in [
            SessionEvent::PartnerSignedCompact,
            SessionEvent::PartnerAdvanced,
            SessionEvent::AgreementConfirmed,
            SessionEvent::SessionResolved,
            SessionEvent::InvitationDeclined,
        ] {
            let json = serde_json::to_value(event).unwrap();
            assert_eq!(json, serde_json::Value::String(event.as_str().into()));
        }
    }

    #[test]
    fn display_uses_wire_name() {
        assert_eq!(SessionEvent::SessionPaused.to_string(), "session.paused");
    }
}
