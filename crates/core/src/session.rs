//! Session lifecycle states and the realtime channel naming scheme.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Application prefix of every realtime channel name.
pub const CHANNEL_PREFIX: &str = "beheard";

/// Participants allowed in one session.
pub const MAX_PARTICIPANTS: i64 = 2;

/// Realtime channel carrying a session's events and presence.
pub fn session_channel_name(session_id: DbId) -> String {
    format!("{CHANNEL_PREFIX}:session:{session_id}")
}

/// Lifecycle of a session.
///
/// `Invited` is "not started" (waiting for the partner), `Active` is "in
/// progress" and `Resolved` is "completed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Invited,
    Active,
    Paused,
    Resolved,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Invited => "INVITED",
            SessionStatus::Active => "ACTIVE",
            SessionStatus::Paused => "PAUSED",
            SessionStatus::Resolved => "RESOLVED",
            SessionStatus::Abandoned => "ABANDONED",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "INVITED" => Ok(SessionStatus::Invited),
            "ACTIVE" => Ok(SessionStatus::Active),
            "PAUSED" => Ok(SessionStatus::Paused),
            "RESOLVED" => Ok(SessionStatus::Resolved),
            "ABANDONED" => Ok(SessionStatus::Abandoned),
            other => Err(CoreError::Internal(format!("Unknown session status '{other}'"))),
        }
    }

    /// Statuses counted as "active" on the profile summary.
    pub fn is_open(self) -> bool {
        matches!(
            self,
            SessionStatus::Invited | SessionStatus::Active | SessionStatus::Paused
        )
    }
}

/// Stage work is only accepted while the session is active.
pub fn ensure_active(status: SessionStatus) -> Result<(), CoreError> {
    match status {
        SessionStatus::Active => Ok(()),
        SessionStatus::Invited => Err(CoreError::SessionNotActive(
            "Waiting for your partner to accept the invitation".into(),
        )),
        SessionStatus::Paused => Err(CoreError::SessionNotActive("Session is paused".into())),
        SessionStatus::Resolved => {
            Err(CoreError::SessionNotActive("Session is already resolved".into()))
        }
        SessionStatus::Abandoned => {
            Err(CoreError::SessionNotActive("Session was abandoned".into()))
        }
    }
}

/// The compact may also be signed while the partner has not joined yet.
pub fn ensure_accepts_compact(status: SessionStatus) -> Result<(), CoreError> {
    match status {
        SessionStatus::Invited => Ok(()),
        other => ensure_active(other),
    }
}

/// Validate a pause request; only active sessions can be paused.
pub fn ensure_can_pause(status: SessionStatus) -> Result<(), CoreError> {
    ensure_active(status)
}

/// Validate a resume request; only paused sessions can be resumed.
pub fn ensure_can_resume(status: SessionStatus) -> Result<(), CoreError> {
    if status == SessionStatus::Paused {
        Ok(())
    } else {
        Err(CoreError::SessionNotActive(format!(
            "Only paused sessions can be resumed (session is {})",
            status.as_str()
        )))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn channel_name_uses_app_prefix() {
        assert_eq!(session_channel_name(42), "beheard:session:42");
    }

    #[test]
    fn only_active_sessions_accept_work() {
        assert!(ensure_active(SessionStatus::Active).is_ok());
        for status in [
            SessionStatus::Invited,
            SessionStatus::Paused,
            SessionStatus::Resolved,
            SessionStatus::Abandoned,
        ] {
            let err = ensure_active(status).unwrap_err();
            assert_eq!(err.code(), "SESSION_NOT_ACTIVE");
        }
    }

    #[test]
    fn compact_can_be_signed_before_partner_joins() {
        assert!(ensure_accepts_compact(SessionStatus::Invited).is_ok());
        assert!(ensure_accepts_compact(SessionStatus::Active).is_ok());
        assert!(ensure_accepts_compact(SessionStatus::Paused).is_err());
    }

    #[test]
    fn pause_and_resume_transitions() {
        assert!(ensure_can_pause(SessionStatus::Active).is_ok());
        assert!(ensure_can_pause(SessionStatus::Paused).is_err());
        assert!(ensure_can_resume(SessionStatus::Paused).is_ok());
        assert_matches!(
            ensure_can_resume(SessionStatus::Active),
            Err(CoreError::SessionNotActive(_))
        );
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [
            SessionStatus::Invited,
            SessionStatus::Active,
            SessionStatus::Paused,
            SessionStatus::Resolved,
            SessionStatus::Abandoned,
        ] {
            assert_eq!(SessionStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(SessionStatus::Paused.is_open());
        assert!(!SessionStatus::Resolved.is_open());
    }
}
