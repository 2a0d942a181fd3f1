//! Invitation model.

use beheard_core::error::CoreError;
use beheard_core::invitation::{self, InvitationStatus};
use beheard_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `invitations` table.
#[derive(Debug, Clone, FromRow)]
pub struct Invitation {
    pub id: DbId,
    pub session_id: DbId,
    pub invited_by: DbId,
    pub recipient_email: Option<String>,
    pub recipient_phone: Option<String>,
    pub recipient_name: Option<String>,
    pub status: String,
    pub expires_at: Timestamp,
    pub accepted_by: Option<DbId>,
    pub accepted_at: Option<Timestamp>,
    pub declined_at: Option<Timestamp>,
    pub decline_reason: Option<String>,
    pub last_sent_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Invitation {
    /// Stored status with lazy expiry applied.
    pub fn effective_status(&self, now: Timestamp) -> Result<InvitationStatus, CoreError> {
        let stored = InvitationStatus::parse(&self.status)?;
        Ok(invitation::effective_status(stored, self.expires_at, now))
    }
}

/// Invitation joined with the inviter's display details, for the public view.
#[derive(Debug, Clone, FromRow)]
pub struct InvitationWithInviter {
    #[sqlx(flatten)]
    pub invitation: Invitation,
    pub inviter_name: Option<String>,
    pub inviter_email: String,
}

/// Result of an accept attempt.
#[derive(Debug, Clone)]
pub enum AcceptOutcome {
    Accepted(Invitation),
    /// The invitation stopped being pending (answered, or expired) before
    /// this request got to it.
    NoLongerPending,
    /// The session already has two other participants.
    SessionFull,
}
