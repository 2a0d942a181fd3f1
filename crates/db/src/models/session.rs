//! Session, participant (vessel) and session-creation models.

use beheard_core::error::CoreError;
use beheard_core::session::SessionStatus;
use beheard_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `sessions` table.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: DbId,
    pub created_by: DbId,
    pub status: String,
    pub paused_at: Option<Timestamp>,
    pub resolved_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Session {
    pub fn status(&self) -> Result<SessionStatus, CoreError> {
        SessionStatus::parse(&self.status)
    }
}

/// A row from the `user_vessels` table.
#[derive(Debug, Clone, FromRow)]
pub struct Vessel {
    pub id: DbId,
    pub session_id: DbId,
    pub user_id: DbId,
    pub created_at: Timestamp,
}

/// A participant of a session joined with their user profile.
#[derive(Debug, Clone, FromRow)]
pub struct Participant {
    pub vessel_id: DbId,
    pub user_id: DbId,
    pub email: String,
    pub name: Option<String>,
    pub joined_at: Timestamp,
}

/// DTO for creating a session together with its invitation.
#[derive(Debug)]
pub struct CreateSession {
    pub created_by: DbId,
    pub recipient_email: Option<String>,
    pub recipient_phone: Option<String>,
    pub recipient_name: Option<String>,
    pub invitation_expires_at: Timestamp,
}
