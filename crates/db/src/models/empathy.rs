//! Empathy stage models.

use beheard_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// The editable draft, one per (session, user).
#[derive(Debug, Clone, FromRow)]
pub struct EmpathyDraft {
    pub id: DbId,
    pub session_id: DbId,
    pub user_id: DbId,
    pub content: String,
    pub version: i32,
    pub ready_to_share: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Immutable snapshot of a draft taken when the author consents to share.
#[derive(Debug, Clone, FromRow)]
pub struct EmpathyAttempt {
    pub id: DbId,
    pub session_id: DbId,
    pub user_id: DbId,
    pub draft_id: DbId,
    pub content: String,
    pub shared_at: Timestamp,
}

/// The partner's verdict on an attempt.
#[derive(Debug, Clone, FromRow)]
pub struct EmpathyValidation {
    pub id: DbId,
    pub attempt_id: DbId,
    pub user_id: DbId,
    pub validated: bool,
    pub feedback: Option<String>,
    pub feedback_shared: bool,
    pub created_at: Timestamp,
}

pub struct CreateEmpathyValidation {
    pub attempt_id: DbId,
    pub user_id: DbId,
    pub validated: bool,
    pub feedback: Option<String>,
    pub feedback_shared: bool,
}
