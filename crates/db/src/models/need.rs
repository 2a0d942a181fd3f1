//! Needs stage model.

use beheard_core::types::{DbId, Timestamp};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Need {
    pub id: DbId,
    pub session_id: DbId,
    pub user_id: DbId,
    pub category: String,
    pub need: String,
    pub description: Option<String>,
    pub confirmed: bool,
    pub correction: Option<String>,
    pub shared_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

pub struct CreateNeed {
    pub session_id: DbId,
    pub user_id: DbId,
    pub category: String,
    pub need: String,
    pub description: Option<String>,
}

/// Per-need answer submitted with a confirmation.
pub struct NeedAdjustment {
    pub need_id: DbId,
    pub confirmed: bool,
    pub correction: Option<String>,
}
