//! Strategies stage models.

use beheard_core::types::{DbId, Timestamp};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Strategy {
    pub id: DbId,
    pub session_id: DbId,
    pub proposed_by: DbId,
    pub description: String,
    pub needs_addressed: Vec<String>,
    pub duration: Option<String>,
    pub measure_of_success: Option<String>,
    pub created_at: Timestamp,
}

pub struct CreateStrategy {
    pub session_id: DbId,
    pub proposed_by: DbId,
    pub description: String,
    pub needs_addressed: Vec<String>,
    pub duration: Option<String>,
    pub measure_of_success: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct StrategyRanking {
    pub id: DbId,
    pub session_id: DbId,
    pub user_id: DbId,
    pub ranked_ids: Vec<DbId>,
    pub submitted_at: Timestamp,
}

#[derive(Debug, Clone, FromRow)]
pub struct Agreement {
    pub id: DbId,
    pub session_id: DbId,
    pub strategy_id: DbId,
    pub description: String,
    pub proposed_by: DbId,
    pub status: String,
    pub agreed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

pub struct CreateAgreement {
    pub session_id: DbId,
    pub strategy_id: DbId,
    pub description: String,
    pub proposed_by: DbId,
}
