//! Stage progress model.

use beheard_core::error::CoreError;
use beheard_core::stage::{Stage, StagePosition, StageStatus};
use beheard_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// One row per (session, user, stage).
///
/// `gates` holds stage-local flags recorded by stage actions, for example
/// `{"compactSigned": true, "signedAt": "..."}`.
#[derive(Debug, Clone, FromRow)]
pub struct StageProgress {
    pub id: DbId,
    pub session_id: DbId,
    pub user_id: DbId,
    pub stage: i16,
    pub status: String,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub gates: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl StageProgress {
    pub fn position(&self) -> Result<StagePosition, CoreError> {
        Ok(StagePosition {
            stage: Stage::from_ordinal(self.stage)?,
            status: StageStatus::parse(&self.status)?,
        })
    }

    /// Read a boolean gate flag, treating a missing key as `false`.
    pub fn flag(&self, key: &str) -> bool {
        self.gates.get(key).and_then(serde_json::Value::as_bool).unwrap_or(false)
    }
}

/// Position of a user given their highest stage row, if any.
pub fn position_of(current: Option<&StageProgress>) -> Result<StagePosition, CoreError> {
    current.map_or(Ok(StagePosition::START), StageProgress::position)
}

/// Result of a committed advance.
#[derive(Debug, Clone)]
pub struct AdvanceOutcome {
    /// The row that was just completed.
    pub completed: StageProgress,
    /// The newly opened row, absent after the last stage.
    pub next: Option<StageProgress>,
    /// Both participants have now finished the protocol.
    pub session_resolved: bool,
}
