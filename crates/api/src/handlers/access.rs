//! Session lookup and stage preconditions shared by the session handlers.

use beheard_core::error::CoreError;
use beheard_core::events::SessionEvent;
use beheard_core::session::{self, SessionStatus};
use beheard_core::stage::{require_stage, Stage, StagePosition};
use beheard_core::types::DbId;
use beheard_db::models::session::{Session, Vessel};
use beheard_db::models::stage::position_of;
use beheard_db::repositories::{SessionRepo, StageRepo};
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// A session the caller participates in.
///
/// Sessions the caller is not part of are reported as not found, so their
/// existence is not disclosed.
pub async fn load_session(
    state: &AppState,
    session_id: DbId,
    user_id: DbId,
) -> AppResult<Session> {
    SessionRepo::find_for_participant(&state.pool, session_id, user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Session",
            id: session_id,
        }))
}

pub async fn load_vessel(
    state: &AppState,
    session_id: DbId,
    user_id: DbId,
) -> AppResult<Vessel> {
    SessionRepo::find_vessel(&state.pool, session_id, user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Session",
            id: session_id,
        }))
}

pub async fn current_position(
    state: &AppState,
    session_id: DbId,
    user_id: DbId,
) -> AppResult<StagePosition> {
    let current = StageRepo::current(&state.pool, session_id, user_id).await?;
    Ok(position_of(current.as_ref())?)
}

/// Context of a stage-specific action that passed its preconditions.
pub struct StageWork {
    pub session: Session,
    pub partner_id: Option<DbId>,
}

/// Load the session and check it accepts work on `stage` from `user_id`.
///
/// The session must be active (the compact also accepts an invited session)
/// and the caller's current stage must be `stage`, in progress.
pub async fn require_stage_work(
    state: &AppState,
    session_id: DbId,
    user_id: DbId,
    stage: Stage,
) -> AppResult<StageWork> {
    let session = load_session(state, session_id, user_id).await?;
    let status = session.status()?;
    if stage == Stage::Compact {
        session::ensure_accepts_compact(status)?;
    } else {
        session::ensure_active(status)?;
    }

    let position = current_position(state, session_id, user_id).await?;
    require_stage(position, stage)?;

    let partner_id = SessionRepo::partner_id(&state.pool, session_id, user_id).await?;
    Ok(StageWork {
        session,
        partner_id,
    })
}

/// Load the session and require it to be `ACTIVE`.
pub async fn require_active(
    state: &AppState,
    session_id: DbId,
    user_id: DbId,
) -> AppResult<(Session, SessionStatus)> {
    let session = load_session(state, session_id, user_id).await?;
    let status = session.status()?;
    session::ensure_active(status)?;
    Ok((session, status))
}

/// Notify the partner, if there is one, without waiting for delivery.
pub fn notify_partner(
    state: &AppState,
    session_id: DbId,
    partner_id: Option<DbId>,
    event: SessionEvent,
    payload: Value,
) {
    match partner_id {
        Some(partner_id) => state
            .notifier
            .spawn_notify(session_id, partner_id, event, payload),
        None => tracing::debug!(session_id, event = %event, "No partner to notify yet"),
    }
}
