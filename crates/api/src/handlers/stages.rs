//! Stage progress, advancement, and the compact and witness stage actions.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use beheard_core::empathy::MAX_FEEDBACK_LEN;
use beheard_core::error::CoreError;
use beheard_core::events::SessionEvent;
use beheard_core::gates::{
    evaluate, gates_for, AdvanceDecision, Gate, GATE_COMPACT_SIGNED, GATE_FEEL_HEARD,
};
use beheard_core::stage::{Stage, StagePosition, StageStatus};
use beheard_core::types::{DbId, Timestamp};
use beheard_core::validation::FieldErrors;
use beheard_db::models::stage::{position_of, StageProgress};
use beheard_db::repositories::{SessionRepo, StageRepo};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::extract::{optional_json, ApiJson, ApiPath, ValidJson};
use crate::handlers::access::{load_session, notify_partner, require_active, require_stage_work};
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct AdvanceRequest {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize)]
pub struct SignCompactRequest {
    pub agreed: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FeelHeardRequest {
    pub confirmed: bool,
    #[validate(length(max = MAX_FEEDBACK_LEN, message = "Feedback too long"))]
    pub feedback: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerProgress {
    pub stage: Stage,
    pub status: StageStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub session_id: DbId,
    pub stage: Stage,
    pub status: StageStatus,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub partner: Option<PartnerProgress>,
    pub can_advance: bool,
    pub advance_blocked_reason: Option<String>,
    pub gates: Vec<Gate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceResponse {
    pub advanced: bool,
    pub new_stage: Stage,
    pub new_status: StageStatus,
    pub advanced_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
    pub session_resolved: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignCompactResponse {
    pub signed: bool,
    pub signed_at: Timestamp,
    pub partner_signed: bool,
    pub can_advance: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeelHeardResponse {
    pub confirmed: bool,
    pub confirmed_at: Timestamp,
    pub can_advance: bool,
}

// ---------------------------------------------------------------------------
// Gate evaluation
// ---------------------------------------------------------------------------

/// Gates of the user's current stage and the resulting advance decision.
async fn check_gates(
    state: &AppState,
    session_id: DbId,
    user_id: DbId,
    partner_id: Option<DbId>,
    position: StagePosition,
    force: bool,
) -> AppResult<(Vec<Gate>, AdvanceDecision)> {
    let own = StageRepo::participant_facts(&state.pool, session_id, user_id).await?;
    let partner = match partner_id {
        Some(partner_id) => {
            Some(StageRepo::participant_facts(&state.pool, session_id, partner_id).await?)
        }
        None => None,
    };
    let gates = gates_for(position.stage, &own, partner.as_ref());
    let decision = evaluate(position, &gates, force);
    Ok((gates, decision))
}

async fn require_row(
    state: &AppState,
    session_id: DbId,
    user_id: DbId,
    stage: Stage,
) -> AppResult<StageProgress> {
    StageRepo::find(&state.pool, session_id, user_id, stage)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::GateNotSatisfied(format!(
                "The {} stage has not started",
                stage.name()
            )))
        })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/sessions/{id}/progress
pub async fn get_progress(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(session_id): ApiPath<DbId>,
) -> AppResult<Json<ApiResponse<ProgressResponse>>> {
    load_session(&state, session_id, auth.user_id).await?;

    let current = StageRepo::current(&state.pool, session_id, auth.user_id).await?;
    let position = position_of(current.as_ref())?;
    let partner_id = SessionRepo::partner_id(&state.pool, session_id, auth.user_id).await?;

    let partner = match partner_id {
        Some(partner_id) => {
            let row = StageRepo::current(&state.pool, session_id, partner_id).await?;
            let p = position_of(row.as_ref())?;
            Some(PartnerProgress {
                stage: p.stage,
                status: p.status,
            })
        }
        None => None,
    };

    let (gates, decision) =
        check_gates(&state, session_id, auth.user_id, partner_id, position, false).await?;

    Ok(ApiResponse::ok(ProgressResponse {
        session_id,
        stage: position.stage,
        status: position.status,
        started_at: current.as_ref().and_then(|r| r.started_at),
        completed_at: current.as_ref().and_then(|r| r.completed_at),
        partner,
        can_advance: decision.can_advance,
        advance_blocked_reason: decision.blocked_reason,
        gates,
    }))
}

/// POST /api/v1/sessions/{id}/stages/advance
///
/// A blocked advance is not an error: the response carries
/// `advanced: false` and the reason.
pub async fn advance_stage(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(session_id): ApiPath<DbId>,
    body: Bytes,
) -> AppResult<Json<ApiResponse<AdvanceResponse>>> {
    let input: AdvanceRequest = optional_json(&body)?;

    require_active(&state, session_id, auth.user_id).await?;
    let current = StageRepo::current(&state.pool, session_id, auth.user_id).await?;
    let position = position_of(current.as_ref())?;
    let partner_id = SessionRepo::partner_id(&state.pool, session_id, auth.user_id).await?;

    let (_, decision) = check_gates(
        &state,
        session_id,
        auth.user_id,
        partner_id,
        position,
        input.force,
    )
    .await?;
    if !decision.can_advance {
        tracing::debug!(
            session_id,
            user_id = auth.user_id,
            reason = decision.blocked_reason.as_deref(),
            "Advance blocked"
        );
        return Ok(ApiResponse::ok(AdvanceResponse {
            advanced: false,
            new_stage: position.stage,
            new_status: position.status,
            advanced_at: None,
            blocked_reason: decision.blocked_reason,
            session_resolved: false,
        }));
    }

    let outcome = StageRepo::advance(&state.pool, session_id, auth.user_id, position.stage)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "The stage was already advanced".into(),
            ))
        })?;

    let advanced_at = outcome.completed.completed_at;
    let new_position = match &outcome.next {
        Some(next) => next.position()?,
        None => outcome.completed.position()?,
    };
    tracing::info!(
        session_id,
        user_id = auth.user_id,
        from = position.stage.ordinal(),
        to = new_position.stage.ordinal(),
        forced = input.force,
        "Stage advanced"
    );

    match outcome.next {
        Some(_) => notify_partner(
            &state,
            session_id,
            partner_id,
            SessionEvent::PartnerAdvanced,
            json!({
                "userId": auth.user_id,
                "fromStage": position.stage,
                "toStage": new_position.stage,
            }),
        ),
        None => notify_partner(
            &state,
            session_id,
            partner_id,
            SessionEvent::PartnerStageCompleted,
            json!({ "userId": auth.user_id, "stage": position.stage }),
        ),
    }
    if outcome.session_resolved {
        tracing::info!(session_id, "Session resolved");
        notify_partner(
            &state,
            session_id,
            partner_id,
            SessionEvent::SessionResolved,
            json!({}),
        );
    }

    Ok(ApiResponse::ok(AdvanceResponse {
        advanced: true,
        new_stage: new_position.stage,
        new_status: new_position.status,
        advanced_at,
        blocked_reason: None,
        session_resolved: outcome.session_resolved,
    }))
}

/// POST /api/v1/sessions/{id}/compact/sign
pub async fn sign_compact(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(session_id): ApiPath<DbId>,
    ApiJson(input): ApiJson<SignCompactRequest>,
) -> AppResult<Json<ApiResponse<SignCompactResponse>>> {
    if !input.agreed {
        FieldErrors::single("agreed", "You must agree to the compact to sign it").into_result()?;
    }

    let work = require_stage_work(&state, session_id, auth.user_id, Stage::Compact).await?;
    let row = require_row(&state, session_id, auth.user_id, Stage::Compact).await?;
    if row.flag(GATE_COMPACT_SIGNED) {
        return Err(AppError::Core(CoreError::Conflict(
            "You have already signed the compact".into(),
        )));
    }

    let signed_at = chrono::Utc::now();
    StageRepo::merge_gates(
        &state.pool,
        session_id,
        auth.user_id,
        Stage::Compact,
        &json!({ GATE_COMPACT_SIGNED: true, "signedAt": signed_at }),
    )
    .await?;
    tracing::info!(session_id, user_id = auth.user_id, "Compact signed");

    let position = StagePosition {
        stage: Stage::Compact,
        status: StageStatus::InProgress,
    };
    let (_, decision) =
        check_gates(&state, session_id, auth.user_id, work.partner_id, position, false).await?;
    let partner_signed = match work.partner_id {
        Some(partner_id) => {
            StageRepo::participant_facts(&state.pool, session_id, partner_id)
                .await?
                .compact_signed
        }
        None => false,
    };

    notify_partner(
        &state,
        session_id,
        work.partner_id,
        SessionEvent::PartnerSignedCompact,
        json!({ "userId": auth.user_id, "signedAt": signed_at }),
    );

    Ok(ApiResponse::ok(SignCompactResponse {
        signed: true,
        signed_at,
        partner_signed,
        can_advance: decision.can_advance,
    }))
}

/// POST /api/v1/sessions/{id}/feel-heard
///
/// `confirmed: false` records that the user does not feel heard yet; the
/// gate stays closed until a later confirmation.
pub async fn confirm_feel_heard(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(session_id): ApiPath<DbId>,
    ValidJson(input): ValidJson<FeelHeardRequest>,
) -> AppResult<Json<ApiResponse<FeelHeardResponse>>> {
    let work = require_stage_work(&state, session_id, auth.user_id, Stage::Witness).await?;

    let confirmed_at = chrono::Utc::now();
    let mut patch = json!({ GATE_FEEL_HEARD: input.confirmed, "feelHeardAt": confirmed_at });
    if let Some(feedback) = input.feedback.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        patch["feelHeardFeedback"] = json!(feedback);
    }
    StageRepo::merge_gates(&state.pool, session_id, auth.user_id, Stage::Witness, &patch).await?;
    tracing::info!(
        session_id,
        user_id = auth.user_id,
        confirmed = input.confirmed,
        "Feel-heard answer recorded"
    );

    let position = StagePosition {
        stage: Stage::Witness,
        status: StageStatus::InProgress,
    };
    let (_, decision) =
        check_gates(&state, session_id, auth.user_id, work.partner_id, position, false).await?;

    Ok(ApiResponse::ok(FeelHeardResponse {
        confirmed: input.confirmed,
        confirmed_at,
        can_advance: decision.can_advance,
    }))
}
