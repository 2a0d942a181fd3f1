//! Strategies stage: proposals, private rankings and agreements.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use beheard_core::error::CoreError;
use beheard_core::events::SessionEvent;
use beheard_core::stage::Stage;
use beheard_core::strategy::{self, AgreementStatus, MAX_DESCRIPTION_LEN, MIN_DESCRIPTION_LEN};
use beheard_core::types::{DbId, Timestamp};
use beheard_db::models::strategy::{Agreement, CreateAgreement, CreateStrategy, Strategy};
use beheard_db::repositories::StrategyRepo;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, ApiPath, ValidJson};
use crate::handlers::access::{load_session, notify_partner, require_stage_work};
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStrategyRequest {
    #[validate(length(
        min = MIN_DESCRIPTION_LEN,
        max = MAX_DESCRIPTION_LEN,
        message = "Description must be between 10 and 1000 characters"
    ))]
    pub description: String,
    #[validate(length(min = 1, message = "At least one need must be addressed"))]
    pub needs_addressed: Vec<String>,
    pub duration: Option<String>,
    pub measure_of_success: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RankStrategiesRequest {
    #[validate(length(min = 1, message = "Rank at least one strategy"))]
    pub ranked_ids: Vec<DbId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposeAgreementRequest {
    pub strategy_id: DbId,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmAgreementRequest {
    pub confirmed: bool,
}

/// Strategies are listed without their proposer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyView {
    pub id: DbId,
    pub description: String,
    pub needs_addressed: Vec<String>,
    pub duration: Option<String>,
    pub measure_of_success: Option<String>,
    pub created_at: Timestamp,
}

impl From<Strategy> for StrategyView {
    fn from(s: Strategy) -> Self {
        Self {
            id: s.id,
            description: s.description,
            needs_addressed: s.needs_addressed,
            duration: s.duration,
            measure_of_success: s.measure_of_success,
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreementView {
    pub id: DbId,
    pub strategy_id: DbId,
    pub description: String,
    pub proposed_by: DbId,
    pub status: String,
    pub agreed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl From<Agreement> for AgreementView {
    fn from(a: Agreement) -> Self {
        Self {
            id: a.id,
            strategy_id: a.strategy_id,
            description: a.description,
            proposed_by: a.proposed_by,
            status: a.status,
            agreed_at: a.agreed_at,
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingView {
    pub ranked_ids: Vec<DbId>,
    pub submitted_at: Timestamp,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategiesResponse {
    pub strategies: Vec<StrategyView>,
    pub my_ranking: Option<RankingView>,
    pub agreements: Vec<AgreementView>,
}

#[derive(Debug, Serialize)]
pub struct StrategyResponse {
    pub strategy: StrategyView,
}

#[derive(Debug, Serialize)]
pub struct RankingResponse {
    pub ranking: RankingView,
}

#[derive(Debug, Serialize)]
pub struct AgreementResponse {
    pub agreement: AgreementView,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/sessions/{id}/strategies
pub async fn list_strategies(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(session_id): ApiPath<DbId>,
) -> AppResult<Json<ApiResponse<StrategiesResponse>>> {
    load_session(&state, session_id, auth.user_id).await?;

    let strategies = StrategyRepo::list(&state.pool, session_id).await?;
    let my_ranking = StrategyRepo::find_ranking(&state.pool, session_id, auth.user_id).await?;
    let agreements = StrategyRepo::list_agreements(&state.pool, session_id).await?;

    Ok(ApiResponse::ok(StrategiesResponse {
        strategies: strategies.into_iter().map(StrategyView::from).collect(),
        my_ranking: my_ranking.map(|r| RankingView {
            ranked_ids: r.ranked_ids,
            submitted_at: r.submitted_at,
        }),
        agreements: agreements.into_iter().map(AgreementView::from).collect(),
    }))
}

/// POST /api/v1/sessions/{id}/strategies
pub async fn create_strategy(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(session_id): ApiPath<DbId>,
    ValidJson(input): ValidJson<CreateStrategyRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<StrategyResponse>>)> {
    require_stage_work(&state, session_id, auth.user_id, Stage::Strategies).await?;

    let created = StrategyRepo::create(
        &state.pool,
        &CreateStrategy {
            session_id,
            proposed_by: auth.user_id,
            description: input.description.trim().to_string(),
            needs_addressed: input.needs_addressed,
            duration: input.duration,
            measure_of_success: input.measure_of_success,
        },
    )
    .await?;
    tracing::info!(session_id, strategy_id = created.id, "Strategy proposed");

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(StrategyResponse {
            strategy: created.into(),
        }),
    ))
}

/// POST /api/v1/sessions/{id}/strategies/rank
///
/// Replaces any earlier ranking by the caller.
pub async fn rank_strategies(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(session_id): ApiPath<DbId>,
    ValidJson(input): ValidJson<RankStrategiesRequest>,
) -> AppResult<Json<ApiResponse<RankingResponse>>> {
    let work = require_stage_work(&state, session_id, auth.user_id, Stage::Strategies).await?;

    let known: Vec<DbId> = StrategyRepo::list(&state.pool, session_id)
        .await?
        .iter()
        .map(|s| s.id)
        .collect();
    strategy::validate_ranking(&input.ranked_ids, &known)?;

    let ranking =
        StrategyRepo::upsert_ranking(&state.pool, session_id, auth.user_id, &input.ranked_ids)
            .await?;
    tracing::info!(
        session_id,
        user_id = auth.user_id,
        ranked = ranking.ranked_ids.len(),
        "Strategy ranking submitted"
    );

    notify_partner(
        &state,
        session_id,
        work.partner_id,
        SessionEvent::PartnerRankingSubmitted,
        json!({ "userId": auth.user_id }),
    );

    Ok(ApiResponse::ok(RankingResponse {
        ranking: RankingView {
            ranked_ids: ranking.ranked_ids,
            submitted_at: ranking.submitted_at,
        },
    }))
}

/// POST /api/v1/sessions/{id}/agreements
pub async fn propose_agreement(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(session_id): ApiPath<DbId>,
    ApiJson(input): ApiJson<ProposeAgreementRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AgreementResponse>>)> {
    let work = require_stage_work(&state, session_id, auth.user_id, Stage::Strategies).await?;

    let strategy = StrategyRepo::find(&state.pool, session_id, input.strategy_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Strategy",
            id: input.strategy_id,
        }))?;

    let agreement = StrategyRepo::create_agreement(
        &state.pool,
        &CreateAgreement {
            session_id,
            strategy_id: strategy.id,
            description: strategy.description,
            proposed_by: auth.user_id,
        },
    )
    .await?;
    tracing::info!(
        session_id,
        agreement_id = agreement.id,
        strategy_id = strategy.id,
        "Agreement proposed"
    );

    notify_partner(
        &state,
        session_id,
        work.partner_id,
        SessionEvent::AgreementProposed,
        json!({ "agreementId": agreement.id, "strategyId": strategy.id }),
    );

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(AgreementResponse {
            agreement: agreement.into(),
        }),
    ))
}

/// POST /api/v1/sessions/{id}/agreements/{agreementId}/confirm
///
/// Only the proposer's partner answers. `confirmed: false` declines.
pub async fn confirm_agreement(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath((session_id, agreement_id)): ApiPath<(DbId, DbId)>,
    ApiJson(input): ApiJson<ConfirmAgreementRequest>,
) -> AppResult<Json<ApiResponse<AgreementResponse>>> {
    let work = require_stage_work(&state, session_id, auth.user_id, Stage::Strategies).await?;

    let agreement = StrategyRepo::find_agreement(&state.pool, session_id, agreement_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Agreement",
            id: agreement_id,
        }))?;
    let status = AgreementStatus::parse(&agreement.status)?;
    strategy::ensure_can_confirm(status, agreement.proposed_by, auth.user_id)?;

    let decided = strategy::decided_status(input.confirmed);
    let agreement = StrategyRepo::decide_agreement(&state.pool, agreement_id, decided)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "Agreement has already been decided".into(),
            ))
        })?;
    tracing::info!(
        session_id,
        agreement_id,
        status = decided.as_str(),
        "Agreement decided"
    );

    notify_partner(
        &state,
        session_id,
        work.partner_id,
        SessionEvent::AgreementConfirmed,
        json!({ "agreementId": agreement_id, "confirmed": input.confirmed }),
    );

    Ok(ApiResponse::ok(AgreementResponse {
        agreement: agreement.into(),
    }))
}
