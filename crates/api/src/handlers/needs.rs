//! Needs stage: stating needs, confirming them, and sharing them with the
//! partner.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use beheard_core::error::CoreError;
use beheard_core::events::SessionEvent;
use beheard_core::gates::{GATE_NEEDS_CONFIRMED, GATE_NEEDS_SHARED};
use beheard_core::needs::{
    self, NeedCategory, MAX_CORRECTION_LEN, MAX_DESCRIPTION_LEN, MAX_NEED_LEN,
};
use beheard_core::stage::Stage;
use beheard_core::types::{DbId, Timestamp};
use beheard_core::validation::FieldErrors;
use beheard_db::models::need::{CreateNeed, Need, NeedAdjustment};
use beheard_db::models::stage::StageProgress;
use beheard_db::repositories::{NeedRepo, SessionRepo, StageRepo};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::extract::{ApiPath, ValidJson};
use crate::handlers::access::{load_session, notify_partner, require_stage_work};
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateNeedRequest {
    pub category: NeedCategory,
    #[validate(length(
        min = 1,
        max = MAX_NEED_LEN,
        message = "Need must be between 1 and 200 characters"
    ))]
    pub need: String,
    #[validate(length(max = MAX_DESCRIPTION_LEN, message = "Description too long"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentInput {
    pub need_id: DbId,
    pub confirmed: bool,
    #[validate(length(max = MAX_CORRECTION_LEN, message = "Correction too long"))]
    pub correction: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmNeedsRequest {
    #[serde(default)]
    pub need_ids: Vec<DbId>,
    #[serde(default)]
    #[validate(nested)]
    pub adjustments: Vec<AdjustmentInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NeedView {
    pub id: DbId,
    pub category: String,
    pub need: String,
    pub description: Option<String>,
    pub confirmed: bool,
    pub correction: Option<String>,
    pub shared_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl From<Need> for NeedView {
    fn from(n: Need) -> Self {
        Self {
            id: n.id,
            category: n.category,
            need: n.need,
            description: n.description,
            confirmed: n.confirmed,
            correction: n.correction,
            shared_at: n.shared_at,
            created_at: n.created_at,
        }
    }
}

fn views(needs: Vec<Need>) -> Vec<NeedView> {
    needs.into_iter().map(NeedView::from).collect()
}

#[derive(Debug, Serialize)]
pub struct NeedsResponse {
    pub needs: Vec<NeedView>,
    pub confirmed: bool,
    pub shared: bool,
}

#[derive(Debug, Serialize)]
pub struct NeedResponse {
    pub need: NeedView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareNeedsResponse {
    pub shared: bool,
    pub shared_at: Timestamp,
    pub needs: Vec<NeedView>,
}

#[derive(Debug, Serialize)]
pub struct PartnerNeedsResponse {
    pub needs: Vec<NeedView>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The caller's (confirmed, shared) flags for the needs stage.
async fn needs_flags(
    state: &AppState,
    session_id: DbId,
    user_id: DbId,
) -> AppResult<(bool, bool)> {
    let row: Option<StageProgress> =
        StageRepo::find(&state.pool, session_id, user_id, Stage::Needs).await?;
    Ok(row.map_or((false, false), |r| {
        (r.flag(GATE_NEEDS_CONFIRMED), r.flag(GATE_NEEDS_SHARED))
    }))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/sessions/{id}/needs
pub async fn list_needs(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(session_id): ApiPath<DbId>,
) -> AppResult<Json<ApiResponse<NeedsResponse>>> {
    load_session(&state, session_id, auth.user_id).await?;
    let needs = NeedRepo::list_for_user(&state.pool, session_id, auth.user_id).await?;
    let (confirmed, shared) = needs_flags(&state, session_id, auth.user_id).await?;

    Ok(ApiResponse::ok(NeedsResponse {
        needs: views(needs),
        confirmed,
        shared,
    }))
}

/// POST /api/v1/sessions/{id}/needs
pub async fn create_need(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(session_id): ApiPath<DbId>,
    ValidJson(input): ValidJson<CreateNeedRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<NeedResponse>>)> {
    let need = input.need.trim();
    if need.is_empty() {
        FieldErrors::single("need", "Need must not be blank").into_result()?;
    }

    require_stage_work(&state, session_id, auth.user_id, Stage::Needs).await?;
    let (confirmed, _) = needs_flags(&state, session_id, auth.user_id).await?;
    needs::ensure_needs_editable(confirmed)?;

    let created = NeedRepo::create(
        &state.pool,
        &CreateNeed {
            session_id,
            user_id: auth.user_id,
            category: input.category.as_str().to_string(),
            need: need.to_string(),
            description: input
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        },
    )
    .await?;
    tracing::debug!(
        session_id,
        user_id = auth.user_id,
        need_id = created.id,
        "Need added"
    );

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(NeedResponse {
            need: created.into(),
        }),
    ))
}

/// POST /api/v1/sessions/{id}/needs/confirm
///
/// `needIds` may be empty; adjustments apply after the bulk confirmation.
/// Confirmation may be repeated until the needs are shared.
pub async fn confirm_needs(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(session_id): ApiPath<DbId>,
    ValidJson(input): ValidJson<ConfirmNeedsRequest>,
) -> AppResult<Json<ApiResponse<NeedsResponse>>> {
    require_stage_work(&state, session_id, auth.user_id, Stage::Needs).await?;
    let (_, shared) = needs_flags(&state, session_id, auth.user_id).await?;
    if shared {
        return Err(AppError::Core(CoreError::Conflict(
            "Your needs have already been shared".into(),
        )));
    }

    let adjustments: Vec<NeedAdjustment> = input
        .adjustments
        .into_iter()
        .map(|a| NeedAdjustment {
            need_id: a.need_id,
            confirmed: a.confirmed,
            correction: a.correction.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
        })
        .collect();
    let needs =
        NeedRepo::confirm(&state.pool, session_id, auth.user_id, &input.need_ids, &adjustments)
            .await?;

    StageRepo::merge_gates(
        &state.pool,
        session_id,
        auth.user_id,
        Stage::Needs,
        &json!({ GATE_NEEDS_CONFIRMED: true, "needsConfirmedAt": chrono::Utc::now() }),
    )
    .await?;
    tracing::info!(
        session_id,
        user_id = auth.user_id,
        confirmed = needs.iter().filter(|n| n.confirmed).count(),
        "Needs confirmed"
    );

    Ok(ApiResponse::ok(NeedsResponse {
        needs: views(needs),
        confirmed: true,
        shared: false,
    }))
}

/// POST /api/v1/sessions/{id}/needs/share
pub async fn share_needs(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(session_id): ApiPath<DbId>,
) -> AppResult<Json<ApiResponse<ShareNeedsResponse>>> {
    let work = require_stage_work(&state, session_id, auth.user_id, Stage::Needs).await?;
    let (confirmed, shared) = needs_flags(&state, session_id, auth.user_id).await?;
    needs::ensure_can_share(confirmed, shared)?;

    NeedRepo::share_confirmed(&state.pool, session_id, auth.user_id).await?;
    let shared_at = chrono::Utc::now();
    StageRepo::merge_gates(
        &state.pool,
        session_id,
        auth.user_id,
        Stage::Needs,
        &json!({ GATE_NEEDS_SHARED: true, "needsSharedAt": shared_at }),
    )
    .await?;
    let shared_needs = NeedRepo::list_shared(&state.pool, session_id, auth.user_id).await?;
    tracing::info!(
        session_id,
        user_id = auth.user_id,
        count = shared_needs.len(),
        "Needs shared"
    );

    notify_partner(
        &state,
        session_id,
        work.partner_id,
        SessionEvent::PartnerNeedsShared,
        json!({ "userId": auth.user_id, "count": shared_needs.len() }),
    );

    Ok(ApiResponse::ok(ShareNeedsResponse {
        shared: true,
        shared_at,
        needs: views(shared_needs),
    }))
}

/// GET /api/v1/sessions/{id}/needs/partner
///
/// `CONSENT_REQUIRED` until the partner has shared their needs.
pub async fn get_partner_needs(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(session_id): ApiPath<DbId>,
) -> AppResult<Json<ApiResponse<PartnerNeedsResponse>>> {
    load_session(&state, session_id, auth.user_id).await?;
    let not_shared = || {
        AppError::Core(CoreError::ConsentRequired(
            "Your partner has not shared their needs yet".into(),
        ))
    };

    let partner_id = SessionRepo::partner_id(&state.pool, session_id, auth.user_id)
        .await?
        .ok_or_else(not_shared)?;
    let (_, shared) = needs_flags(&state, session_id, partner_id).await?;
    if !shared {
        return Err(not_shared());
    }

    let needs = NeedRepo::list_shared(&state.pool, session_id, partner_id).await?;
    Ok(ApiResponse::ok(PartnerNeedsResponse {
        needs: views(needs),
    }))
}

#[cfg(test)]
mod tests {
    use beheard_core::validation::validate_request;

    use super::*;

    #[test]
    fn confirm_body_fields_are_optional() {
        let input: ConfirmNeedsRequest = serde_json::from_str("{}").unwrap();
        assert!(input.need_ids.is_empty());
        assert!(input.adjustments.is_empty());
    }

    #[test]
    fn unknown_category_is_rejected() {
        let parsed = serde_json::from_str::<CreateNeedRequest>(
            r#"{"category": "WEALTH", "need": "More money"}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn long_correction_fails_nested_validation() {
        let input = ConfirmNeedsRequest {
            need_ids: vec![1],
            adjustments: vec![AdjustmentInput {
                need_id: 1,
                confirmed: false,
                correction: Some("x".repeat(MAX_CORRECTION_LEN as usize + 1)),
            }],
        };
        assert!(validate_request(&input).is_err());
    }
}
