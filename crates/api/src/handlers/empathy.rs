//! Empathy stage: the private draft, consent to share, and the partner's
//! verdict on the shared attempt.

use axum::extract::State;
use axum::Json;
use beheard_core::empathy::{self, MAX_CONTENT_LEN, MAX_FEEDBACK_LEN, MIN_CONTENT_LEN};
use beheard_core::error::CoreError;
use beheard_core::events::SessionEvent;
use beheard_core::stage::Stage;
use beheard_core::types::{DbId, Timestamp};
use beheard_core::validation::FieldErrors;
use beheard_db::models::empathy::{
    CreateEmpathyValidation, EmpathyAttempt, EmpathyDraft, EmpathyValidation,
};
use beheard_db::repositories::{EmpathyRepo, SessionRepo};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, ApiPath, ValidJson};
use crate::handlers::access::{load_session, notify_partner, require_stage_work};
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

const PARTNER_NOT_SHARED: &str = "Your partner has not shared their empathy attempt yet";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveDraftRequest {
    #[validate(length(
        min = MIN_CONTENT_LEN,
        max = MAX_CONTENT_LEN,
        message = "Content must be between 1 and 2000 characters"
    ))]
    pub content: String,
    #[serde(default)]
    pub ready_to_share: bool,
}

#[derive(Debug, Deserialize)]
pub struct ConsentRequest {
    pub consent: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValidateEmpathyRequest {
    pub validated: bool,
    #[validate(length(max = MAX_FEEDBACK_LEN, message = "Feedback too long"))]
    pub feedback: Option<String>,
    #[serde(default)]
    pub consent_to_share_feedback: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftView {
    pub id: DbId,
    pub content: String,
    pub version: i32,
    pub ready_to_share: bool,
    pub updated_at: Timestamp,
}

impl From<EmpathyDraft> for DraftView {
    fn from(d: EmpathyDraft) -> Self {
        Self {
            id: d.id,
            content: d.content,
            version: d.version,
            ready_to_share: d.ready_to_share,
            updated_at: d.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptView {
    pub id: DbId,
    pub content: String,
    pub shared_at: Timestamp,
}

impl From<EmpathyAttempt> for AttemptView {
    fn from(a: EmpathyAttempt) -> Self {
        Self {
            id: a.id,
            content: a.content,
            shared_at: a.shared_at,
        }
    }
}

/// A verdict as seen by the attempt's author: feedback only with consent.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationView {
    pub validated: bool,
    pub feedback: Option<String>,
    pub validated_at: Timestamp,
}

impl ValidationView {
    fn for_author(v: EmpathyValidation) -> Self {
        Self {
            validated: v.validated,
            feedback: empathy::shared_feedback(v.feedback, v.feedback_shared),
            validated_at: v.created_at,
        }
    }

    fn for_reviewer(v: EmpathyValidation) -> Self {
        Self {
            validated: v.validated,
            feedback: v.feedback,
            validated_at: v.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftResponse {
    pub draft: Option<DraftView>,
    pub already_consented: bool,
    pub can_consent: bool,
    /// The partner's verdict on the caller's shared attempt.
    pub partner_validation: Option<ValidationView>,
}

#[derive(Debug, Serialize)]
pub struct SaveDraftResponse {
    pub draft: DraftView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentResponse {
    pub consented: bool,
    pub attempt: AttemptView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerEmpathyResponse {
    pub attempt: AttemptView,
    /// The caller's own verdict, once given.
    pub my_validation: Option<ValidationView>,
}

#[derive(Debug, Serialize)]
pub struct ValidateEmpathyResponse {
    pub recorded: bool,
    pub validation: ValidationView,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn partner_attempt(
    state: &AppState,
    session_id: DbId,
    partner_id: Option<DbId>,
) -> AppResult<EmpathyAttempt> {
    let Some(partner_id) = partner_id else {
        return Err(AppError::Core(CoreError::ConsentRequired(PARTNER_NOT_SHARED.into())));
    };
    EmpathyRepo::find_attempt(&state.pool, session_id, partner_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::ConsentRequired(PARTNER_NOT_SHARED.into())))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/sessions/{id}/empathy/draft
pub async fn get_draft(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(session_id): ApiPath<DbId>,
) -> AppResult<Json<ApiResponse<DraftResponse>>> {
    load_session(&state, session_id, auth.user_id).await?;

    let draft = EmpathyRepo::find_draft(&state.pool, session_id, auth.user_id).await?;
    let attempt = EmpathyRepo::find_attempt(&state.pool, session_id, auth.user_id).await?;
    let partner_validation = match &attempt {
        Some(attempt) => EmpathyRepo::validation_of_attempt(&state.pool, attempt.id)
            .await?
            .map(ValidationView::for_author),
        None => None,
    };

    let already_consented = attempt.is_some();
    Ok(ApiResponse::ok(DraftResponse {
        can_consent: draft.is_some() && !already_consented,
        draft: draft.map(DraftView::from),
        already_consented,
        partner_validation,
    }))
}

/// POST /api/v1/sessions/{id}/empathy/draft
///
/// Each save bumps the draft version. Saving after the attempt was shared
/// is a conflict.
pub async fn save_draft(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(session_id): ApiPath<DbId>,
    ValidJson(input): ValidJson<SaveDraftRequest>,
) -> AppResult<Json<ApiResponse<SaveDraftResponse>>> {
    let content = input.content.trim();
    if content.is_empty() {
        FieldErrors::single("content", "Content must not be blank").into_result()?;
    }

    require_stage_work(&state, session_id, auth.user_id, Stage::Empathy).await?;
    let shared = EmpathyRepo::find_attempt(&state.pool, session_id, auth.user_id)
        .await?
        .is_some();
    empathy::ensure_draft_editable(shared)?;

    let draft = EmpathyRepo::save_draft(
        &state.pool,
        session_id,
        auth.user_id,
        content,
        input.ready_to_share,
    )
    .await?;
    tracing::debug!(
        session_id,
        user_id = auth.user_id,
        version = draft.version,
        "Empathy draft saved"
    );

    Ok(ApiResponse::ok(SaveDraftResponse {
        draft: draft.into(),
    }))
}

/// POST /api/v1/sessions/{id}/empathy/consent
///
/// Snapshots the draft into an immutable attempt visible to the partner.
pub async fn consent_to_share(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(session_id): ApiPath<DbId>,
    ApiJson(input): ApiJson<ConsentRequest>,
) -> AppResult<Json<ApiResponse<ConsentResponse>>> {
    if !input.consent {
        FieldErrors::single("consent", "Consent must be given to share the attempt")
            .into_result()?;
    }

    let work = require_stage_work(&state, session_id, auth.user_id, Stage::Empathy).await?;
    let has_draft = EmpathyRepo::find_draft(&state.pool, session_id, auth.user_id)
        .await?
        .is_some();
    let shared = EmpathyRepo::find_attempt(&state.pool, session_id, auth.user_id)
        .await?
        .is_some();
    empathy::ensure_can_share(has_draft, shared)?;

    let attempt = EmpathyRepo::share_draft(&state.pool, session_id, auth.user_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Validation(
                "Save an empathy draft before sharing it".into(),
            ))
        })?;
    tracing::info!(
        session_id,
        user_id = auth.user_id,
        attempt_id = attempt.id,
        "Empathy attempt shared"
    );

    notify_partner(
        &state,
        session_id,
        work.partner_id,
        SessionEvent::PartnerEmpathyShared,
        json!({ "userId": auth.user_id, "attemptId": attempt.id }),
    );

    Ok(ApiResponse::ok(ConsentResponse {
        consented: true,
        attempt: attempt.into(),
    }))
}

/// GET /api/v1/sessions/{id}/empathy/partner
///
/// `CONSENT_REQUIRED` until the partner has shared their attempt.
pub async fn get_partner_empathy(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(session_id): ApiPath<DbId>,
) -> AppResult<Json<ApiResponse<PartnerEmpathyResponse>>> {
    load_session(&state, session_id, auth.user_id).await?;
    let partner_id = SessionRepo::partner_id(&state.pool, session_id, auth.user_id).await?;
    let attempt = partner_attempt(&state, session_id, partner_id).await?;

    let my_validation = EmpathyRepo::find_validation(&state.pool, attempt.id, auth.user_id)
        .await?
        .map(ValidationView::for_reviewer);

    Ok(ApiResponse::ok(PartnerEmpathyResponse {
        attempt: attempt.into(),
        my_validation,
    }))
}

/// POST /api/v1/sessions/{id}/empathy/validate
///
/// Records the caller's verdict on the partner's attempt, once.
///
/// The verdict is final. After `validated: false` the author's
/// `partnerEmpathyValidated` gate stays unsatisfied and the author can only
/// leave the empathy stage with `force`.
pub async fn validate_partner_empathy(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(session_id): ApiPath<DbId>,
    ValidJson(input): ValidJson<ValidateEmpathyRequest>,
) -> AppResult<Json<ApiResponse<ValidateEmpathyResponse>>> {
    let work = require_stage_work(&state, session_id, auth.user_id, Stage::Empathy).await?;
    let attempt = partner_attempt(&state, session_id, work.partner_id).await?;

    if EmpathyRepo::find_validation(&state.pool, attempt.id, auth.user_id)
        .await?
        .is_some()
    {
        return Err(AppError::Core(CoreError::Conflict(
            "You have already responded to your partner's empathy attempt".into(),
        )));
    }

    let feedback = input
        .feedback
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty());
    let validation = EmpathyRepo::create_validation(
        &state.pool,
        &CreateEmpathyValidation {
            attempt_id: attempt.id,
            user_id: auth.user_id,
            validated: input.validated,
            feedback,
            feedback_shared: input.consent_to_share_feedback,
        },
    )
    .await?;
    tracing::info!(
        session_id,
        user_id = auth.user_id,
        attempt_id = attempt.id,
        validated = validation.validated,
        "Empathy attempt reviewed"
    );

    Ok(ApiResponse::ok(ValidateEmpathyResponse {
        recorded: true,
        validation: ValidationView::for_reviewer(validation),
    }))
}
