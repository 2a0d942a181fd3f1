//! Handlers for the `/sessions` resource: creation with an invitation,
//! listing, detail, pause and resume.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use beheard_core::error::CoreError;
use beheard_core::events::SessionEvent;
use beheard_core::invitation::{expiry_from, recipient_contact};
use beheard_core::session::{self, SessionStatus};
use beheard_core::stage::{Stage, StageStatus};
use beheard_core::types::{DbId, Timestamp};
use beheard_core::validation::FieldErrors;
use beheard_db::models::session::{CreateSession, Participant, Session};
use beheard_db::models::stage::position_of;
use beheard_db::repositories::{InvitationRepo, SessionRepo, StageRepo, UserRepo};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::extract::{ApiPath, ApiQuery, ValidJson};
use crate::handlers::access::{load_session, notify_partner};
use crate::handlers::auth::normalize_email;
use crate::handlers::invitations::{send_invitation_email, InvitationView};
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[validate(email(message = "Invalid email format"))]
    pub invite_email: Option<String>,
    #[validate(length(min = 5, max = 32, message = "Phone number must be 5-32 characters"))]
    pub invite_phone: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub invite_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListSessionsParams {
    pub status: Option<String>,
    pub limit: Option<i64>,
    /// Id of the last session of the previous page.
    pub cursor: Option<DbId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: DbId,
    pub status: String,
    pub created_by: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub paused_at: Option<Timestamp>,
    pub resolved_at: Option<Timestamp>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            status: session.status.clone(),
            created_by: session.created_by,
            created_at: session.created_at,
            updated_at: session.updated_at,
            paused_at: session.paused_at,
            resolved_at: session.resolved_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub id: DbId,
    pub name: Option<String>,
    pub joined_at: Timestamp,
}

impl From<&Participant> for ParticipantView {
    fn from(p: &Participant) -> Self {
        Self {
            id: p.user_id,
            name: p.name.clone(),
            joined_at: p.joined_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProgressView {
    pub stage: Stage,
    pub status: StageStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: SessionView,
    pub partner: Option<ParticipantView>,
    pub my_progress: ProgressView,
    pub partner_progress: Option<ProgressView>,
    pub invitation: Option<InvitationView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session: SessionView,
    pub invitation: InvitationView,
    /// The invitation email went out (or was logged in mock mode).
    pub email_sent: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListResponse {
    pub sessions: Vec<SessionView>,
    pub has_more: bool,
    pub next_cursor: Option<DbId>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: SessionView,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/sessions
///
/// Create a session and invite a partner by email or phone. The creator
/// joins immediately and can sign the compact while the invitation is open.
pub async fn create_session(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(input): ValidJson<CreateSessionRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CreateSessionResponse>>)> {
    recipient_contact(input.invite_email.as_deref(), input.invite_phone.as_deref())?;

    let creator = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth.user_id,
        }))?;

    let recipient_email = input
        .invite_email
        .as_deref()
        .map(normalize_email)
        .filter(|e| !e.is_empty());
    if recipient_email.as_deref() == Some(creator.email.as_str()) {
        FieldErrors::single("inviteEmail", "You cannot invite yourself").into_result()?;
    }

    let create = CreateSession {
        created_by: auth.user_id,
        recipient_email,
        recipient_phone: input.invite_phone.map(|p| p.trim().to_string()),
        recipient_name: input.invite_name.map(|n| n.trim().to_string()),
        invitation_expires_at: expiry_from(Utc::now()),
    };
    let (session, invitation) = SessionRepo::create_with_invitation(&state.pool, &create).await?;
    tracing::info!(
        session_id = session.id,
        invitation_id = invitation.id,
        user_id = auth.user_id,
        "Session created"
    );

    let email_sent = send_invitation_email(&state, &invitation, &creator).await;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(CreateSessionResponse {
            session: SessionView::from(&session),
            invitation: InvitationView::new(&invitation, Utc::now())?,
            email_sent,
        }),
    ))
}

/// GET /api/v1/sessions?status=&limit=&cursor=
pub async fn list_sessions(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(params): ApiQuery<ListSessionsParams>,
) -> AppResult<Json<ApiResponse<SessionListResponse>>> {
    let status = params
        .status
        .as_deref()
        .map(|s| {
            SessionStatus::parse(s).map_err(|_| {
                AppError::Core(CoreError::InvalidFields {
                    message: beheard_core::validation::INVALID_REQUEST_BODY.into(),
                    fields: FieldErrors::single("status", format!("Unknown session status '{s}'")),
                })
            })
        })
        .transpose()?;

    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        FieldErrors::single("limit", format!("Limit must be between 1 and {MAX_PAGE_SIZE}"))
            .into_result()?;
    }

    let mut sessions =
        SessionRepo::list_for_user(&state.pool, auth.user_id, status, params.cursor, limit + 1)
            .await?;
    let has_more = sessions.len() as i64 > limit;
    sessions.truncate(limit as usize);
    let next_cursor = if has_more {
        sessions.last().map(|s| s.id)
    } else {
        None
    };

    Ok(ApiResponse::ok(SessionListResponse {
        sessions: sessions.iter().map(SessionView::from).collect(),
        has_more,
        next_cursor,
    }))
}

/// GET /api/v1/sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(session_id): ApiPath<DbId>,
) -> AppResult<Json<ApiResponse<SessionDetail>>> {
    let session = load_session(&state, session_id, auth.user_id).await?;

    let participants = SessionRepo::participants(&state.pool, session_id).await?;
    let partner = participants.iter().find(|p| p.user_id != auth.user_id);

    let mine = StageRepo::current(&state.pool, session_id, auth.user_id).await?;
    let my_position = position_of(mine.as_ref())?;

    let partner_progress = match partner {
        Some(p) => {
            let row = StageRepo::current(&state.pool, session_id, p.user_id).await?;
            let position = position_of(row.as_ref())?;
            Some(ProgressView {
                stage: position.stage,
                status: position.status,
            })
        }
        None => None,
    };

    let invitation = match InvitationRepo::find_latest_for_session(&state.pool, session_id).await? {
        Some(inv) => Some(InvitationView::new(&inv, Utc::now())?),
        None => None,
    };

    Ok(ApiResponse::ok(SessionDetail {
        session: SessionView::from(&session),
        partner: partner.map(ParticipantView::from),
        my_progress: ProgressView {
            stage: my_position.stage,
            status: my_position.status,
        },
        partner_progress,
        invitation,
    }))
}

/// POST /api/v1/sessions/{id}/pause
pub async fn pause_session(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(session_id): ApiPath<DbId>,
) -> AppResult<Json<ApiResponse<SessionResponse>>> {
    let session = load_session(&state, session_id, auth.user_id).await?;
    session::ensure_can_pause(session.status()?)?;

    let paused = SessionRepo::pause(&state.pool, session_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict("Session changed state, try again".into()))
        })?;
    tracing::info!(session_id, user_id = auth.user_id, "Session paused");

    let partner_id = SessionRepo::partner_id(&state.pool, session_id, auth.user_id).await?;
    notify_partner(
        &state,
        session_id,
        partner_id,
        SessionEvent::SessionPaused,
        json!({ "pausedBy": auth.user_id }),
    );

    Ok(ApiResponse::ok(SessionResponse {
        session: SessionView::from(&paused),
    }))
}

/// POST /api/v1/sessions/{id}/resume
pub async fn resume_session(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(session_id): ApiPath<DbId>,
) -> AppResult<Json<ApiResponse<SessionResponse>>> {
    let session = load_session(&state, session_id, auth.user_id).await?;
    session::ensure_can_resume(session.status()?)?;

    let resumed = SessionRepo::resume(&state.pool, session_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict("Session changed state, try again".into()))
        })?;
    tracing::info!(session_id, user_id = auth.user_id, "Session resumed");

    let partner_id = SessionRepo::partner_id(&state.pool, session_id, auth.user_id).await?;
    notify_partner(
        &state,
        session_id,
        partner_id,
        SessionEvent::SessionResumed,
        json!({ "resumedBy": auth.user_id }),
    );

    Ok(ApiResponse::ok(SessionResponse {
        session: SessionView::from(&resumed),
    }))
}
