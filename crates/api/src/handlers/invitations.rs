//! Handlers for the `/invitations` resource.
//!
//! An invitation moves once from `PENDING` to `ACCEPTED`, `DECLINED` or
//! `EXPIRED`. Expiry is detected on read and persisted lazily.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use beheard_core::error::CoreError;
use beheard_core::events::SessionEvent;
use beheard_core::invitation::{self, expiry_from, InvitationStatus};
use beheard_core::types::{DbId, Timestamp};
use beheard_db::models::invitation::{AcceptOutcome, Invitation};
use beheard_db::models::user::User;
use beheard_db::repositories::{InvitationRepo, SessionRepo, UserRepo};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::extract::{optional_json, ApiPath};
use crate::handlers::sessions::SessionView;
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

const MAX_DECLINE_REASON_LEN: u64 = 500;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, Validate)]
pub struct DeclineRequest {
    #[validate(length(
        max = MAX_DECLINE_REASON_LEN,
        message = "Reason must be at most 500 characters"
    ))]
    pub reason: Option<String>,
}

/// Invitation as seen by the participants of its session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationView {
    pub id: DbId,
    pub session_id: DbId,
    pub invited_by: DbId,
    pub recipient_email: Option<String>,
    pub recipient_phone: Option<String>,
    pub recipient_name: Option<String>,
    pub status: InvitationStatus,
    pub expires_at: Timestamp,
    pub last_sent_at: Timestamp,
    pub accepted_at: Option<Timestamp>,
    pub declined_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl InvitationView {
    pub fn new(inv: &Invitation, now: Timestamp) -> Result<Self, CoreError> {
        Ok(Self {
            id: inv.id,
            session_id: inv.session_id,
            invited_by: inv.invited_by,
            recipient_email: inv.recipient_email.clone(),
            recipient_phone: inv.recipient_phone.clone(),
            recipient_name: inv.recipient_name.clone(),
            status: inv.effective_status(now)?,
            expires_at: inv.expires_at,
            last_sent_at: inv.last_sent_at,
            accepted_at: inv.accepted_at,
            declined_at: inv.declined_at,
            created_at: inv.created_at,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviterView {
    pub id: DbId,
    pub name: Option<String>,
}

/// What anyone holding the link may see.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicInvitation {
    pub id: DbId,
    pub session_id: DbId,
    pub status: InvitationStatus,
    pub expires_at: Timestamp,
    pub recipient_name: Option<String>,
    pub invited_by: InviterView,
}

#[derive(Debug, Serialize)]
pub struct PublicInvitationResponse {
    pub invitation: PublicInvitation,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingInvitation {
    pub id: DbId,
    pub session_id: DbId,
    pub invited_by: InviterView,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

#[derive(Debug, Serialize)]
pub struct PendingInvitationsResponse {
    pub invitations: Vec<PendingInvitation>,
}

#[derive(Debug, Serialize)]
pub struct AcceptResponse {
    pub invitation: InvitationView,
    pub session: SessionView,
}

#[derive(Debug, Serialize)]
pub struct DeclineResponse {
    pub declined: bool,
    pub invitation: InvitationView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendResponse {
    pub invitation: InvitationView,
    pub email_sent: bool,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load an invitation and its effective status, persisting a detected expiry.
async fn load_invitation(state: &AppState, id: DbId) -> AppResult<(Invitation, InvitationStatus)> {
    let mut inv = InvitationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Invitation",
            id,
        }))?;
    let status = persist_expiry(state, &mut inv).await?;
    Ok((inv, status))
}

async fn persist_expiry(state: &AppState, inv: &mut Invitation) -> AppResult<InvitationStatus> {
    let stored = InvitationStatus::parse(&inv.status)?;
    let status = inv.effective_status(Utc::now())?;
    if stored == InvitationStatus::Pending && status == InvitationStatus::Expired {
        if InvitationRepo::mark_expired(&state.pool, inv.id).await? {
            tracing::info!(invitation_id = inv.id, "Invitation expired");
        }
        inv.status = InvitationStatus::Expired.as_str().to_string();
    }
    Ok(status)
}

/// Re-read an invitation that lost a conditional update and report why.
async fn conflict_for(state: &AppState, id: DbId) -> AppError {
    match load_invitation(state, id).await {
        Ok((_, status)) => match invitation::ensure_pending(status) {
            Err(e) => AppError::Core(e),
            Ok(()) => AppError::Core(CoreError::Conflict(
                "Invitation changed state, try again".into(),
            )),
        },
        Err(e) => e,
    }
}

fn display_name(user: &User) -> &str {
    user.name.as_deref().unwrap_or(&user.email)
}

/// Email the invitation link when the invitation has an email recipient.
///
/// Delivery failures are logged; the invitation stays valid and can be
/// resent. Returns whether an email was handed off.
pub async fn send_invitation_email(state: &AppState, inv: &Invitation, inviter: &User) -> bool {
    let Some(to) = inv.recipient_email.as_deref() else {
        tracing::info!(invitation_id = inv.id, "Phone invitation stored, no email to send");
        return false;
    };
    let url = state.config.invitation_url(inv.id);
    match state
        .mailer
        .send_invitation(to, display_name(inviter), &url)
        .await
    {
        Ok(receipt) => {
            tracing::info!(
                invitation_id = inv.id,
                mocked = receipt.mocked,
                "Invitation email handled"
            );
            true
        }
        Err(e) => {
            tracing::error!(invitation_id = inv.id, error = %e, "Invitation email failed");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/invitations/{id}
///
/// Public: enough to render the accept/decline screen, nothing more.
pub async fn get_invitation(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DbId>,
) -> AppResult<Json<ApiResponse<PublicInvitationResponse>>> {
    let mut found = InvitationRepo::find_with_inviter(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Invitation",
            id,
        }))?;
    let status = persist_expiry(&state, &mut found.invitation).await?;

    let inv = &found.invitation;
    Ok(ApiResponse::ok(PublicInvitationResponse {
        invitation: PublicInvitation {
            id: inv.id,
            session_id: inv.session_id,
            status,
            expires_at: inv.expires_at,
            recipient_name: inv.recipient_name.clone(),
            invited_by: InviterView {
                id: inv.invited_by,
                name: found.inviter_name.clone(),
            },
        },
    }))
}

/// GET /api/v1/invitations
///
/// Open invitations addressed to the caller's email.
pub async fn list_pending(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<ApiResponse<PendingInvitationsResponse>>> {
    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth.user_id,
        }))?;

    let invitations = InvitationRepo::list_pending_for_email(&state.pool, &user.email)
        .await?
        .into_iter()
        .map(|found| PendingInvitation {
            id: found.invitation.id,
            session_id: found.invitation.session_id,
            invited_by: InviterView {
                id: found.invitation.invited_by,
                name: found.inviter_name,
            },
            created_at: found.invitation.created_at,
            expires_at: found.invitation.expires_at,
        })
        .collect();

    Ok(ApiResponse::ok(PendingInvitationsResponse { invitations }))
}

/// POST /api/v1/invitations/{id}/accept
pub async fn accept_invitation(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<DbId>,
) -> AppResult<Json<ApiResponse<AcceptResponse>>> {
    let (inv, status) = load_invitation(&state, id).await?;
    invitation::ensure_can_respond(status, inv.invited_by, auth.user_id)?;

    let outcome = InvitationRepo::accept(&state.pool, id, inv.session_id, auth.user_id).await?;
    let accepted = match outcome {
        AcceptOutcome::Accepted(accepted) => accepted,
        AcceptOutcome::NoLongerPending => return Err(conflict_for(&state, id).await),
        AcceptOutcome::SessionFull => {
            return Err(AppError::Core(CoreError::Conflict(
                "This session already has two participants".into(),
            )))
        }
    };
    tracing::info!(
        invitation_id = id,
        session_id = inv.session_id,
        user_id = auth.user_id,
        "Invitation accepted"
    );

    let session = SessionRepo::find_by_id(&state.pool, inv.session_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Session",
            id: inv.session_id,
        }))?;

    state.notifier.spawn_notify(
        inv.session_id,
        inv.invited_by,
        SessionEvent::InvitationAccepted,
        json!({ "invitationId": id, "acceptedBy": auth.user_id }),
    );

    Ok(ApiResponse::ok(AcceptResponse {
        invitation: InvitationView::new(&accepted, Utc::now())?,
        session: SessionView::from(&session),
    }))
}

/// POST /api/v1/invitations/{id}/decline
///
/// Body is optional: `{"reason": "..."}`.
pub async fn decline_invitation(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<DbId>,
    body: Bytes,
) -> AppResult<Json<ApiResponse<DeclineResponse>>> {
    let input: DeclineRequest = optional_json(&body)?;
    beheard_core::validation::validate_request(&input)?;

    let (inv, status) = load_invitation(&state, id).await?;
    invitation::ensure_can_respond(status, inv.invited_by, auth.user_id)?;

    let reason = input.reason.as_deref().map(str::trim).filter(|r| !r.is_empty());
    let Some(declined) = InvitationRepo::decline(&state.pool, id, reason).await? else {
        return Err(conflict_for(&state, id).await);
    };
    tracing::info!(invitation_id = id, session_id = inv.session_id, "Invitation declined");

    state.notifier.spawn_notify(
        inv.session_id,
        inv.invited_by,
        SessionEvent::InvitationDeclined,
        json!({ "invitationId": id }),
    );

    Ok(ApiResponse::ok(DeclineResponse {
        declined: true,
        invitation: InvitationView::new(&declined, Utc::now())?,
    }))
}

/// POST /api/v1/invitations/{id}/resend
///
/// Inviter only. Reopens a pending or expired invitation for another
/// seven days and sends the email again.
pub async fn resend_invitation(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<DbId>,
) -> AppResult<Json<ApiResponse<ResendResponse>>> {
    let (inv, status) = load_invitation(&state, id).await?;
    invitation::ensure_can_resend(status, inv.invited_by, auth.user_id)?;

    let resent = InvitationRepo::resend(&state.pool, id, expiry_from(Utc::now())).await?;
    let Some(resent) = resent else {
        return Err(conflict_for(&state, id).await);
    };
    tracing::info!(invitation_id = id, expires_at = %resent.expires_at, "Invitation resent");

    let inviter = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth.user_id,
        }))?;
    let email_sent = send_invitation_email(&state, &resent, &inviter).await;

    Ok(ApiResponse::ok(ResendResponse {
        invitation: InvitationView::new(&resent, Utc::now())?,
        email_sent,
    }))
}
