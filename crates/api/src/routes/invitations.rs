//! Route definitions for the `/invitations` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::invitations;
use crate::state::AppState;

/// Routes mounted at `/invitations`.
///
/// ```text
/// GET  /               -> list_pending
/// GET  /{id}           -> get_invitation (public)
/// POST /{id}/accept    -> accept_invitation
/// POST /{id}/decline   -> decline_invitation
/// POST /{id}/resend    -> resend_invitation
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(invitations::list_pending))
        .route("/{id}", get(invitations::get_invitation))
        .route("/{id}/accept", post(invitations::accept_invitation))
        .route("/{id}/decline", post(invitations::decline_invitation))
        .route("/{id}/resend", post(invitations::resend_invitation))
}
