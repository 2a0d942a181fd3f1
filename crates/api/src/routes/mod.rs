pub mod auth;
pub mod health;
pub mod invitations;
pub mod profile;
pub mod sessions;

use axum::http::{Method, Uri};
use axum::Router;

use crate::error::AppError;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/signup                                     signup (public)
/// /auth/login                                      login (public)
/// /auth/refresh                                    refresh (public)
/// /auth/logout                                     logout (requires auth)
///
/// /me                                              get, update profile
/// /me/push-token                                   register device (POST)
/// /me/push-token/unregister                        forget device (POST)
/// /me/ably-token                                   realtime token request
///
/// /invitations                                     pending for caller's email
/// /invitations/{id}                                invitation details (public)
/// /invitations/{id}/accept                         accept (POST)
/// /invitations/{id}/decline                        decline (POST)
/// /invitations/{id}/resend                         resend email (POST, inviter)
///
/// /sessions                                        list, create
/// /sessions/{id}                                   detail
/// /sessions/{id}/pause, /resume                    lifecycle (POST)
/// /sessions/{id}/progress                          stage, gates, canAdvance
/// /sessions/{id}/stages/advance                    advance (POST)
/// /sessions/{id}/emotions                          list, record
/// /sessions/{id}/exercises/complete                log exercise (POST)
/// /sessions/{id}/compact/sign                      stage 0 (POST)
/// /sessions/{id}/feel-heard                        stage 1 (POST)
/// /sessions/{id}/empathy/...                       stage 2
/// /sessions/{id}/needs/...                         stage 3
/// /sessions/{id}/strategies, /agreements/...       stage 4
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Authentication routes (signup, login, refresh, logout).
        .nest("/auth", auth::router())
        // The caller's profile, device and realtime token.
        .nest("/me", profile::router())
        // Invitation lookup and responses.
        .nest("/invitations", invitations::router())
        // Sessions and every stage action.
        .nest("/sessions", sessions::router())
}

/// Fallback for unmatched paths, answered with the error envelope.
pub async fn route_not_found(method: Method, uri: Uri) -> AppError {
    AppError::RouteNotFound {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}
