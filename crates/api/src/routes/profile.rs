//! Route definitions for the caller's own profile at `/me`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::profile;
use crate::state::AppState;

/// Routes mounted at `/me`.
///
/// ```text
/// GET   /                         -> get_me
/// PATCH /                         -> update_me
/// POST  /push-token               -> register_push_token
/// POST  /push-token/unregister    -> unregister_push_token
/// GET   /ably-token               -> ably_token
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(profile::get_me).patch(profile::update_me))
        .route("/push-token", post(profile::register_push_token))
        .route("/push-token/unregister", post(profile::unregister_push_token))
        .route("/ably-token", get(profile::ably_token))
}
