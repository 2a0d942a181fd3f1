//! Route definitions for the `/sessions` resource and its per-stage
//! sub-resources.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{emotions, empathy, needs, sessions, stages, strategies};
use crate::state::AppState;

/// Routes mounted at `/sessions`.
///
/// ```text
/// GET  /                                        -> list_sessions
/// POST /                                        -> create_session
/// GET  /{id}                                    -> get_session
/// POST /{id}/pause                              -> pause_session
/// POST /{id}/resume                             -> resume_session
///
/// GET  /{id}/progress                           -> get_progress
/// POST /{id}/stages/advance                     -> advance_stage
///
/// GET  /{id}/emotions                           -> list_emotions
/// POST /{id}/emotions                           -> record_emotion
/// POST /{id}/exercises/complete                 -> complete_exercise
///
/// POST /{id}/compact/sign                       -> sign_compact
/// POST /{id}/feel-heard                         -> confirm_feel_heard
///
/// GET  /{id}/empathy/draft                      -> get_draft
/// POST /{id}/empathy/draft                      -> save_draft
/// POST /{id}/empathy/consent                    -> consent_to_share
/// GET  /{id}/empathy/partner                    -> get_partner_empathy
/// POST /{id}/empathy/validate                   -> validate_partner_empathy
///
/// GET  /{id}/needs                              -> list_needs
/// POST /{id}/needs                              -> create_need
/// POST /{id}/needs/confirm                      -> confirm_needs
/// POST /{id}/needs/share                        -> share_needs
/// GET  /{id}/needs/partner                      -> get_partner_needs
///
/// GET  /{id}/strategies                         -> list_strategies
/// POST /{id}/strategies                         -> create_strategy
/// POST /{id}/strategies/rank                    -> rank_strategies
/// POST /{id}/agreements                         -> propose_agreement
/// POST /{id}/agreements/{agreement_id}/confirm  -> confirm_agreement
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(sessions::list_sessions).post(sessions::create_session))
        .route("/{id}", get(sessions::get_session))
        .route("/{id}/pause", post(sessions::pause_session))
        .route("/{id}/resume", post(sessions::resume_session))
        // Stage progress.
        .route("/{id}/progress", get(stages::get_progress))
        .route("/{id}/stages/advance", post(stages::advance_stage))
        // Emotional barometer.
        .route(
            "/{id}/emotions",
            get(emotions::list_emotions).post(emotions::record_emotion),
        )
        .route("/{id}/exercises/complete", post(emotions::complete_exercise))
        // Stage 0 and 1.
        .route("/{id}/compact/sign", post(stages::sign_compact))
        .route("/{id}/feel-heard", post(stages::confirm_feel_heard))
        // Stage 2.
        .route(
            "/{id}/empathy/draft",
            get(empathy::get_draft).post(empathy::save_draft),
        )
        .route("/{id}/empathy/consent", post(empathy::consent_to_share))
        .route("/{id}/empathy/partner", get(empathy::get_partner_empathy))
        .route("/{id}/empathy/validate", post(empathy::validate_partner_empathy))
        // Stage 3.
        .route("/{id}/needs", get(needs::list_needs).post(needs::create_need))
        .route("/{id}/needs/confirm", post(needs::confirm_needs))
        .route("/{id}/needs/share", post(needs::share_needs))
        .route("/{id}/needs/partner", get(needs::get_partner_needs))
        // Stage 4.
        .route(
            "/{id}/strategies",
            get(strategies::list_strategies).post(strategies::create_strategy),
        )
        .route("/{id}/strategies/rank", post(strategies::rank_strategies))
        .route("/{id}/agreements", post(strategies::propose_agreement))
        .route(
            "/{id}/agreements/{agreement_id}/confirm",
            post(strategies::confirm_agreement),
        )
}
