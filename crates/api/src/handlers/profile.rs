//! Handlers for the caller's own profile (`/me`).

use axum::extract::State;
use axum::Json;
use beheard_core::error::CoreError;
use beheard_db::models::user::{UpdateProfile, User};
use beheard_db::repositories::{SessionRepo, UserRepo};
use beheard_events::token::{create_token_request, TokenRequest};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::extract::ValidJson;
use crate::handlers::auth::UserInfo;
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushPlatform {
    Ios,
    Android,
}

impl PushPlatform {
    pub fn as_str(self) -> &'static str {
        match self {
            PushPlatform::Ios => "ios",
            PushPlatform::Android => "android",
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PushTokenRequest {
    #[validate(length(min = 1, message = "Push token is required"))]
    pub push_token: String,
    pub platform: PushPlatform,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: UserInfo,
    /// Sessions that are invited, active or paused.
    pub active_sessions: i64,
    pub push_notifications_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct PushTokenResponse {
    pub registered: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AblyTokenResponse {
    pub token_request: TokenRequest,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/me
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<ApiResponse<MeResponse>>> {
    let user = find_user(&state, auth).await?;
    let active_sessions = SessionRepo::count_open_for_user(&state.pool, user.id).await?;

    Ok(ApiResponse::ok(MeResponse {
        user: UserInfo::from(&user),
        active_sessions,
        push_notifications_enabled: user.push_token.is_some(),
    }))
}

/// PATCH /api/v1/me
pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(input): ValidJson<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<ProfileResponse>>> {
    let update = UpdateProfile {
        name: input.name.map(|n| n.trim().to_string()),
    };
    let user = UserRepo::update_profile(&state.pool, auth.user_id, &update)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth.user_id,
        }))?;

    Ok(ApiResponse::ok(ProfileResponse {
        user: UserInfo::from(&user),
    }))
}

/// POST /api/v1/me/push-token
pub async fn register_push_token(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(input): ValidJson<PushTokenRequest>,
) -> AppResult<Json<ApiResponse<PushTokenResponse>>> {
    let registered = UserRepo::set_push_token(
        &state.pool,
        auth.user_id,
        &input.push_token,
        input.platform.as_str(),
    )
    .await?;
    tracing::info!(
        user_id = auth.user_id,
        platform = input.platform.as_str(),
        "Push token registered"
    );

    Ok(ApiResponse::ok(PushTokenResponse { registered }))
}

/// POST /api/v1/me/push-token/unregister
pub async fn unregister_push_token(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<ApiResponse<PushTokenResponse>>> {
    UserRepo::clear_push_token(&state.pool, auth.user_id).await?;
    Ok(ApiResponse::ok(PushTokenResponse { registered: false }))
}

/// GET /api/v1/me/ably-token
///
/// A signed token request the mobile client exchanges with Ably. It grants
/// access to the channels of the caller's open sessions only.
pub async fn ably_token(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<ApiResponse<AblyTokenResponse>>> {
    let key = state
        .ably_key
        .as_ref()
        .ok_or_else(|| {
            AppError::InternalError("Realtime is not configured (ABLY_API_KEY)".into())
        })?;

    let session_ids = SessionRepo::open_session_ids(&state.pool, auth.user_id).await?;
    let token_request = create_token_request(
        key,
        auth.user_id,
        &session_ids,
        chrono::Utc::now().timestamp_millis(),
    );

    Ok(ApiResponse::ok(AblyTokenResponse { token_request }))
}

async fn find_user(state: &AppState, auth: AuthUser) -> AppResult<User> {
    UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth.user_id,
        }))
}
