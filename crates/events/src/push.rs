//! Push notifications through the Expo push service.

use std::time::Duration;

use async_trait::async_trait;
use beheard_core::types::DbId;
use beheard_db::repositories::UserRepo;
use beheard_db::DbPool;
use serde::Serialize;

/// Default Expo push endpoint.
const DEFAULT_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";

/// HTTP request timeout for a single push call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Push service returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Push token lookup failed: {0}")]
    Database(#[from] sqlx::Error),
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PushConfig {
    pub push_url: String,
    /// Expo access token, required only when push security is enabled.
    pub access_token: Option<String>,
}

impl PushConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable            | Required | Default                                 |
    /// |---------------------|----------|-----------------------------------------|
    /// | `EXPO_PUSH_URL`     | no       | `https://exp.host/--/api/v2/push/send`  |
    /// | `EXPO_ACCESS_TOKEN` | no       | none                                    |
    pub fn from_env() -> Self {
        Self {
            push_url: std::env::var("EXPO_PUSH_URL")
                .unwrap_or_else(|_| DEFAULT_PUSH_URL.to_string()),
            access_token: std::env::var("EXPO_ACCESS_TOKEN").ok().filter(|t| !t.is_empty()),
        }
    }
}

// ---------------------------------------------------------------------------
// Service trait
// ---------------------------------------------------------------------------

/// A notification addressed to one user.
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

/// What happened to a push request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Sent,
    /// The user has no registered device.
    NoDevice,
}

#[async_trait]
pub trait PushService: Send + Sync {
    async fn send(&self, user_id: DbId, message: &PushMessage) -> Result<PushOutcome, PushError>;
}

// ---------------------------------------------------------------------------
// Expo
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ExpoMessage<'a> {
    to: &'a str,
    title: &'a str,
    body: &'a str,
    data: &'a serde_json::Value,
    sound: &'static str,
}

/// Sends to the device token stored on the user's profile.
pub struct ExpoPush {
    pool: DbPool,
    client: reqwest::Client,
    config: PushConfig,
}

impl ExpoPush {
    pub fn new(pool: DbPool, config: PushConfig) -> Result<Self, PushError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            pool,
            client,
            config,
        })
    }
}

#[async_trait]
impl PushService for ExpoPush {
    async fn send(&self, user_id: DbId, message: &PushMessage) -> Result<PushOutcome, PushError> {
        let Some(registration) = UserRepo::find_push_registration(&self.pool, user_id).await?
        else {
            tracing::info!(user_id, "No push token registered, skipping push notification");
            return Ok(PushOutcome::NoDevice);
        };

        let payload = ExpoMessage {
            to: &registration.push_token,
            title: &message.title,
            body: &message.body,
            data: &message.data,
            sound: "default",
        };
        let mut request = self.client.post(&self.config.push_url).json(&payload);
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(PushError::HttpStatus(response.status().as_u16()));
        }

        tracing::info!(
            user_id,
            platform = registration.push_platform.as_deref().unwrap_or("unknown"),
            "Push notification sent"
        );
        Ok(PushOutcome::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expo_message_shape() {
        let data = serde_json::json!({"sessionId": 3});
        let message = ExpoMessage {
            to: "ExponentPushToken[abc]",
            title: "Session paused",
            body: "Your partner paused the session.",
            data: &data,
            sound: "default",
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["to"], "ExponentPushToken[abc]");
        assert_eq!(json["data"]["sessionId"], 3);
        assert_eq!(json["sound"], "default");
    }

    #[test]
    fn push_error_display_http_status() {
        assert_eq!(
            PushError::HttpStatus(429).to_string(),
            "Push service returned HTTP 429"
        );
    }
}
