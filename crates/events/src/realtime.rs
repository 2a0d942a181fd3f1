//! Realtime delivery over Ably channels.
//!
//! [`RealtimeService`] is the seam the notifier talks to. [`AblyRealtime`]
//! implements it against the Ably REST API; [`LogRealtime`] is used when no
//! `ABLY_API_KEY` is configured and only logs what would have been sent.

use std::time::Duration;

use async_trait::async_trait;
use beheard_core::events::SessionEvent;
use serde::Deserialize;

use crate::token::{AblyKey, TokenError};

/// Default Ably REST endpoint.
const DEFAULT_REST_URL: &str = "https://rest.ably.io";

/// HTTP request timeout for a single REST call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Ably returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Invalid Ably REST URL: {0}")]
    Url(String),

    #[error(transparent)]
    Key(#[from] TokenError),
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Full Ably API key, `"<keyName>:<secret>"`.
    pub api_key: String,
    /// REST endpoint base URL.
    pub rest_url: String,
}

impl RealtimeConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `ABLY_API_KEY` is not set; realtime events are then
    /// logged instead of published.
    ///
    /// | Variable        | Required | Default                 |
    /// |-----------------|----------|-------------------------|
    /// | `ABLY_API_KEY`  | yes      | none                    |
    /// | `ABLY_REST_URL` | no       | `https://rest.ably.io`  |
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("ABLY_API_KEY").ok().filter(|k| !k.is_empty())?;
        Some(Self {
            api_key,
            rest_url: std::env::var("ABLY_REST_URL")
                .unwrap_or_else(|_| DEFAULT_REST_URL.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Service trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait RealtimeService: Send + Sync {
    /// Publish `event` with `data` on `channel`.
    async fn publish(
        &self,
        channel: &str,
        event: SessionEvent,
        data: &serde_json::Value,
    ) -> Result<(), RealtimeError>;

    /// Client ids currently present on `channel`.
    async fn presence_members(&self, channel: &str) -> Result<Vec<String>, RealtimeError>;
}

// ---------------------------------------------------------------------------
// Ably
// ---------------------------------------------------------------------------

/// Ably REST client.
pub struct AblyRealtime {
    client: reqwest::Client,
    rest_url: reqwest::Url,
    key: AblyKey,
}

impl std::fmt::Debug for AblyRealtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AblyRealtime")
            .field("rest_url", &self.rest_url.as_str())
            .field("key_name", &self.key.name())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PresenceMessage {
    client_id: Option<String>,
}

impl AblyRealtime {
    pub fn new(config: &RealtimeConfig) -> Result<Self, RealtimeError> {
        let key = AblyKey::parse(&config.api_key)?;
        let rest_url = reqwest::Url::parse(&config.rest_url)
            .map_err(|e| RealtimeError::Url(e.to_string()))?;
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            rest_url,
            key,
        })
    }

    /// Signing key, shared with the token request endpoint.
    pub fn key(&self) -> &AblyKey {
        &self.key
    }

    /// `<rest_url>/channels/<channel>/<leaf>` with the channel name encoded
    /// as a single path segment.
    fn channel_url(&self, channel: &str, leaf: &str) -> Result<reqwest::Url, RealtimeError> {
        let mut url = self.rest_url.clone();
        url.path_segments_mut()
            .map_err(|_| RealtimeError::Url(self.rest_url.to_string()))?
            .pop_if_empty()
            .extend(["channels", channel, leaf]);
        Ok(url)
    }
}

#[async_trait]
impl RealtimeService for AblyRealtime {
    async fn publish(
        &self,
        channel: &str,
        event: SessionEvent,
        data: &serde_json::Value,
    ) -> Result<(), RealtimeError> {
        let url = self.channel_url(channel, "messages")?;
        let body = serde_json::json!({
            "name": event.as_str(),
            "data": data.to_string(),
            "encoding": "json",
        });
        let response = self
            .client
            .post(url)
            .basic_auth(self.key.name(), Some(self.key.secret()))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RealtimeError::HttpStatus(response.status().as_u16()));
        }
        tracing::info!(channel, event = %event, "Published realtime event");
        Ok(())
    }

    async fn presence_members(&self, channel: &str) -> Result<Vec<String>, RealtimeError> {
        let url = self.channel_url(channel, "presence")?;
        let response = self
            .client
            .get(url)
            .basic_auth(self.key.name(), Some(self.key.secret()))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RealtimeError::HttpStatus(response.status().as_u16()));
        }
        let members: Vec<PresenceMessage> = response.json().await?;
        Ok(members.into_iter().filter_map(|m| m.client_id).collect())
    }
}

// ---------------------------------------------------------------------------
// Log-only fallback
// ---------------------------------------------------------------------------

/// Stand-in used when Ably is not configured.
///
/// Publishing only logs the event, and nobody is ever present, so every
/// notification falls through to push.
#[derive(Debug, Default)]
pub struct LogRealtime;

#[async_trait]
impl RealtimeService for LogRealtime {
    async fn publish(
        &self,
        channel: &str,
        event: SessionEvent,
        data: &serde_json::Value,
    ) -> Result<(), RealtimeError> {
        tracing::info!(
            channel,
            event = %event,
            %data,
            "Realtime not configured, event not published"
        );
        Ok(())
    }

    async fn presence_members(&self, channel: &str) -> Result<Vec<String>, RealtimeError> {
        tracing::debug!(channel, "Realtime not configured, reporting empty presence");
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
