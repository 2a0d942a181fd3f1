//! Signed Ably token requests.
//!
//! Mobile clients never see the API key. They fetch a token request signed
//! with it, scoped to their own client id and session channels, and
//! exchange it with Ably for a short-lived token.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use beheard_core::session::session_channel_name;
use beheard_core::types::DbId;
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::Serialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Lifetime of issued tokens.
pub const TOKEN_TTL_MS: i64 = 60 * 60 * 1000;

/// Operations granted on each session channel.
const SESSION_CHANNEL_OPS: [&str; 3] = ["presence", "publish", "subscribe"];

const NONCE_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Ably API key must have the form <keyName>:<secret>")]
    MalformedKey,
}

/// An Ably API key split into its public name and signing secret.
#[derive(Clone)]
pub struct AblyKey {
    name: String,
    secret: String,
}

impl AblyKey {
    pub fn parse(api_key: &str) -> Result<Self, TokenError> {
        match api_key.split_once(':') {
            Some((name, secret)) if !name.is_empty() && !secret.is_empty() => Ok(Self {
                name: name.to_string(),
                secret: secret.to_string(),
            }),
            _ => Err(TokenError::MalformedKey),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl std::fmt::Debug for AblyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AblyKey")
            .field("name", &self.name)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Token request in the shape the Ably client libraries accept.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub key_name: String,
    pub ttl: i64,
    /// JSON-encoded capability map.
    pub capability: String,
    pub client_id: String,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
    pub nonce: String,
    pub mac: String,
}

/// Capability JSON granting the session channel operations on each session.
pub fn session_capability(session_ids: &[DbId]) -> String {
    let map: BTreeMap<String, [&str; 3]> = session_ids
        .iter()
        .map(|id| (session_channel_name(*id), SESSION_CHANNEL_OPS))
        .collect();
    serde_json::to_string(&map).unwrap_or_else(|_| "{}".to_string())
}

/// Build and sign a token request for `user_id`.
pub fn create_token_request(
    key: &AblyKey,
    user_id: DbId,
    session_ids: &[DbId],
    timestamp_ms: i64,
) -> TokenRequest {
    let nonce: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect();
    sign(
        key,
        user_id.to_string(),
        session_capability(session_ids),
        timestamp_ms,
        nonce,
    )
}

fn sign(
    key: &AblyKey,
    client_id: String,
    capability: String,
    timestamp: i64,
    nonce: String,
) -> TokenRequest {
    let text = format!(
        "{}\n{}\n{}\n{}\n{}\n{}\n",
        key.name, TOKEN_TTL_MS, capability, client_id, timestamp, nonce
    );
    let mut mac = HmacSha256::new_from_slice(key.secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(text.as_bytes());
    let mac = BASE64.encode(mac.finalize().into_bytes());

    TokenRequest {
        key_name: key.name.clone(),
        ttl: TOKEN_TTL_MS,
        capability,
        client_id,
        timestamp,
        nonce,
        mac,
    }
}
