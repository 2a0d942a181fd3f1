use std::sync::Arc;

use beheard_events::token::AblyKey;
use beheard_events::{InvitationMailer, PartnerNotifier};

use crate::config::ServerConfig;

/// Shared application state available to all handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub pool: beheard_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Routes partner events to realtime or push.
    pub notifier: PartnerNotifier,
    pub mailer: Arc<InvitationMailer>,
    /// Signing key for client token requests; `None` when realtime is off.
    pub ably_key: Option<AblyKey>,
}
