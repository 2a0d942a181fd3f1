//! Presence-aware partner notification.
//!
//! For each event the partner gets exactly one delivery: a realtime publish
//! on the session channel when they are present there, a push notification
//! otherwise. A failed presence lookup counts as "not present".

use std::sync::Arc;

use beheard_core::events::SessionEvent;
use beheard_core::session::session_channel_name;
use beheard_core::types::DbId;
use serde_json::{Map, Value};

use crate::push::{PushError, PushMessage, PushOutcome, PushService};
use crate::realtime::{RealtimeError, RealtimeService};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Realtime publish failed: {0}")]
    Realtime(#[from] RealtimeError),

    #[error("Push delivery failed: {0}")]
    Push(#[from] PushError),
}

/// Which path a notification took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Published,
    Pushed(PushOutcome),
}

/// Routes session events to the partner over realtime or push.
#[derive(Clone)]
pub struct PartnerNotifier {
    realtime: Arc<dyn RealtimeService>,
    push: Arc<dyn PushService>,
}

impl PartnerNotifier {
    pub fn new(realtime: Arc<dyn RealtimeService>, push: Arc<dyn PushService>) -> Self {
        Self { realtime, push }
    }

    /// Whether `user_id` is present on the session channel.
    pub async fn is_present(&self, session_id: DbId, user_id: DbId) -> bool {
        let channel = session_channel_name(session_id);
        match self.realtime.presence_members(&channel).await {
            Ok(members) => {
                let client_id = user_id.to_string();
                members.iter().any(|m| *m == client_id)
            }
            Err(e) => {
                tracing::warn!(
                    session_id,
                    user_id,
                    error = %e,
                    "Presence check failed, treating partner as away"
                );
                false
            }
        }
    }

    /// Deliver `event` to the partner, by publish or by push.
    pub async fn notify_partner(
        &self,
        session_id: DbId,
        partner_id: DbId,
        event: SessionEvent,
        payload: Value,
    ) -> Result<Delivery, NotifyError> {
        let data = event_data(
            session_id,
            payload,
            None,
            chrono::Utc::now().timestamp_millis(),
        );

        if self.is_present(session_id, partner_id).await {
            let channel = session_channel_name(session_id);
            self.realtime.publish(&channel, event, &data).await?;
            return Ok(Delivery::Published);
        }

        let (title, body) = event.push_copy();
        let mut push_data = data;
        if let Value::Object(ref mut map) = push_data {
            map.insert("event".to_string(), Value::String(event.as_str().to_string()));
        }
        let message = PushMessage {
            title: title.to_string(),
            body: body.to_string(),
            data: push_data,
        };
        let outcome = self.push.send(partner_id, &message).await?;
        Ok(Delivery::Pushed(outcome))
    }

    /// Fire-and-forget [`Self::notify_partner`]; failures are logged.
    pub fn spawn_notify(
        &self,
        session_id: DbId,
        partner_id: DbId,
        event: SessionEvent,
        payload: Value,
    ) {
        let notifier = self.clone();
        tokio::spawn(async move {
            match notifier
                .notify_partner(session_id, partner_id, event, payload)
                .await
            {
                Ok(delivery) => {
                    tracing::debug!(
                        session_id,
                        partner_id,
                        event = %event,
                        ?delivery,
                        "Partner notified"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        session_id,
                        partner_id,
                        event = %event,
                        error = %e,
                        "Partner notification failed"
                    );
                }
            }
        });
    }
}

/// Published event data: `{sessionId, timestamp, excludeUserId?, ...payload}`.
///
/// Payload keys are merged in last; a non-object payload is stored under
/// `payload`.
pub fn event_data(
    session_id: DbId,
    payload: Value,
    exclude_user_id: Option<DbId>,
    timestamp_ms: i64,
) -> Value {
    let mut data = Map::new();
    data.insert("sessionId".to_string(), Value::from(session_id));
    data.insert("timestamp".to_string(), Value::from(timestamp_ms));
    if let Some(exclude) = exclude_user_id {
        data.insert("excludeUserId".to_string(), Value::from(exclude));
    }
    match payload {
        Value::Object(fields) => data.extend(fields),
        Value::Null => {}
        other => {
            data.insert("payload".to_string(), other);
        }
    }
    Value::Object(data)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    /// Realtime double with scripted presence that records publishes.
    struct FakeRealtime {
        presence: Result<Vec<String>, u16>,
        published: Mutex<Vec<(String, SessionEvent, Value)>>,
    }

    impl FakeRealtime {
        fn with_members(members: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                presence: Ok(members.iter().map(|m| m.to_string()).collect()),
                published: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                presence: Err(503),
                published: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl RealtimeService for FakeRealtime {
        async fn publish(
            &self,
            channel: &str,
            event: SessionEvent,
            data: &Value,
        ) -> Result<(), RealtimeError> {
            self.published
                .lock()
                .unwrap()
                .push((channel.to_string(), event, data.clone()));
            Ok(())
        }

        async fn presence_members(&self, _channel: &str) -> Result<Vec<String>, RealtimeError> {
            self.presence.clone().map_err(RealtimeError::HttpStatus)
        }
    }

    #[derive(Default)]
    struct FakePush {
        sent: Mutex<Vec<(DbId, PushMessage)>>,
    }

    #[async_trait]
    impl PushService for FakePush {
        async fn send(
            &self,
            user_id: DbId,
            message: &PushMessage,
        ) -> Result<PushOutcome, PushError> {
            self.sent.lock().unwrap().push((user_id, message.clone()));
            Ok(PushOutcome::Sent)
        }
    }

    #[tokio::test]
    async fn present_partner_gets_a_publish_and_no_push() {
        let realtime = FakeRealtime::with_members(&["5", "9"]);
        let push = Arc::new(FakePush::default());
        let notifier = PartnerNotifier::new(realtime.clone(), push.clone());

        let delivery = notifier
            .notify_partner(3, 9, SessionEvent::PartnerSignedCompact, json!({"stage": 0}))
            .await
            .unwrap();

        assert_eq!(delivery, Delivery::Published);
        assert!(push.sent.lock().unwrap().is_empty());
        let published = realtime.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        let (channel, event, data) = &published[0];
        assert_eq!(channel, "beheard:session:3");
        assert_eq!(*event, SessionEvent::PartnerSignedCompact);
        assert_eq!(data["sessionId"], 3);
        assert_eq!(data["stage"], 0);
    }

    #[tokio::test]
    async fn absent_partner_gets_a_push_and_no_publish() {
        let realtime = FakeRealtime::with_members(&["5"]);
        let push = Arc::new(FakePush::default());
        let notifier = PartnerNotifier::new(realtime.clone(), push.clone());

        let delivery = notifier
            .notify_partner(3, 9, SessionEvent::SessionPaused, json!({}))
            .await
            .unwrap();

        assert_matches!(delivery, Delivery::Pushed(PushOutcome::Sent));
        assert!(realtime.published.lock().unwrap().is_empty());
        let sent = push.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 9);
        assert_eq!(sent[0].1.data["event"], "session.paused");
        assert_eq!(sent[0].1.title, "Session paused");
    }

    #[tokio::test]
    async fn presence_failure_falls_back_to_push() {
        let realtime = FakeRealtime::failing();
        let push = Arc::new(FakePush::default());
        let notifier = PartnerNotifier::new(realtime.clone(), push.clone());

        let delivery = notifier
            .notify_partner(3, 9, SessionEvent::PartnerNeedsShared, json!({}))
            .await
            .unwrap();

        assert_matches!(delivery, Delivery::Pushed(_));
        assert!(realtime.published.lock().unwrap().is_empty());
        assert_eq!(push.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn event_data_merges_payload_after_envelope_fields() {
        let data = event_data(4, json!({"stage": 2, "userId": 8}), Some(8), 1_000);
        assert_eq!(
            data,
            json!({"sessionId": 4, "timestamp": 1000, "excludeUserId": 8, "stage": 2, "userId": 8})
        );

        let bare = event_data(4, Value::Null, None, 1_000);
        assert_eq!(bare, json!({"sessionId": 4, "timestamp": 1000}));
    }
}
