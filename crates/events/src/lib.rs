//! Partner notification and outbound delivery for BeHeard.
//!
//! - [`realtime`] publishes session events to Ably channels and reads
//!   channel presence.
//! - [`push`] delivers Expo push notifications to a user's device.
//! - [`PartnerNotifier`] picks between the two per event: publish when the
//!   partner is present on the session channel, push otherwise.
//! - [`token`] signs Ably token requests for mobile clients.
//! - [`delivery`] sends invitation emails over SMTP.

pub mod delivery;
pub mod notifier;
pub mod push;
pub mod realtime;
pub mod token;

pub use delivery::email::{EmailConfig, InvitationMailer};
pub use notifier::{Delivery, NotifyError, PartnerNotifier};
pub use push::{ExpoPush, PushConfig, PushService};
pub use realtime::{AblyRealtime, LogRealtime, RealtimeConfig, RealtimeService};
