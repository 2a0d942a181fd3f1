//! Request handlers, one module per resource.
//!
//! Handlers validate input, apply the rules in `beheard_core`, persist via the
//! repositories in `beheard_db`, and notify the partner through the
//! [`PartnerNotifier`](beheard_events::PartnerNotifier) where an action
//! concerns them.

pub mod access;
pub mod auth;
pub mod emotions;
pub mod empathy;
pub mod invitations;
pub mod needs;
pub mod profile;
pub mod sessions;
pub mod stages;
pub mod strategies;
