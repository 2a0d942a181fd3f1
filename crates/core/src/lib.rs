//! Domain rules of the BeHeard guided conversation: stages and their gates,
//! session and invitation lifecycles, and per-stage validation limits.
//!
//! This crate has no I/O. The `db` crate persists the entities and the `api`
//! crate drives these rules from HTTP handlers.

pub mod emotion;
pub mod empathy;
pub mod error;
pub mod events;
pub mod gates;
pub mod invitation;
pub mod needs;
pub mod session;
pub mod stage;
pub mod strategy;
pub mod types;
pub mod validation;
