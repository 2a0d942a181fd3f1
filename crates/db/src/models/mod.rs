//! Row structs and insert DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - A `Create*` DTO for inserts where the table takes client data

pub mod emotion;
pub mod empathy;
pub mod gate_facts;
pub mod invitation;
pub mod need;
pub mod refresh_token;
pub mod session;
pub mod stage;
pub mod strategy;
pub mod user;
