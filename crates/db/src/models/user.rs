//! User entity model and DTOs.

use beheard_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// Full user row from the `users` table.
///
/// Contains the password hash and push token; API responses are built from
/// it field by field, never serialized directly.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub push_token: Option<String>,
    pub push_platform: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new user. `email` is stored lowercased.
#[derive(Debug)]
pub struct CreateUser {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
}

/// DTO for profile updates. All fields are optional.
#[derive(Debug, Default)]
pub struct UpdateProfile {
    pub name: Option<String>,
}

/// Registered device for push delivery.
#[derive(Debug, Clone, FromRow)]
pub struct PushRegistration {
    pub push_token: String,
    pub push_platform: Option<String>,
}
