//! Repository for the `users` table.

use beheard_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::{CreateUser, PushRegistration, UpdateProfile, User};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, email, name, password_hash, push_token, push_platform, \
                       created_at, updated_at";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    ///
    /// A duplicate email violates `uq_users_email`.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, name, password_hash)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.email)
            .bind(&input.name)
            .bind(&input.password_hash)
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by (lowercased) email.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Apply a profile update. Only non-`None` fields are changed.
    pub async fn update_profile(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProfile,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET name = COALESCE($2, name)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&input.name)
            .fetch_optional(pool)
            .await
    }

    /// Register (or replace) the user's push token.
    pub async fn set_push_token(
        pool: &PgPool,
        id: DbId,
        token: &str,
        platform: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET push_token = $2, push_platform = $3 WHERE id = $1")
                .bind(id)
                .bind(token)
                .bind(platform)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove the user's push token. Returns `true` if one was registered.
    pub async fn clear_push_token(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET push_token = NULL, push_platform = NULL
             WHERE id = $1 AND push_token IS NOT NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The device a push notification for `id` should go to, if any.
    pub async fn find_push_registration(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<PushRegistration>, sqlx::Error> {
        sqlx::query_as::<_, PushRegistration>(
            "SELECT push_token, push_platform FROM users
             WHERE id = $1 AND push_token IS NOT NULL",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
