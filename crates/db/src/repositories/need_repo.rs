//! Repository for the `needs` table.

use beheard_core::types::DbId;
use sqlx::PgPool;

use crate::models::need::{CreateNeed, Need, NeedAdjustment};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, session_id, user_id, category, need, description, confirmed, \
                       correction, shared_at, created_at, updated_at";

/// Provides needs stage storage.
pub struct NeedRepo;

impl NeedRepo {
    /// The user's needs in a session, oldest first.
    pub async fn list_for_user(
        pool: &PgPool,
        session_id: DbId,
        user_id: DbId,
    ) -> Result<Vec<Need>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM needs
             WHERE session_id = $1 AND user_id = $2
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, Need>(&query)
            .bind(session_id)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// The user's needs that have been shared with the partner.
    pub async fn list_shared(
        pool: &PgPool,
        session_id: DbId,
        user_id: DbId,
    ) -> Result<Vec<Need>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM needs
             WHERE session_id = $1 AND user_id = $2 AND shared_at IS NOT NULL
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, Need>(&query)
            .bind(session_id)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Add a need.
    pub async fn create(pool: &PgPool, input: &CreateNeed) -> Result<Need, sqlx::Error> {
        let query = format!(
            "INSERT INTO needs (session_id, user_id, category, need, description)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Need>(&query)
            .bind(input.session_id)
            .bind(input.user_id)
            .bind(&input.category)
            .bind(&input.need)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    /// Confirm the listed needs and apply per-need adjustments.
    ///
    /// Ids that are not the user's needs in this session are ignored.
    /// Adjustments run after the bulk confirmation, so an adjustment with
    /// `confirmed = false` wins over the same id in `need_ids`.
    pub async fn confirm(
        pool: &PgPool,
        session_id: DbId,
        user_id: DbId,
        need_ids: &[DbId],
        adjustments: &[NeedAdjustment],
    ) -> Result<Vec<Need>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "UPDATE needs SET confirmed = true
             WHERE session_id = $1 AND user_id = $2 AND id = ANY($3)",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(need_ids)
        .execute(&mut *tx)
        .await?;

        for adjustment in adjustments {
            sqlx::query(
                "UPDATE needs SET confirmed = $4, correction = COALESCE($5, correction)
                 WHERE session_id = $1 AND user_id = $2 AND id = $3",
            )
            .bind(session_id)
            .bind(user_id)
            .bind(adjustment.need_id)
            .bind(adjustment.confirmed)
            .bind(&adjustment.correction)
            .execute(&mut *tx)
            .await?;
        }

        let query = format!(
            "SELECT {COLUMNS} FROM needs
             WHERE session_id = $1 AND user_id = $2
             ORDER BY created_at, id"
        );
        let needs = sqlx::query_as::<_, Need>(&query)
            .bind(session_id)
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(needs)
    }

    /// Mark the user's confirmed needs as shared. Returns the shared rows.
    pub async fn share_confirmed(
        pool: &PgPool,
        session_id: DbId,
        user_id: DbId,
    ) -> Result<Vec<Need>, sqlx::Error> {
        let query = format!(
            "UPDATE needs SET shared_at = NOW()
             WHERE session_id = $1 AND user_id = $2 AND confirmed AND shared_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Need>(&query)
            .bind(session_id)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}
