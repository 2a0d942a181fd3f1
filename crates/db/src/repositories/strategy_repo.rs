//! Repository for strategies, rankings and agreements.

use beheard_core::strategy::AgreementStatus;
use beheard_core::types::DbId;
use sqlx::PgPool;

use crate::models::strategy::{
    Agreement, CreateAgreement, CreateStrategy, Strategy, StrategyRanking,
};

const STRATEGY_COLUMNS: &str = "id, session_id, proposed_by, description, needs_addressed, \
                                duration, measure_of_success, created_at";

const RANKING_COLUMNS: &str = "id, session_id, user_id, ranked_ids, submitted_at";

const AGREEMENT_COLUMNS: &str = "id, session_id, strategy_id, description, proposed_by, status, \
                                 agreed_at, created_at, updated_at";

/// Provides strategies stage storage.
pub struct StrategyRepo;

impl StrategyRepo {
    /// All strategies proposed in a session, oldest first.
    pub async fn list(pool: &PgPool, session_id: DbId) -> Result<Vec<Strategy>, sqlx::Error> {
        let query = format!(
            "SELECT {STRATEGY_COLUMNS} FROM strategies
             WHERE session_id = $1
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, Strategy>(&query)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }

    /// A strategy of the given session.
    pub async fn find(
        pool: &PgPool,
        session_id: DbId,
        id: DbId,
    ) -> Result<Option<Strategy>, sqlx::Error> {
        let query =
            format!("SELECT {STRATEGY_COLUMNS} FROM strategies WHERE session_id = $1 AND id = $2");
        sqlx::query_as::<_, Strategy>(&query)
            .bind(session_id)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Propose a strategy.
    pub async fn create(pool: &PgPool, input: &CreateStrategy) -> Result<Strategy, sqlx::Error> {
        let query = format!(
            "INSERT INTO strategies
                (session_id, proposed_by, description, needs_addressed, duration, measure_of_success)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {STRATEGY_COLUMNS}"
        );
        sqlx::query_as::<_, Strategy>(&query)
            .bind(input.session_id)
            .bind(input.proposed_by)
            .bind(&input.description)
            .bind(&input.needs_addressed)
            .bind(&input.duration)
            .bind(&input.measure_of_success)
            .fetch_one(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Rankings
    // -----------------------------------------------------------------------

    /// Store the user's ranking, replacing an earlier one.
    pub async fn upsert_ranking(
        pool: &PgPool,
        session_id: DbId,
        user_id: DbId,
        ranked_ids: &[DbId],
    ) -> Result<StrategyRanking, sqlx::Error> {
        let query = format!(
            "INSERT INTO strategy_rankings (session_id, user_id, ranked_ids)
             VALUES ($1, $2, $3)
             ON CONFLICT (session_id, user_id) DO UPDATE
             SET ranked_ids = EXCLUDED.ranked_ids, submitted_at = NOW()
             RETURNING {RANKING_COLUMNS}"
        );
        sqlx::query_as::<_, StrategyRanking>(&query)
            .bind(session_id)
            .bind(user_id)
            .bind(ranked_ids)
            .fetch_one(pool)
            .await
    }

    /// The user's ranking in a session.
    pub async fn find_ranking(
        pool: &PgPool,
        session_id: DbId,
        user_id: DbId,
    ) -> Result<Option<StrategyRanking>, sqlx::Error> {
        let query = format!(
            "SELECT {RANKING_COLUMNS} FROM strategy_rankings
             WHERE session_id = $1 AND user_id = $2"
        );
        sqlx::query_as::<_, StrategyRanking>(&query)
            .bind(session_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Agreements
    // -----------------------------------------------------------------------

    /// Agreements of a session, oldest first.
    pub async fn list_agreements(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<Agreement>, sqlx::Error> {
        let query = format!(
            "SELECT {AGREEMENT_COLUMNS} FROM agreements
             WHERE session_id = $1
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, Agreement>(&query)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }

    /// An agreement of the given session.
    pub async fn find_agreement(
        pool: &PgPool,
        session_id: DbId,
        id: DbId,
    ) -> Result<Option<Agreement>, sqlx::Error> {
        let query =
            format!("SELECT {AGREEMENT_COLUMNS} FROM agreements WHERE session_id = $1 AND id = $2");
        sqlx::query_as::<_, Agreement>(&query)
            .bind(session_id)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Propose an agreement on a strategy.
    pub async fn create_agreement(
        pool: &PgPool,
        input: &CreateAgreement,
    ) -> Result<Agreement, sqlx::Error> {
        let query = format!(
            "INSERT INTO agreements (session_id, strategy_id, description, proposed_by)
             VALUES ($1, $2, $3, $4)
             RETURNING {AGREEMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Agreement>(&query)
            .bind(input.session_id)
            .bind(input.strategy_id)
            .bind(&input.description)
            .bind(input.proposed_by)
            .fetch_one(pool)
            .await
    }

    /// Record the partner's decision on a proposed agreement.
    ///
    /// Returns `None` if it was already decided.
    pub async fn decide_agreement(
        pool: &PgPool,
        id: DbId,
        status: AgreementStatus,
    ) -> Result<Option<Agreement>, sqlx::Error> {
        let query = format!(
            "UPDATE agreements
             SET status = $2,
                 agreed_at = CASE WHEN $2 = 'AGREED' THEN NOW() ELSE NULL END
             WHERE id = $1 AND status = 'PROPOSED'
             RETURNING {AGREEMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Agreement>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(pool)
            .await
    }
}
