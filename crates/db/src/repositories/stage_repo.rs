//! Repository for the `stage_progress` table and gate facts.

use beheard_core::gates::ParticipantFacts;
use beheard_core::stage::{Stage, StageStatus};
use beheard_core::types::DbId;
use sqlx::PgPool;

use crate::models::gate_facts::GateFactsRow;
use crate::models::stage::{AdvanceOutcome, StageProgress};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, session_id, user_id, stage, status, started_at, completed_at, \
                       gates, created_at, updated_at";

/// One query computing every [`ParticipantFacts`] field for ($1 session, $2 user).
///
/// Stage-local flags live in the `gates` JSON of the stage's row; the rest
/// are derived from the rows the stage actions write.
const FACTS_QUERY: &str = "
    SELECT
        COALESCE((SELECT (gates->>'compactSigned')::boolean FROM stage_progress
                  WHERE session_id = $1 AND user_id = $2 AND stage = 0), false)
            AS compact_signed,
        COALESCE((SELECT (gates->>'feelHeardConfirmed')::boolean FROM stage_progress
                  WHERE session_id = $1 AND user_id = $2 AND stage = 1), false)
            AS feel_heard_confirmed,
        EXISTS (SELECT 1 FROM emotional_readings r
                JOIN user_vessels v ON v.id = r.vessel_id
                WHERE v.session_id = $1 AND v.user_id = $2 AND r.stage = 1)
            AS emotion_recorded,
        EXISTS (SELECT 1 FROM empathy_attempts
                WHERE session_id = $1 AND user_id = $2)
            AS empathy_shared,
        EXISTS (SELECT 1 FROM empathy_validations ev
                JOIN empathy_attempts a ON a.id = ev.attempt_id
                WHERE a.session_id = $1 AND a.user_id = $2 AND ev.validated)
            AS empathy_validated_by_partner,
        EXISTS (SELECT 1 FROM empathy_validations ev
                JOIN empathy_attempts a ON a.id = ev.attempt_id
                WHERE a.session_id = $1 AND ev.user_id = $2)
            AS reviewed_partner_empathy,
        COALESCE((SELECT (gates->>'needsConfirmed')::boolean FROM stage_progress
                  WHERE session_id = $1 AND user_id = $2 AND stage = 3), false)
            AS needs_confirmed,
        COALESCE((SELECT (gates->>'needsShared')::boolean FROM stage_progress
                  WHERE session_id = $1 AND user_id = $2 AND stage = 3), false)
            AS needs_shared,
        EXISTS (SELECT 1 FROM strategy_rankings
                WHERE session_id = $1 AND user_id = $2)
            AS ranking_submitted,
        EXISTS (SELECT 1 FROM agreements
                WHERE session_id = $1 AND status = 'AGREED')
            AS agreement_confirmed";

/// Provides stage progress reads, gate flag writes and the advance transaction.
pub struct StageRepo;

impl StageRepo {
    /// The user's current (highest) stage row.
    pub async fn current(
        pool: &PgPool,
        session_id: DbId,
        user_id: DbId,
    ) -> Result<Option<StageProgress>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM stage_progress
             WHERE session_id = $1 AND user_id = $2
             ORDER BY stage DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, StageProgress>(&query)
            .bind(session_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// The user's row for a specific stage.
    pub async fn find(
        pool: &PgPool,
        session_id: DbId,
        user_id: DbId,
        stage: Stage,
    ) -> Result<Option<StageProgress>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM stage_progress
             WHERE session_id = $1 AND user_id = $2 AND stage = $3"
        );
        sqlx::query_as::<_, StageProgress>(&query)
            .bind(session_id)
            .bind(user_id)
            .bind(stage.ordinal())
            .fetch_optional(pool)
            .await
    }

    /// Highest stage the user has `IN_PROGRESS`, if any.
    pub async fn highest_in_progress(
        pool: &PgPool,
        session_id: DbId,
        user_id: DbId,
    ) -> Result<Option<i16>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<i16>>(
            "SELECT MAX(stage) FROM stage_progress
             WHERE session_id = $1 AND user_id = $2 AND status = 'IN_PROGRESS'",
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Merge `patch` into the `gates` JSON of the user's row for `stage`.
    ///
    /// Returns `None` if the user has no row for that stage.
    pub async fn merge_gates(
        pool: &PgPool,
        session_id: DbId,
        user_id: DbId,
        stage: Stage,
        patch: &serde_json::Value,
    ) -> Result<Option<StageProgress>, sqlx::Error> {
        let query = format!(
            "UPDATE stage_progress SET gates = gates || $4
             WHERE session_id = $1 AND user_id = $2 AND stage = $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StageProgress>(&query)
            .bind(session_id)
            .bind(user_id)
            .bind(stage.ordinal())
            .bind(patch)
            .fetch_optional(pool)
            .await
    }

    /// Facts recorded by the user in this session, for gate evaluation.
    pub async fn participant_facts(
        pool: &PgPool,
        session_id: DbId,
        user_id: DbId,
    ) -> Result<ParticipantFacts, sqlx::Error> {
        let row = sqlx::query_as::<_, GateFactsRow>(FACTS_QUERY)
            .bind(session_id)
            .bind(user_id)
            .fetch_one(pool)
            .await?;
        Ok(row.into())
    }

    /// Complete the user's `stage` and open the next one.
    ///
    /// Runs in one transaction holding the session row lock, so advances in
    /// one session run one at a time. The stage row is completed with a
    /// conditional update; a repeated advance of the same stage gets `None`.
    /// Completing the last stage resolves the session once both
    /// participants are done.
    pub async fn advance(
        pool: &PgPool,
        session_id: DbId,
        user_id: DbId,
        stage: Stage,
    ) -> Result<Option<AdvanceOutcome>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        // Serialize advances within the session so the finished count below
        // sees the partner's committed completion.
        sqlx::query("SELECT id FROM sessions WHERE id = $1 FOR UPDATE")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        let lock_query = format!(
            "SELECT {COLUMNS} FROM stage_progress
             WHERE session_id = $1 AND user_id = $2 AND stage = $3
             FOR UPDATE"
        );
        let locked = sqlx::query_as::<_, StageProgress>(&lock_query)
            .bind(session_id)
            .bind(user_id)
            .bind(stage.ordinal())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(locked) = locked else {
            tx.rollback().await?;
            return Ok(None);
        };

        let complete_query = format!(
            "UPDATE stage_progress SET status = $2, completed_at = NOW()
             WHERE id = $1 AND status = $3
             RETURNING {COLUMNS}"
        );
        let completed = sqlx::query_as::<_, StageProgress>(&complete_query)
            .bind(locked.id)
            .bind(StageStatus::Completed.as_str())
            .bind(StageStatus::InProgress.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(completed) = completed else {
            tx.rollback().await?;
            return Ok(None);
        };

        let mut session_resolved = false;
        let next = match stage.next() {
            Some(next_stage) => {
                let open_query = format!(
                    "INSERT INTO stage_progress (session_id, user_id, stage, status, started_at)
                     VALUES ($1, $2, $3, $4, NOW())
                     ON CONFLICT (session_id, user_id, stage)
                     DO UPDATE SET status = EXCLUDED.status, started_at = EXCLUDED.started_at
                     RETURNING {COLUMNS}"
                );
                let row = sqlx::query_as::<_, StageProgress>(&open_query)
                    .bind(session_id)
                    .bind(user_id)
                    .bind(next_stage.ordinal())
                    .bind(StageStatus::InProgress.as_str())
                    .fetch_one(&mut *tx)
                    .await?;
                Some(row)
            }
            None => {
                let finished: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM stage_progress
                     WHERE session_id = $1 AND stage = $2 AND status = $3",
                )
                .bind(session_id)
                .bind(Stage::LAST.ordinal())
                .bind(StageStatus::Completed.as_str())
                .fetch_one(&mut *tx)
                .await?;
                if finished >= 2 {
                    let result = sqlx::query(
                        "UPDATE sessions SET status = 'RESOLVED', resolved_at = NOW()
                         WHERE id = $1 AND status = 'ACTIVE'",
                    )
                    .bind(session_id)
                    .execute(&mut *tx)
                    .await?;
                    session_resolved = result.rows_affected() > 0;
                }
                None
            }
        };

        tx.commit().await?;
        Ok(Some(AdvanceOutcome {
            completed,
            next,
            session_resolved,
        }))
    }
}
