//! Repository for empathy drafts, attempts and validations.

use beheard_core::types::DbId;
use sqlx::PgPool;

use crate::models::empathy::{
    CreateEmpathyValidation, EmpathyAttempt, EmpathyDraft, EmpathyValidation,
};

const DRAFT_COLUMNS: &str = "id, session_id, user_id, content, version, ready_to_share, \
                             created_at, updated_at";

const ATTEMPT_COLUMNS: &str = "id, session_id, user_id, draft_id, content, shared_at";

const VALIDATION_COLUMNS: &str = "id, attempt_id, user_id, validated, feedback, \
                                  feedback_shared, created_at";

/// Provides empathy stage storage.
pub struct EmpathyRepo;

impl EmpathyRepo {
    /// The user's draft in a session.
    pub async fn find_draft(
        pool: &PgPool,
        session_id: DbId,
        user_id: DbId,
    ) -> Result<Option<EmpathyDraft>, sqlx::Error> {
        let query = format!(
            "SELECT {DRAFT_COLUMNS} FROM empathy_drafts WHERE session_id = $1 AND user_id = $2"
        );
        sqlx::query_as::<_, EmpathyDraft>(&query)
            .bind(session_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Create the draft or overwrite it, bumping `version` on every save.
    pub async fn save_draft(
        pool: &PgPool,
        session_id: DbId,
        user_id: DbId,
        content: &str,
        ready_to_share: bool,
    ) -> Result<EmpathyDraft, sqlx::Error> {
        let query = format!(
            "INSERT INTO empathy_drafts (session_id, user_id, content, ready_to_share)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (session_id, user_id) DO UPDATE
             SET content = EXCLUDED.content,
                 ready_to_share = EXCLUDED.ready_to_share,
                 version = empathy_drafts.version + 1
             RETURNING {DRAFT_COLUMNS}"
        );
        sqlx::query_as::<_, EmpathyDraft>(&query)
            .bind(session_id)
            .bind(user_id)
            .bind(content)
            .bind(ready_to_share)
            .fetch_one(pool)
            .await
    }

    /// The user's shared attempt in a session.
    pub async fn find_attempt(
        pool: &PgPool,
        session_id: DbId,
        user_id: DbId,
    ) -> Result<Option<EmpathyAttempt>, sqlx::Error> {
        let query = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM empathy_attempts WHERE session_id = $1 AND user_id = $2"
        );
        sqlx::query_as::<_, EmpathyAttempt>(&query)
            .bind(session_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Snapshot the user's current draft into an attempt.
    ///
    /// A second share violates `uq_empathy_attempts_session_user`. Returns
    /// `None` if the user has no draft.
    pub async fn share_draft(
        pool: &PgPool,
        session_id: DbId,
        user_id: DbId,
    ) -> Result<Option<EmpathyAttempt>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO empathy_attempts (session_id, user_id, draft_id, content)
             SELECT session_id, user_id, id, content FROM empathy_drafts
             WHERE session_id = $1 AND user_id = $2
             RETURNING {ATTEMPT_COLUMNS}"
        );
        let attempt = sqlx::query_as::<_, EmpathyAttempt>(&query)
            .bind(session_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(ref attempt) = attempt {
            sqlx::query("UPDATE empathy_drafts SET ready_to_share = true WHERE id = $1")
                .bind(attempt.draft_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(attempt)
    }

    /// A validation recorded by `user_id` on an attempt.
    pub async fn find_validation(
        pool: &PgPool,
        attempt_id: DbId,
        user_id: DbId,
    ) -> Result<Option<EmpathyValidation>, sqlx::Error> {
        let query = format!(
            "SELECT {VALIDATION_COLUMNS} FROM empathy_validations
             WHERE attempt_id = $1 AND user_id = $2"
        );
        sqlx::query_as::<_, EmpathyValidation>(&query)
            .bind(attempt_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Record the partner's verdict. A second verdict violates
    /// `uq_empathy_validations_attempt_user`.
    pub async fn create_validation(
        pool: &PgPool,
        input: &CreateEmpathyValidation,
    ) -> Result<EmpathyValidation, sqlx::Error> {
        let query = format!(
            "INSERT INTO empathy_validations
                (attempt_id, user_id, validated, feedback, feedback_shared)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {VALIDATION_COLUMNS}"
        );
        sqlx::query_as::<_, EmpathyValidation>(&query)
            .bind(input.attempt_id)
            .bind(input.user_id)
            .bind(input.validated)
            .bind(&input.feedback)
            .bind(input.feedback_shared)
            .fetch_one(pool)
            .await
    }

    /// The verdict recorded on an attempt, if any.
    pub async fn validation_of_attempt(
        pool: &PgPool,
        attempt_id: DbId,
    ) -> Result<Option<EmpathyValidation>, sqlx::Error> {
        let query = format!(
            "SELECT {VALIDATION_COLUMNS} FROM empathy_validations
             WHERE attempt_id = $1
             ORDER BY created_at DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, EmpathyValidation>(&query)
            .bind(attempt_id)
            .fetch_optional(pool)
            .await
    }
}
