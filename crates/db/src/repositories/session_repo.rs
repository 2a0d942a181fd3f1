//! Repository for the `sessions` and `user_vessels` tables.

use beheard_core::session::SessionStatus;
use beheard_core::stage::{Stage, StageStatus};
use beheard_core::types::DbId;
use sqlx::PgPool;

use crate::models::invitation::Invitation;
use crate::models::session::{CreateSession, Participant, Session, Vessel};
use crate::repositories::invitation_repo;

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str = "id, created_by, status, paused_at, resolved_at, \
                                  created_at, updated_at";

/// Same columns qualified with the `s` alias for joined queries.
const S_COLUMNS: &str = "s.id, s.created_by, s.status, s.paused_at, s.resolved_at, \
                         s.created_at, s.updated_at";

const VESSEL_COLUMNS: &str = "id, session_id, user_id, created_at";

/// Provides session and participant operations.
pub struct SessionRepo;

impl SessionRepo {
    /// Create a session in `INVITED` state with everything the creator needs.
    ///
    /// In one transaction: the session row, the creator's vessel, the
    /// creator's stage 0 row (`IN_PROGRESS`) and the pending invitation.
    pub async fn create_with_invitation(
        pool: &PgPool,
        input: &CreateSession,
    ) -> Result<(Session, Invitation), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let session_query = format!(
            "INSERT INTO sessions (created_by, status) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        let session = sqlx::query_as::<_, Session>(&session_query)
            .bind(input.created_by)
            .bind(SessionStatus::Invited.as_str())
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO user_vessels (session_id, user_id) VALUES ($1, $2)")
            .bind(session.id)
            .bind(input.created_by)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO stage_progress (session_id, user_id, stage, status, started_at)
             VALUES ($1, $2, $3, $4, NOW())",
        )
        .bind(session.id)
        .bind(input.created_by)
        .bind(Stage::FIRST.ordinal())
        .bind(StageStatus::InProgress.as_str())
        .execute(&mut *tx)
        .await?;

        let invitation_query = format!(
            "INSERT INTO invitations
                (session_id, invited_by, recipient_email, recipient_phone, recipient_name, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            invitation_repo::COLUMNS
        );
        let invitation = sqlx::query_as::<_, Invitation>(&invitation_query)
            .bind(session.id)
            .bind(input.created_by)
            .bind(&input.recipient_email)
            .bind(&input.recipient_phone)
            .bind(&input.recipient_name)
            .bind(input.invitation_expires_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((session, invitation))
    }

    /// Find a session by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Session>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE id = $1");
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a session the user participates in.
    ///
    /// Returns `None` both for unknown sessions and for sessions the user is
    /// not part of.
    pub async fn find_for_participant(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "SELECT {S_COLUMNS} FROM sessions s
             JOIN user_vessels v ON v.session_id = s.id
             WHERE s.id = $1 AND v.user_id = $2"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// List the user's sessions, newest first.
    ///
    /// `before` is an exclusive id cursor. Callers ask for one more row than
    /// they return to detect a further page.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        status: Option<SessionStatus>,
        before: Option<DbId>,
        limit: i64,
    ) -> Result<Vec<Session>, sqlx::Error> {
        let query = format!(
            "SELECT {S_COLUMNS} FROM sessions s
             JOIN user_vessels v ON v.session_id = s.id
             WHERE v.user_id = $1
               AND ($2::text IS NULL OR s.status = $2)
               AND ($3::bigint IS NULL OR s.id < $3)
             ORDER BY s.id DESC
             LIMIT $4"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(user_id)
            .bind(status.map(SessionStatus::as_str))
            .bind(before)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Count the user's sessions that are not resolved or abandoned.
    pub async fn count_open_for_user(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sessions s
             JOIN user_vessels v ON v.session_id = s.id
             WHERE v.user_id = $1 AND s.status IN ('INVITED', 'ACTIVE', 'PAUSED')",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Ids of the open sessions the user participates in.
    pub async fn open_session_ids(pool: &PgPool, user_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT s.id FROM sessions s
             JOIN user_vessels v ON v.session_id = s.id
             WHERE v.user_id = $1 AND s.status IN ('INVITED', 'ACTIVE', 'PAUSED')
             ORDER BY s.id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Move an `ACTIVE` session to `PAUSED`. `None` if it was not active.
    pub async fn pause(pool: &PgPool, id: DbId) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "UPDATE sessions SET status = 'PAUSED', paused_at = NOW()
             WHERE id = $1 AND status = 'ACTIVE'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Move a `PAUSED` session back to `ACTIVE`. `None` if it was not paused.
    pub async fn resume(pool: &PgPool, id: DbId) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "UPDATE sessions SET status = 'ACTIVE', paused_at = NULL
             WHERE id = $1 AND status = 'PAUSED'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Vessels
    // -----------------------------------------------------------------------

    /// The user's vessel in a session.
    pub async fn find_vessel(
        pool: &PgPool,
        session_id: DbId,
        user_id: DbId,
    ) -> Result<Option<Vessel>, sqlx::Error> {
        let query = format!(
            "SELECT {VESSEL_COLUMNS} FROM user_vessels WHERE session_id = $1 AND user_id = $2"
        );
        sqlx::query_as::<_, Vessel>(&query)
            .bind(session_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Participants of a session in join order.
    pub async fn participants(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<Participant>, sqlx::Error> {
        sqlx::query_as::<_, Participant>(
            "SELECT v.id AS vessel_id, v.user_id, u.email, u.name, v.created_at AS joined_at
             FROM user_vessels v
             JOIN users u ON u.id = v.user_id
             WHERE v.session_id = $1
             ORDER BY v.created_at, v.id",
        )
        .bind(session_id)
        .fetch_all(pool)
        .await
    }

    /// The other participant of a session, if they have joined.
    pub async fn partner_id(
        pool: &PgPool,
        session_id: DbId,
        user_id: DbId,
    ) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT user_id FROM user_vessels WHERE session_id = $1 AND user_id <> $2 LIMIT 1",
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }
}
