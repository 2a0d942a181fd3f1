//! Repository for the `invitations` table.

use beheard_core::session::MAX_PARTICIPANTS;
use beheard_core::stage::{Stage, StageStatus};
use beheard_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::invitation::{AcceptOutcome, Invitation, InvitationWithInviter};

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str = "id, session_id, invited_by, recipient_email, recipient_phone, \
                                  recipient_name, status, expires_at, accepted_by, accepted_at, \
                                  declined_at, decline_reason, last_sent_at, created_at, updated_at";

/// Invitation columns qualified with `i`, plus the inviter's name and email.
const WITH_INVITER: &str = "i.id, i.session_id, i.invited_by, i.recipient_email, \
                            i.recipient_phone, i.recipient_name, i.status, i.expires_at, \
                            i.accepted_by, i.accepted_at, i.declined_at, i.decline_reason, \
                            i.last_sent_at, i.created_at, i.updated_at, \
                            u.name AS inviter_name, u.email AS inviter_email";

/// Provides invitation lifecycle operations.
pub struct InvitationRepo;

impl InvitationRepo {
    /// Find an invitation by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Invitation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM invitations WHERE id = $1");
        sqlx::query_as::<_, Invitation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an invitation together with who sent it.
    pub async fn find_with_inviter(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<InvitationWithInviter>, sqlx::Error> {
        let query = format!(
            "SELECT {WITH_INVITER} FROM invitations i
             JOIN users u ON u.id = i.invited_by
             WHERE i.id = $1"
        );
        sqlx::query_as::<_, InvitationWithInviter>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The most recent invitation of a session.
    pub async fn find_latest_for_session(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Option<Invitation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM invitations
             WHERE session_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, Invitation>(&query)
            .bind(session_id)
            .fetch_optional(pool)
            .await
    }

    /// Open invitations addressed to an email, newest first.
    pub async fn list_pending_for_email(
        pool: &PgPool,
        email: &str,
    ) -> Result<Vec<InvitationWithInviter>, sqlx::Error> {
        let query = format!(
            "SELECT {WITH_INVITER} FROM invitations i
             JOIN users u ON u.id = i.invited_by
             WHERE i.recipient_email = $1
               AND i.status = 'PENDING'
               AND i.expires_at > NOW()
             ORDER BY i.created_at DESC"
        );
        sqlx::query_as::<_, InvitationWithInviter>(&query)
            .bind(email)
            .fetch_all(pool)
            .await
    }

    /// Persist a lazily detected expiry. Returns `true` if the row changed.
    pub async fn mark_expired(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE invitations SET status = 'EXPIRED'
             WHERE id = $1 AND status = 'PENDING' AND expires_at <= NOW()",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Accept an invitation and bring `user_id` into the session.
    ///
    /// In one transaction: the invitation moves to `ACCEPTED`, the user gets
    /// a vessel and a stage 0 row, and the session becomes `ACTIVE`. The
    /// session row is locked first so concurrent accepts serialize.
    pub async fn accept(
        pool: &PgPool,
        id: DbId,
        session_id: DbId,
        user_id: DbId,
    ) -> Result<AcceptOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT id FROM sessions WHERE id = $1 FOR UPDATE")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        let others: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_vessels WHERE session_id = $1 AND user_id <> $2",
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        if others >= MAX_PARTICIPANTS {
            tx.rollback().await?;
            return Ok(AcceptOutcome::SessionFull);
        }

        let query = format!(
            "UPDATE invitations
             SET status = 'ACCEPTED', accepted_by = $2, accepted_at = NOW()
             WHERE id = $1 AND status = 'PENDING' AND expires_at > NOW()
             RETURNING {COLUMNS}"
        );
        let Some(invitation) = sqlx::query_as::<_, Invitation>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(AcceptOutcome::NoLongerPending);
        };

        sqlx::query(
            "INSERT INTO user_vessels (session_id, user_id) VALUES ($1, $2)
             ON CONFLICT (session_id, user_id) DO NOTHING",
        )
        .bind(session_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO stage_progress (session_id, user_id, stage, status, started_at)
             VALUES ($1, $2, $3, $4, NOW())
             ON CONFLICT (session_id, user_id, stage) DO NOTHING",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(Stage::FIRST.ordinal())
        .bind(StageStatus::InProgress.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE sessions SET status = 'ACTIVE' WHERE id = $1 AND status = 'INVITED'")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(AcceptOutcome::Accepted(invitation))
    }

    /// Decline an invitation; the waiting session is abandoned.
    ///
    /// Returns `None` if the invitation was no longer pending.
    pub async fn decline(
        pool: &PgPool,
        id: DbId,
        reason: Option<&str>,
    ) -> Result<Option<Invitation>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE invitations
             SET status = 'DECLINED', declined_at = NOW(), decline_reason = $2
             WHERE id = $1 AND status = 'PENDING' AND expires_at > NOW()
             RETURNING {COLUMNS}"
        );
        let invitation = sqlx::query_as::<_, Invitation>(&query)
            .bind(id)
            .bind(reason)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(ref invitation) = invitation {
            sqlx::query(
                "UPDATE sessions SET status = 'ABANDONED' WHERE id = $1 AND status = 'INVITED'",
            )
            .bind(invitation.session_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(invitation)
    }

    /// Reopen an invitation with a fresh expiry.
    ///
    /// Returns `None` if it had been accepted or declined meanwhile.
    pub async fn resend(
        pool: &PgPool,
        id: DbId,
        expires_at: Timestamp,
    ) -> Result<Option<Invitation>, sqlx::Error> {
        let query = format!(
            "UPDATE invitations
             SET status = 'PENDING', expires_at = $2, last_sent_at = NOW()
             WHERE id = $1 AND status IN ('PENDING', 'EXPIRED')
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Invitation>(&query)
            .bind(id)
            .bind(expires_at)
            .fetch_optional(pool)
            .await
    }
}
