//! Invitation lifecycle rules.
//!
//! An invitation starts `PENDING` and moves once to `ACCEPTED`, `DECLINED`
//! or `EXPIRED`. Expiry is lazy: a pending invitation whose `expires_at`
//! has passed is treated as expired the next time it is read or acted on.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// How long an invitation stays open after it is sent or resent.
pub const INVITATION_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

impl InvitationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvitationStatus::Pending => "PENDING",
            InvitationStatus::Accepted => "ACCEPTED",
            InvitationStatus::Declined => "DECLINED",
            InvitationStatus::Expired => "EXPIRED",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "PENDING" => Ok(InvitationStatus::Pending),
            "ACCEPTED" => Ok(InvitationStatus::Accepted),
            "DECLINED" => Ok(InvitationStatus::Declined),
            "EXPIRED" => Ok(InvitationStatus::Expired),
            other => Err(CoreError::Internal(format!(
                "Unknown invitation status '{other}'"
            ))),
        }
    }
}

/// Expiry timestamp for an invitation sent at `sent_at`.
pub fn expiry_from(sent_at: Timestamp) -> Timestamp {
    sent_at + Duration::days(INVITATION_TTL_DAYS)
}

/// The status a stored invitation really has at `now`.
pub fn effective_status(
    stored: InvitationStatus,
    expires_at: Timestamp,
    now: Timestamp,
) -> InvitationStatus {
    if stored == InvitationStatus::Pending && expires_at <= now {
        InvitationStatus::Expired
    } else {
        stored
    }
}

/// Check that `user_id` may accept or decline the invitation.
///
/// The inviter cannot respond to their own invitation. Any status other
/// than pending is a conflict, with the status attached so clients can tell
/// "already accepted" from "expired".
pub fn ensure_can_respond(
    status: InvitationStatus,
    invited_by: DbId,
    user_id: DbId,
) -> Result<(), CoreError> {
    if invited_by == user_id {
        return Err(CoreError::Forbidden(
            "You cannot respond to your own invitation".into(),
        ));
    }
    ensure_pending(status)
}

/// Check that `user_id` may resend the invitation.
pub fn ensure_can_resend(
    status: InvitationStatus,
    invited_by: DbId,
    user_id: DbId,
) -> Result<(), CoreError> {
    if invited_by != user_id {
        return Err(CoreError::Forbidden(
            "Only the inviter can resend an invitation".into(),
        ));
    }
    match status {
        // Resending revives an invitation that lapsed without an answer.
        InvitationStatus::Pending | InvitationStatus::Expired => Ok(()),
        other => ensure_pending(other),
    }
}

/// Only a pending invitation can be answered.
pub fn ensure_pending(status: InvitationStatus) -> Result<(), CoreError> {
    let message = match status {
        InvitationStatus::Pending => return Ok(()),
        InvitationStatus::Accepted => "Invitation has already been accepted",
        InvitationStatus::Declined => "Invitation has already been declined",
        InvitationStatus::Expired => "Invitation has expired",
    };
    Err(CoreError::InvalidState {
        message: message.into(),
        status: status.as_str().into(),
    })
}

/// Validate the recipient contact of a new invitation.
///
/// Exactly one of email or phone is used as the contact; email wins when
/// both are given.
pub fn recipient_contact(
    email: Option<&str>,
    phone: Option<&str>,
) -> Result<String, CoreError> {
    let email = email.map(str::trim).filter(|e| !e.is_empty());
    let phone = phone.map(str::trim).filter(|p| !p.is_empty());
    match (email, phone) {
        (Some(email), _) => Ok(email.to_lowercase()),
        (None, Some(phone)) => Ok(phone.to_string()),
        (None, None) => Err(CoreError::InvalidFields {
            message: crate::validation::INVALID_REQUEST_BODY.into(),
            fields: crate::validation::FieldErrors::single(
                "inviteEmail",
                "Either inviteEmail or invitePhone is required",
            ),
        }),
    }
}
