//! Strategies stage rules: proposals, rankings and agreements.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;
use crate::validation::FieldErrors;

pub const MIN_DESCRIPTION_LEN: u64 = 10;
pub const MAX_DESCRIPTION_LEN: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgreementStatus {
    Proposed,
    Agreed,
    Declined,
}

impl AgreementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgreementStatus::Proposed => "PROPOSED",
            AgreementStatus::Agreed => "AGREED",
            AgreementStatus::Declined => "DECLINED",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "PROPOSED" => Ok(AgreementStatus::Proposed),
            "AGREED" => Ok(AgreementStatus::Agreed),
            "DECLINED" => Ok(AgreementStatus::Declined),
            other => Err(CoreError::Internal(format!("Unknown agreement status '{other}'"))),
        }
    }
}

/// Check a submitted ranking against the session's strategies.
///
/// Every ranked id must name a strategy of the session and appear once.
pub fn validate_ranking(ranked_ids: &[DbId], known: &[DbId]) -> Result<(), CoreError> {
    let known: HashSet<DbId> = known.iter().copied().collect();
    let mut seen = HashSet::with_capacity(ranked_ids.len());
    let mut errors = FieldErrors::default();
    for id in ranked_ids {
        if !known.contains(id) {
            errors.push("rankedIds", format!("Unknown strategy id {id}"));
        } else if !seen.insert(*id) {
            errors.push("rankedIds", format!("Strategy id {id} is ranked more than once"));
        }
    }
    errors.into_result()
}

/// Only the proposer's partner decides on a proposed agreement, and only once.
pub fn ensure_can_confirm(
    status: AgreementStatus,
    proposed_by: DbId,
    user_id: DbId,
) -> Result<(), CoreError> {
    if proposed_by == user_id {
        return Err(CoreError::Forbidden(
            "Your partner must confirm the agreement you proposed".into(),
        ));
    }
    match status {
        AgreementStatus::Proposed => Ok(()),
        other => Err(CoreError::InvalidState {
            message: "Agreement has already been decided".into(),
            status: other.as_str().into(),
        }),
    }
}

/// Status an agreement moves to after the partner's answer.
pub fn decided_status(confirmed: bool) -> AgreementStatus {
    if confirmed {
        AgreementStatus::Agreed
    } else {
        AgreementStatus::Declined
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn ranking_must_reference_known_strategies_once() {
        assert!(validate_ranking(&[3, 1, 2], &[1, 2, 3]).is_ok());

        let err = validate_ranking(&[1, 9], &[1, 2]).unwrap_err();
        assert_matches!(err, CoreError::InvalidFields { ref fields, .. } => {
            assert_eq!(fields.get("rankedIds").unwrap().len(), 1);
        });

        assert!(validate_ranking(&[1, 1], &[1, 2]).is_err());
    }

    #[test]
    fn proposer_cannot_confirm_own_agreement() {
        assert_matches!(
            ensure_can_confirm(AgreementStatus::Proposed, 4, 4),
            Err(CoreError::Forbidden(_))
        );
        assert!(ensure_can_confirm(AgreementStatus::Proposed, 4, 5).is_ok());
    }

    #[test]
    fn decided_agreement_is_a_conflict() {
        let err = ensure_can_confirm(AgreementStatus::Agreed, 4, 5).unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
        assert_eq!(decided_status(false), AgreementStatus::Declined);
    }
}
