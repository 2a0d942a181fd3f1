//! Empathy stage rules: drafts, shared attempts and partner validation.

use crate::error::CoreError;

pub const MIN_CONTENT_LEN: u64 = 1;
pub const MAX_CONTENT_LEN: u64 = 2000;

/// Maximum length of free-text feedback (feel-heard, empathy validation).
pub const MAX_FEEDBACK_LEN: u64 = 500;

/// Once an attempt has been shared the draft is frozen.
pub fn ensure_draft_editable(already_shared: bool) -> Result<(), CoreError> {
    if already_shared {
        return Err(CoreError::Conflict(
            "Your empathy attempt has already been shared and can no longer be edited".into(),
        ));
    }
    Ok(())
}

/// Preconditions for consenting to share the draft.
pub fn ensure_can_share(has_draft: bool, already_shared: bool) -> Result<(), CoreError> {
    if already_shared {
        return Err(CoreError::Conflict(
            "Your empathy attempt has already been shared".into(),
        ));
    }
    if !has_draft {
        return Err(CoreError::Validation(
            "Save an empathy draft before sharing it".into(),
        ));
    }
    Ok(())
}

/// Feedback text becomes visible to the attempt's author only with consent.
pub fn shared_feedback(feedback: Option<String>, consent_to_share: bool) -> Option<String> {
    if consent_to_share {
        feedback
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn shared_draft_is_frozen() {
        assert!(ensure_draft_editable(false).is_ok());
        assert_matches!(ensure_draft_editable(true), Err(CoreError::Conflict(_)));
    }

    #[test]
    fn sharing_requires_a_draft() {
        assert_matches!(ensure_can_share(false, false), Err(CoreError::Validation(_)));
        assert_matches!(ensure_can_share(true, true), Err(CoreError::Conflict(_)));
        assert!(ensure_can_share(true, false).is_ok());
    }

    #[test]
    fn feedback_hidden_without_consent() {
        assert_eq!(shared_feedback(Some("close".into()), false), None);
        assert_eq!(
            shared_feedback(Some("close".into()), true).as_deref(),
            Some("close")
        );
    }
}
