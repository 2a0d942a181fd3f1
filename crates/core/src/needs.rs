//! Needs stage vocabulary.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const MAX_NEED_LEN: u64 = 200;
pub const MAX_DESCRIPTION_LEN: u64 = 500;
pub const MAX_CORRECTION_LEN: u64 = 500;

/// Universal need categories a stated need is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NeedCategory {
    Safety,
    Connection,
    Autonomy,
    Recognition,
    Meaning,
    Fairness,
}

impl NeedCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            NeedCategory::Safety => "SAFETY",
            NeedCategory::Connection => "CONNECTION",
            NeedCategory::Autonomy => "AUTONOMY",
            NeedCategory::Recognition => "RECOGNITION",
            NeedCategory::Meaning => "MEANING",
            NeedCategory::Fairness => "FAIRNESS",
        }
    }
}

/// Needs may be shared only after they have been confirmed.
pub fn ensure_can_share(confirmed: bool, already_shared: bool) -> Result<(), CoreError> {
    if already_shared {
        return Err(CoreError::Conflict("Your needs have already been shared".into()));
    }
    if !confirmed {
        return Err(CoreError::GateNotSatisfied(
            "Confirm your needs before sharing them".into(),
        ));
    }
    Ok(())
}

/// Confirmed needs can no longer be added to.
pub fn ensure_needs_editable(confirmed: bool) -> Result<(), CoreError> {
    if confirmed {
        return Err(CoreError::Conflict(
            "Your needs are already confirmed".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn categories_use_wire_names() {
        let parsed: NeedCategory = serde_json::from_str("\"RECOGNITION\"").unwrap();
        assert_eq!(parsed, NeedCategory::Recognition);
        assert_eq!(parsed.as_str(), "RECOGNITION");
        assert!(serde_json::from_str::<NeedCategory>("\"WEALTH\"").is_err());
    }

    #[test]
    fn share_requires_confirmation() {
        assert_matches!(
            ensure_can_share(false, false),
            Err(CoreError::GateNotSatisfied(_))
        );
        assert_matches!(ensure_can_share(true, true), Err(CoreError::Conflict(_)));
        assert!(ensure_can_share(true, false).is_ok());
    }

    #[test]
    fn confirmed_needs_are_locked() {
        assert!(ensure_needs_editable(false).is_ok());
        assert!(ensure_needs_editable(true).is_err());
    }
}
