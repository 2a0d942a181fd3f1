//! The five stages of the guided conversation and their per-user status.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One of the five sequential phases of the protocol.
///
/// Serialized as its ordinal (`0..=4`), which is also the value stored in
/// the `stage_progress.stage` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Compact,
    Witness,
    Empathy,
    Needs,
    Strategies,
}

impl Stage {
    pub const FIRST: Stage = Stage::Compact;
    pub const LAST: Stage = Stage::Strategies;

    pub const ALL: [Stage; 5] = [
        Stage::Compact,
        Stage::Witness,
        Stage::Empathy,
        Stage::Needs,
        Stage::Strategies,
    ];

    pub fn ordinal(self) -> i16 {
        match self {
            Stage::Compact => 0,
            Stage::Witness => 1,
            Stage::Empathy => 2,
            Stage::Needs => 3,
            Stage::Strategies => 4,
        }
    }

    pub fn from_ordinal(value: i16) -> Result<Self, CoreError> {
        match value {
            0 => Ok(Stage::Compact),
            1 => Ok(Stage::Witness),
            2 => Ok(Stage::Empathy),
            3 => Ok(Stage::Needs),
            4 => Ok(Stage::Strategies),
            other => Err(CoreError::Validation(format!(
                "Stage must be between 0 and 4, got {other}"
            ))),
        }
    }

    /// The stage after this one, or `None` for the last stage.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Compact => Some(Stage::Witness),
            Stage::Witness => Some(Stage::Empathy),
            Stage::Empathy => Some(Stage::Needs),
            Stage::Needs => Some(Stage::Strategies),
            Stage::Strategies => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Compact => "Compact",
            Stage::Witness => "Witness",
            Stage::Empathy => "Empathy",
            Stage::Needs => "Needs",
            Stage::Strategies => "Strategies",
        }
    }
}

impl Serialize for Stage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i16(self.ordinal())
    }
}

impl<'de> Deserialize<'de> for Stage {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i16::deserialize(deserializer)?;
        Stage::from_ordinal(value).map_err(serde::de::Error::custom)
    }
}

/// Progress of one user through one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl StageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StageStatus::NotStarted => "NOT_STARTED",
            StageStatus::InProgress => "IN_PROGRESS",
            StageStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "NOT_STARTED" => Ok(StageStatus::NotStarted),
            "IN_PROGRESS" => Ok(StageStatus::InProgress),
            "COMPLETED" => Ok(StageStatus::Completed),
            other => Err(CoreError::Internal(format!("Unknown stage status '{other}'"))),
        }
    }
}

/// A user's position in the protocol: their highest stage and its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePosition {
    pub stage: Stage,
    pub status: StageStatus,
}

impl StagePosition {
    /// Position of a participant with no progress rows yet.
    pub const START: StagePosition = StagePosition {
        stage: Stage::FIRST,
        status: StageStatus::NotStarted,
    };

    /// Whether the user has completed the final stage.
    pub fn is_finished(&self) -> bool {
        self.stage == Stage::LAST && self.status == StageStatus::Completed
    }
}

/// Require the caller to currently be working on `required`.
///
/// Stage-specific actions (signing the compact, drafting empathy, ...) are
/// only accepted while the user's current stage matches and is in progress.
pub fn require_stage(position: StagePosition, required: Stage) -> Result<(), CoreError> {
    if position.stage == required && position.status == StageStatus::InProgress {
        return Ok(());
    }
    if position.stage < required {
        return Err(CoreError::GateNotSatisfied(format!(
            "This action belongs to the {} stage; you are still in the {} stage",
            required.name(),
            position.stage.name()
        )));
    }
    Err(CoreError::GateNotSatisfied(format!(
        "The {} stage is already complete",
        required.name()
    )))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn ordinals_round_trip_within_bounds() {
        for stage in Stage::ALL {
            assert_eq!(Stage::from_ordinal(stage.ordinal()).unwrap(), stage);
        }
        assert!(Stage::from_ordinal(-1).is_err());
        assert!(Stage::from_ordinal(5).is_err());
    }

    #[test]
    fn next_walks_the_protocol_in_order() {
        assert_eq!(Stage::Compact.next(), Some(Stage::Witness));
        assert_eq!(Stage::Needs.next(), Some(Stage::Strategies));
        assert_eq!(Stage::Strategies.next(), None);
    }

    #[test]
    fn stage_serializes_as_number() {
        assert_eq!(serde_json::to_value(Stage::Empathy).unwrap(), 2);
        let parsed: Stage = serde_json::from_value(serde_json::json!(4)).unwrap();
        assert_eq!(parsed, Stage::Strategies);
        assert!(serde_json::from_value::<Stage>(serde_json::json!(7)).is_err());
    }

    #[test]
    fn require_stage_checks_position() {
        let witness = StagePosition {
            stage: Stage::Witness,
            status: StageStatus::InProgress,
        };
        assert!(require_stage(witness, Stage::Witness).is_ok());
        assert_matches!(
            require_stage(witness, Stage::Empathy),
            Err(CoreError::GateNotSatisfied(_))
        );
        assert_matches!(
            require_stage(witness, Stage::Compact),
            Err(CoreError::GateNotSatisfied(_))
        );

        let finished = StagePosition {
            stage: Stage::Witness,
            status: StageStatus::Completed,
        };
        assert!(require_stage(finished, Stage::Witness).is_err());
    }
}
