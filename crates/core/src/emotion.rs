//! Emotional barometer rules: intensity bounds, intervention threshold,
//! and regulation exercises.

use serde::{Deserialize, Serialize};

pub const MIN_INTENSITY: i32 = 1;
pub const MAX_INTENSITY: i32 = 10;

/// Readings at or above this intensity suggest a regulation exercise.
pub const INTERVENTION_THRESHOLD: i32 = 8;

/// Maximum length of the free-text context attached to a reading.
pub const MAX_CONTEXT_LEN: u64 = 500;

/// Maximum number of readings returned by the history endpoint.
pub const HISTORY_LIMIT: i64 = 50;

/// Whether a reading should prompt the user to take a break.
pub fn suggests_exercise(intensity: i32) -> bool {
    intensity >= INTERVENTION_THRESHOLD
}

/// Change in intensity across an exercise (positive means calmer).
///
/// Only defined when both readings were reported.
pub fn intensity_delta(before: Option<i32>, after: Option<i32>) -> Option<i32> {
    match (before, after) {
        (Some(before), Some(after)) => Some(before - after),
        _ => None,
    }
}

/// Regulation exercises offered by the barometer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExerciseType {
    BreathingExercise,
    BodyScan,
    Grounding,
    PauseSession,
}

impl ExerciseType {
    pub fn as_str(self) -> &'static str {
        match self {
            ExerciseType::BreathingExercise => "BREATHING_EXERCISE",
            ExerciseType::BodyScan => "BODY_SCAN",
            ExerciseType::Grounding => "GROUNDING",
            ExerciseType::PauseSession => "PAUSE_SESSION",
        }
    }
}
