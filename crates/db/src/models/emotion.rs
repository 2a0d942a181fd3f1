//! Emotional readings and exercise completions. Both tables are append-only.

use beheard_core::types::{DbId, Timestamp};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct EmotionalReading {
    pub id: DbId,
    pub vessel_id: DbId,
    pub intensity: i32,
    pub context: Option<String>,
    pub stage: i16,
    pub created_at: Timestamp,
}

pub struct CreateEmotionalReading {
    pub vessel_id: DbId,
    pub intensity: i32,
    pub context: Option<String>,
    pub stage: i16,
}

#[derive(Debug, Clone, FromRow)]
pub struct ExerciseCompletion {
    pub id: DbId,
    pub session_id: DbId,
    pub user_id: DbId,
    pub exercise_type: String,
    pub intensity_before: Option<i32>,
    pub intensity_after: Option<i32>,
    pub completed_at: Timestamp,
}

pub struct CreateExerciseCompletion {
    pub session_id: DbId,
    pub user_id: DbId,
    pub exercise_type: String,
    pub intensity_before: Option<i32>,
    pub intensity_after: Option<i32>,
}
