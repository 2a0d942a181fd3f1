//! Repository for `emotional_readings` and `exercise_completions`.

use beheard_core::types::DbId;
use sqlx::PgPool;

use crate::models::emotion::{
    CreateEmotionalReading, CreateExerciseCompletion, EmotionalReading, ExerciseCompletion,
};

const READING_COLUMNS: &str = "id, vessel_id, intensity, context, stage, created_at";

const COMPLETION_COLUMNS: &str = "id, session_id, user_id, exercise_type, intensity_before, \
                                  intensity_after, completed_at";

/// Append-only storage for barometer readings and exercise logs.
pub struct EmotionRepo;

impl EmotionRepo {
    /// Record a reading on a vessel.
    pub async fn create_reading(
        pool: &PgPool,
        input: &CreateEmotionalReading,
    ) -> Result<EmotionalReading, sqlx::Error> {
        let query = format!(
            "INSERT INTO emotional_readings (vessel_id, intensity, context, stage)
             VALUES ($1, $2, $3, $4)
             RETURNING {READING_COLUMNS}"
        );
        sqlx::query_as::<_, EmotionalReading>(&query)
            .bind(input.vessel_id)
            .bind(input.intensity)
            .bind(&input.context)
            .bind(input.stage)
            .fetch_one(pool)
            .await
    }

    /// A vessel's readings, newest first.
    pub async fn list_for_vessel(
        pool: &PgPool,
        vessel_id: DbId,
        limit: i64,
    ) -> Result<Vec<EmotionalReading>, sqlx::Error> {
        let query = format!(
            "SELECT {READING_COLUMNS} FROM emotional_readings
             WHERE vessel_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2"
        );
        sqlx::query_as::<_, EmotionalReading>(&query)
            .bind(vessel_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Log a completed regulation exercise.
    pub async fn create_completion(
        pool: &PgPool,
        input: &CreateExerciseCompletion,
    ) -> Result<ExerciseCompletion, sqlx::Error> {
        let query = format!(
            "INSERT INTO exercise_completions
                (session_id, user_id, exercise_type, intensity_before, intensity_after)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COMPLETION_COLUMNS}"
        );
        sqlx::query_as::<_, ExerciseCompletion>(&query)
            .bind(input.session_id)
            .bind(input.user_id)
            .bind(&input.exercise_type)
            .bind(input.intensity_before)
            .bind(input.intensity_after)
            .fetch_one(pool)
            .await
    }
}
