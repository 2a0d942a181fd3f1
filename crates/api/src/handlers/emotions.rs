//! Emotional barometer: check-ins and regulation exercises.
//!
//! Readings are private to their author and scoped to the author's vessel.

use axum::extract::State;
use axum::Json;
use beheard_core::emotion::{
    intensity_delta, suggests_exercise, ExerciseType, HISTORY_LIMIT, MAX_CONTEXT_LEN,
    MAX_INTENSITY, MIN_INTENSITY,
};
use beheard_core::stage::Stage;
use beheard_core::types::{DbId, Timestamp};
use beheard_db::models::emotion::{CreateEmotionalReading, CreateExerciseCompletion};
use beheard_db::repositories::{EmotionRepo, StageRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppResult;
use crate::extract::{ApiPath, ValidJson};
use crate::handlers::access::load_vessel;
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct RecordEmotionRequest {
    #[validate(range(
        min = MIN_INTENSITY,
        max = MAX_INTENSITY,
        message = "Intensity must be between 1 and 10"
    ))]
    pub intensity: i32,
    #[validate(length(max = MAX_CONTEXT_LEN, message = "Context too long"))]
    pub context: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompleteExerciseRequest {
    #[serde(rename = "type")]
    pub exercise_type: ExerciseType,
    #[validate(range(
        min = MIN_INTENSITY,
        max = MAX_INTENSITY,
        message = "Intensity must be between 1 and 10"
    ))]
    pub intensity_before: Option<i32>,
    #[validate(range(
        min = MIN_INTENSITY,
        max = MAX_INTENSITY,
        message = "Intensity must be between 1 and 10"
    ))]
    pub intensity_after: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ReadingSummary {
    pub id: DbId,
    pub intensity: i32,
    pub timestamp: Timestamp,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEmotionResponse {
    pub reading: ReadingSummary,
    pub suggest_exercise: bool,
}

#[derive(Debug, Serialize)]
pub struct ReadingItem {
    pub id: DbId,
    pub intensity: i32,
    pub context: Option<String>,
    pub stage: i16,
    pub timestamp: Timestamp,
}

#[derive(Debug, Serialize)]
pub struct EmotionHistoryResponse {
    pub readings: Vec<ReadingItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionView {
    pub id: DbId,
    #[serde(rename = "type")]
    pub exercise_type: String,
    pub completed_at: Timestamp,
    pub intensity_delta: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct CompleteExerciseResponse {
    pub logged: bool,
    pub completion: CompletionView,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/sessions/{id}/emotions
///
/// The reading is tagged with the caller's highest in-progress stage, or the
/// compact when nothing is in progress.
pub async fn record_emotion(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(session_id): ApiPath<DbId>,
    ValidJson(input): ValidJson<RecordEmotionRequest>,
) -> AppResult<Json<ApiResponse<RecordEmotionResponse>>> {
    let vessel = load_vessel(&state, session_id, auth.user_id).await?;
    let stage = StageRepo::highest_in_progress(&state.pool, session_id, auth.user_id)
        .await?
        .unwrap_or(Stage::FIRST.ordinal());

    let reading = EmotionRepo::create_reading(
        &state.pool,
        &CreateEmotionalReading {
            vessel_id: vessel.id,
            intensity: input.intensity,
            context: input.context,
            stage,
        },
    )
    .await?;

    let suggest_exercise = suggests_exercise(reading.intensity);
    if suggest_exercise {
        tracing::info!(
            session_id,
            user_id = auth.user_id,
            intensity = reading.intensity,
            "High intensity reading, suggesting an exercise"
        );
    }

    Ok(ApiResponse::ok(RecordEmotionResponse {
        reading: ReadingSummary {
            id: reading.id,
            intensity: reading.intensity,
            timestamp: reading.created_at,
        },
        suggest_exercise,
    }))
}

/// GET /api/v1/sessions/{id}/emotions
///
/// The caller's own readings, newest first.
pub async fn list_emotions(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(session_id): ApiPath<DbId>,
) -> AppResult<Json<ApiResponse<EmotionHistoryResponse>>> {
    let vessel = load_vessel(&state, session_id, auth.user_id).await?;
    let readings = EmotionRepo::list_for_vessel(&state.pool, vessel.id, HISTORY_LIMIT).await?;

    Ok(ApiResponse::ok(EmotionHistoryResponse {
        readings: readings
            .into_iter()
            .map(|r| ReadingItem {
                id: r.id,
                intensity: r.intensity,
                context: r.context,
                stage: r.stage,
                timestamp: r.created_at,
            })
            .collect(),
    }))
}

/// POST /api/v1/sessions/{id}/exercises/complete
pub async fn complete_exercise(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(session_id): ApiPath<DbId>,
    ValidJson(input): ValidJson<CompleteExerciseRequest>,
) -> AppResult<Json<ApiResponse<CompleteExerciseResponse>>> {
    load_vessel(&state, session_id, auth.user_id).await?;

    let completion = EmotionRepo::create_completion(
        &state.pool,
        &CreateExerciseCompletion {
            session_id,
            user_id: auth.user_id,
            exercise_type: input.exercise_type.as_str().to_string(),
            intensity_before: input.intensity_before,
            intensity_after: input.intensity_after,
        },
    )
    .await?;
    tracing::info!(
        session_id,
        user_id = auth.user_id,
        exercise = input.exercise_type.as_str(),
        "Exercise completed"
    );

    Ok(ApiResponse::ok(CompleteExerciseResponse {
        logged: true,
        completion: CompletionView {
            id: completion.id,
            exercise_type: completion.exercise_type,
            completed_at: completion.completed_at,
            intensity_delta: intensity_delta(
                completion.intensity_before,
                completion.intensity_after,
            ),
        },
    }))
}
