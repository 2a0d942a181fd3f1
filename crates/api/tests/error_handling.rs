//! Tests for `AppError` → HTTP response mapping.
//!
//! Each variant must render the failure envelope
//! `{"success": false, "error": {"code", "message", "details"?}}` with the
//! right status. No HTTP server is needed; `IntoResponse` is called directly.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use beheard_api::error::{panic_response, AppError};
use beheard_core::error::CoreError;
use beheard_core::validation::FieldErrors;
use http_body_util::BodyExt;

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

// ---------------------------------------------------------------------------
// Test: CoreError::NotFound maps to 404 with NOT_FOUND code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn not_found_error_returns_404() {
    let err = AppError::Core(CoreError::NotFound {
        entity: "Session",
        id: 42,
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
    assert_eq!(json["error"]["message"], "Session not found");
    assert!(json["error"].get("details").is_none());
}

// ---------------------------------------------------------------------------
// Test: field errors map to 400 VALIDATION_ERROR with details
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_fields_carry_details() {
    let err = AppError::Core(CoreError::InvalidFields {
        message: "Invalid request body".into(),
        fields: FieldErrors::single("intensity", "Intensity must be between 1 and 10"),
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"]["message"], "Invalid request body");
    assert_eq!(
        json["error"]["details"]["intensity"][0],
        "Intensity must be between 1 and 10"
    );
}

#[tokio::test]
async fn plain_validation_error_returns_400() {
    let err = AppError::Core(CoreError::Validation("Invitation has expired".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"]["message"], "Invitation has expired");
}

// ---------------------------------------------------------------------------
// Test: conflicts map to 409
// ---------------------------------------------------------------------------

#[tokio::test]
async fn conflict_error_returns_409() {
    let err = AppError::Core(CoreError::Conflict("Compact already signed".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "CONFLICT");
    assert_eq!(json["error"]["message"], "Compact already signed");
}

#[tokio::test]
async fn invalid_state_returns_409_with_status_detail() {
    let err = AppError::Core(CoreError::InvalidState {
        message: "Invitation is no longer pending".into(),
        status: "DECLINED".into(),
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "CONFLICT");
    assert_eq!(json["error"]["details"]["status"], "DECLINED");
}

// ---------------------------------------------------------------------------
// Test: auth and consent errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unauthorized_error_returns_401() {
    let err = AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn forbidden_error_returns_403() {
    let err = AppError::Core(CoreError::Forbidden("Only the inviter can resend".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn consent_required_returns_403_with_own_code() {
    let err = AppError::Core(CoreError::ConsentRequired(
        "Your partner has not shared their needs yet".into(),
    ));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"]["code"], "CONSENT_REQUIRED");
}

// ---------------------------------------------------------------------------
// Test: stage flow errors map to 400
// ---------------------------------------------------------------------------

#[tokio::test]
async fn session_not_active_returns_400() {
    let err = AppError::Core(CoreError::SessionNotActive("Session is paused".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "SESSION_NOT_ACTIVE");
}

#[tokio::test]
async fn gate_not_satisfied_returns_400() {
    let err = AppError::Core(CoreError::GateNotSatisfied(
        "Sign the compact first".into(),
    ));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "GATE_NOT_SATISFIED");
}

// ---------------------------------------------------------------------------
// Test: internal errors never leak their cause
// ---------------------------------------------------------------------------

#[tokio::test]
async fn internal_error_message_is_sanitized() {
    let err = AppError::InternalError("connection refused at 10.0.0.3:5432".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"]["message"], "An internal error occurred");
}

#[tokio::test]
async fn core_internal_error_is_sanitized() {
    let err = AppError::Core(CoreError::Internal("stage row missing".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["message"], "An internal error occurred");
}

#[tokio::test]
async fn panic_renders_internal_envelope() {
    let response = panic_response(Box::new("boom"));
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"]["message"], "An internal error occurred");
}

// ---------------------------------------------------------------------------
// Test: database and routing errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn row_not_found_returns_404() {
    let err = AppError::Database(sqlx::Error::RowNotFound);

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn pool_timeout_is_internal() {
    let err = AppError::Database(sqlx::Error::PoolTimedOut);

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["message"], "An internal error occurred");
}

#[tokio::test]
async fn route_not_found_names_method_and_path() {
    let err = AppError::RouteNotFound {
        method: "DELETE".into(),
        path: "/api/v1/sessions".into(),
    };

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
    assert_eq!(json["error"]["message"], "Route DELETE /api/v1/sessions not found");
}
