use std::any::Any;
use std::sync::OnceLock;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use beheard_core::error::CoreError;
use serde_json::{json, Value};

const INTERNAL_MESSAGE: &str = "An internal error occurred";

static EXPOSE_INTERNAL_DETAILS: OnceLock<bool> = OnceLock::new();

/// Put the real cause of 500 responses into the message (development only).
///
/// Takes effect once; later calls are ignored.
pub fn expose_internal_details(enabled: bool) {
    let _ = EXPOSE_INTERNAL_DETAILS.set(enabled);
}

fn internal_message(detail: &str) -> String {
    if EXPOSE_INTERNAL_DETAILS.get().copied().unwrap_or(false) {
        detail.to_string()
    } else {
        INTERNAL_MESSAGE.to_string()
    }
}

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Every variant renders as the failure envelope
/// `{"success": false, "error": {"code", "message", "details"?}}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No route matched the request.
    #[error("Route {method} {path} not found")]
    RouteNotFound { method: String, path: String },

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

struct ErrorParts {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Option<Value>,
}

impl ErrorParts {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    fn internal(detail: &str) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            internal_message(detail),
        )
    }

    fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    fn into_response(self) -> Response {
        let mut error = json!({
            "code": self.code,
            "message": self.message,
        });
        if let Some(details) = self.details {
            error["details"] = details;
        }
        let body = json!({
            "success": false,
            "error": error,
        });
        (self.status, axum::Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let parts = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::RouteNotFound { .. } => {
                ErrorParts::new(StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string())
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ErrorParts::internal(msg)
            }
        };
        parts.into_response()
    }
}

fn classify_core_error(core: &CoreError) -> ErrorParts {
    let code = core.code();
    match core {
        CoreError::NotFound { entity, .. } => {
            ErrorParts::new(StatusCode::NOT_FOUND, code, format!("{entity} not found"))
        }
        CoreError::Validation(msg) => ErrorParts::new(StatusCode::BAD_REQUEST, code, msg.clone()),
        CoreError::InvalidFields { message, fields } => {
            ErrorParts::new(StatusCode::BAD_REQUEST, code, message.clone())
                .with_details(json!(fields))
        }
        CoreError::Conflict(msg) => ErrorParts::new(StatusCode::CONFLICT, code, msg.clone()),
        CoreError::InvalidState { message, status } => {
            ErrorParts::new(StatusCode::CONFLICT, code, message.clone())
                .with_details(json!({ "status": status }))
        }
        CoreError::Unauthorized(msg) => {
            ErrorParts::new(StatusCode::UNAUTHORIZED, code, msg.clone())
        }
        CoreError::Forbidden(msg) | CoreError::ConsentRequired(msg) => {
            ErrorParts::new(StatusCode::FORBIDDEN, code, msg.clone())
        }
        CoreError::SessionNotActive(msg) | CoreError::GateNotSatisfied(msg) => {
            ErrorParts::new(StatusCode::BAD_REQUEST, code, msg.clone())
        }
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            ErrorParts::internal(msg)
        }
    }
}

/// Classify a sqlx error into the envelope parts.
///
/// - `RowNotFound` maps to 404.
/// - Unique violations on a `uq_` index map to 409.
/// - Everything else maps to 500.
fn classify_sqlx_error(err: &sqlx::Error) -> ErrorParts {
    match err {
        sqlx::Error::RowNotFound => {
            ErrorParts::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Resource not found")
        }
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique_violation.
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return ErrorParts::new(
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            ErrorParts::internal(&db_err.to_string())
        }
        other => {
            tracing::error!(error = %other, "Database error");
            ErrorParts::internal(&other.to_string())
        }
    }
}

/// Response for a handler that panicked, used by `CatchPanicLayer::custom`.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "Unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");
    ErrorParts::internal(&detail).into_response()
}
