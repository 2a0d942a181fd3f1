use crate::types::DbId;
use crate::validation::FieldErrors;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Request schema violations, keyed by field path.
    #[error("Validation failed: {message}")]
    InvalidFields { message: String, fields: FieldErrors },

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Conflict caused by an entity being in a state that forbids the action.
    #[error("Conflict: {message} (status {status})")]
    InvalidState { message: String, status: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Consent required: {0}")]
    ConsentRequired(String),

    #[error("Session not active: {0}")]
    SessionNotActive(String),

    #[error("Gate not satisfied: {0}")]
    GateNotSatisfied(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable machine-readable code surfaced to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::Validation(_) | CoreError::InvalidFields { .. } => "VALIDATION_ERROR",
            CoreError::Conflict(_) | CoreError::InvalidState { .. } => "CONFLICT",
            CoreError::Unauthorized(_) => "UNAUTHORIZED",
            CoreError::Forbidden(_) => "FORBIDDEN",
            CoreError::ConsentRequired(_) => "CONSENT_REQUIRED",
            CoreError::SessionNotActive(_) => "SESSION_NOT_ACTIVE",
            CoreError::GateNotSatisfied(_) => "GATE_NOT_SATISFIED",
            CoreError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_cover_the_api_taxonomy() {
        assert_eq!(CoreError::NotFound { entity: "Session", id: 1 }.code(), "NOT_FOUND");
        assert_eq!(CoreError::Validation("x".into()).code(), "VALIDATION_ERROR");
        assert_eq!(
            CoreError::InvalidFields {
                message: "x".into(),
                fields: FieldErrors::default(),
            }
            .code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(CoreError::Conflict("x".into()).code(), "CONFLICT");
        assert_eq!(
            CoreError::InvalidState {
                message: "x".into(),
                status: "EXPIRED".into(),
            }
            .code(),
            "CONFLICT"
        );
        assert_eq!(CoreError::Unauthorized("x".into()).code(), "UNAUTHORIZED");
        assert_eq!(CoreError::Forbidden("x".into()).code(), "FORBIDDEN");
        assert_eq!(CoreError::ConsentRequired("x".into()).code(), "CONSENT_REQUIRED");
        assert_eq!(CoreError::SessionNotActive("x".into()).code(), "SESSION_NOT_ACTIVE");
        assert_eq!(CoreError::GateNotSatisfied("x".into()).code(), "GATE_NOT_SATISFIED");
        assert_eq!(CoreError::Internal("x".into()).code(), "INTERNAL_ERROR");
    }
}
