//! Request validation helpers.
//!
//! Request DTOs derive [`validator::Validate`]; [`validate_request`] runs the
//! derived rules and converts any failures into a [`CoreError::InvalidFields`]
//! whose [`FieldErrors`] become the `details` object of the API error
//! envelope (`{"intensity": ["Intensity must be between 1 and 10"]}`).

use std::collections::BTreeMap;

use serde::Serialize;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::CoreError;

/// Top-level message attached to every field-level validation failure.
pub const INVALID_REQUEST_BODY: &str = "Invalid request body";

/// Field path → list of human-readable messages.
///
/// Nested paths are dot-joined (`adjustments.0.correction`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Build a details map holding a single message for one field.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Convert into an error, or `Ok(())` if nothing was recorded.
    pub fn into_result(self) -> Result<(), CoreError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CoreError::InvalidFields {
                message: INVALID_REQUEST_BODY.to_string(),
                fields: self,
            })
        }
    }
}

impl From<&ValidationErrors> for FieldErrors {
    fn from(errors: &ValidationErrors) -> Self {
        let mut out = FieldErrors::default();
        flatten(errors, "", &mut out);
        out
    }
}

fn flatten(errors: &ValidationErrors, prefix: &str, out: &mut FieldErrors) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for err in list {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", err.code));
                    out.push(path.clone(), message);
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten(inner, &format!("{path}.{index}"), out);
                }
            }
        }
    }
}

/// Run the derived validation rules of a request DTO.
pub fn validate_request<T: Validate>(input: &T) -> Result<(), CoreError> {
    input.validate().map_err(|errors| CoreError::InvalidFields {
        message: INVALID_REQUEST_BODY.to_string(),
        fields: FieldErrors::from(&errors),
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use validator::Validate;

    use super::*;

    #[derive(Validate)]
    struct Sample {
        #[validate(range(min = 1, max = 10, message = "Intensity must be between 1 and 10"))]
        intensity: i32,
        #[validate(length(max = 5))]
        context: Option<String>,
    }

    #[test]
    fn valid_input_passes() {
        let input = Sample {
            intensity: 5,
            context: None,
        };
        assert!(validate_request(&input).is_ok());
    }

    #[test]
    fn failures_are_keyed_by_field() {
        let input = Sample {
            intensity: 11,
            context: Some("too long".into()),
        };
        let err = validate_request(&input).unwrap_err();
        assert_matches!(err, CoreError::InvalidFields { ref fields, .. } => {
            assert_eq!(
                fields.get("intensity"),
                Some(&["Intensity must be between 1 and 10".to_string()][..])
            );
            let context = fields.get("context").expect("context error recorded");
            assert!(context[0].contains("length"));
        });
    }

    #[test]
    fn single_field_error_converts_into_error() {
        let err = FieldErrors::single("agreed", "You must agree").into_result();
        assert_matches!(err, Err(CoreError::InvalidFields { .. }));
        assert!(FieldErrors::default().into_result().is_ok());
    }
}
