//! Extractors whose rejections use the API error envelope.
//!
//! Axum's own `Json`, `Path` and `Query` reject with plain-text bodies; these
//! wrappers turn every rejection into a `VALIDATION_ERROR` with the cause
//! attached as a field detail.

use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use beheard_core::error::CoreError;
use beheard_core::validation::{validate_request, FieldErrors, INVALID_REQUEST_BODY};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::AppError;

fn rejection(field: &str, message: String) -> AppError {
    AppError::Core(CoreError::InvalidFields {
        message: INVALID_REQUEST_BODY.to_string(),
        fields: FieldErrors::single(field, message),
    })
}

/// JSON body without schema rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| rejection("body", e.body_text()))?;
        Ok(Self(value))
    }
}

/// JSON body checked against its `validator` rules before the handler runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let ApiJson(value) = ApiJson::<T>::from_request(req, state).await?;
        validate_request(&value)?;
        Ok(Self(value))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| rejection("path", e.body_text()))?;
        Ok(Self(value))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| rejection("query", e.body_text()))?;
        Ok(Self(value))
    }
}

/// Parse an optional JSON body: an empty body yields `T::default()`.
pub fn optional_json<T>(body: &[u8]) -> Result<T, AppError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        rejection(
            "body",
            format!("Failed to parse the request body as JSON: {e}"),
        )
    })
}
