//! Translation of service errors into HTTP responses

use crate::intake::{IntakeError, ValidationErrors, SLUG_TAKEN_MESSAGE};
use crate::moderation::{ModerationError, Unauthorized};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt::Display;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Profile not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    /// Generic failure; the cause has already been logged
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    /// Log `cause` and hide it behind a generic message
    pub fn internal(message: &'static str, cause: impl Display) -> Self {
        error!("{}: {}", message, cause);
        ApiError::Internal(message)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map a moderation failure, using `context` as the generic message
    pub fn from_moderation(err: ModerationError, context: &'static str) -> Self {
        match err {
            ModerationError::NotFound => ApiError::NotFound,
            ModerationError::AlreadyReviewed { .. } => ApiError::Conflict(err.to_string()),
            ModerationError::Store(e) => ApiError::internal(context, e),
        }
    }
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::Validation(errors) => ApiError::Validation(errors),
            IntakeError::SlugTaken => ApiError::Conflict(SLUG_TAKEN_MESSAGE.to_string()),
            IntakeError::SlugCheck(e) | IntakeError::Store(e) => {
                ApiError::internal("Failed to create profile", e)
            }
        }
    }
}

impl From<Unauthorized> for ApiError {
    fn from(_: Unauthorized) -> Self {
        ApiError::Unauthorized
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Validation(errors) => json!({
                "error": errors.to_string(),
                "fields": errors.fields,
            }),
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
