pub mod handlers;
pub mod messages;
pub mod responses;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Field-level validation failure.
///
/// `property` uses the camelCase name of the offending field, `context` names
/// the entity the check ran against (e.g. "User").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    pub property: String,
    pub errors: Vec<String>,
    pub context: String,
}

impl FieldError {
    pub fn new(
        property: impl Into<String>,
        message: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            property: property.into(),
            errors: vec![message.into()],
            context: context.into(),
        }
    }
}

/// Body returned for every error response.
///
/// ```json
/// {
///   "message": "Validation failed.",
///   "code": 422,
///   "errors": [{"property": "email", "errors": ["This value should not be blank."], "context": "User"}]
/// }
/// ```
///
/// `code` repeats the HTTP status so clients that only see the body can branch on it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: status.as_u16(),
            errors: None,
        }
    }

    pub fn with_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Status encoded in `code`, falling back to 500 for anything unknown.
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Errors raised by the shared extractors and middleware before a request
/// reaches domain code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("Internal Server Error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match self {
            AppError::BadRequest(msg) => ErrorResponse::new(StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => ErrorResponse::new(StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => ErrorResponse::new(StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => ErrorResponse::new(StatusCode::NOT_FOUND, msg),
            AppError::Validation { message, errors } => {
                ErrorResponse::new(StatusCode::UNPROCESSABLE_ENTITY, message).with_errors(errors)
            }
            AppError::InternalServerError(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                ErrorResponse::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    messages::INTERNAL_ERROR,
                )
            }
        };

        tracing::info!(status = body.code, message = %body.message, "Request rejected");
        body.into_response()
    }
}
