use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_helpers::{ErrorResponse, FieldError, JwtError, errors::messages};
use sea_orm::DbErr;
use thiserror::Error;

/// Message attached to field errors raised by the uniqueness check on email.
pub const DUPLICATE_EMAIL: &str = "There is already an account with this email";

#[derive(Debug, Error)]
pub enum UserError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    /// Authentication is missing or was refused. Answered with 401.
    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    UnprocessableEntity(String),

    /// A single form-level failure with its field details.
    #[error("{message}")]
    FormValidation {
        message: String,
        errors: Vec<FieldError>,
    },

    /// Aggregated field validation. `conflict` marks a uniqueness violation.
    #[error("Validation failed.")]
    Validation {
        errors: Vec<FieldError>,
        conflict: bool,
    },

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Token error: {0}")]
    Token(#[from] JwtError),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type UserResult<T> = Result<T, UserError>;

impl UserError {
    pub fn not_found() -> Self {
        UserError::NotFound("User not found".to_string())
    }

    pub fn invalid_credentials() -> Self {
        UserError::Unauthorized("Invalid credentials".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            UserError::BadRequest(_) => StatusCode::BAD_REQUEST,
            UserError::Unauthorized(_) | UserError::AccessDenied(_) => StatusCode::UNAUTHORIZED,
            UserError::Forbidden(_) => StatusCode::FORBIDDEN,
            UserError::NotFound(_) => StatusCode::NOT_FOUND,
            UserError::Conflict(_) => StatusCode::CONFLICT,
            UserError::UnprocessableEntity(_) | UserError::FormValidation { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            UserError::Validation { conflict: true, .. } => StatusCode::CONFLICT,
            UserError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            UserError::PasswordHash(_)
            | UserError::Token(_)
            | UserError::Database(_)
            | UserError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Infrastructure failures that may succeed when retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, UserError::Database(_) | UserError::Internal(_))
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            UserError::FormValidation { message, errors } => {
                ErrorResponse::new(status, message).with_errors(errors)
            }
            UserError::Validation { errors, .. } => {
                ErrorResponse::new(status, messages::VALIDATION_FAILED).with_errors(errors)
            }
            err if status.is_server_error() => {
                tracing::error!(error = %err, "Unhandled user domain error");
                ErrorResponse::new(status, messages::INTERNAL_ERROR)
            }
            err => ErrorResponse::new(status, err.to_string()),
        };

        body.into_response()
    }
}
