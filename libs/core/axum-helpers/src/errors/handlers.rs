use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::{ErrorResponse, messages};

/// Fallback for unmatched routes.
pub async fn not_found() -> Response {
    ErrorResponse::new(StatusCode::NOT_FOUND, messages::NOT_FOUND_ROUTE).into_response()
}

/// Fallback for routes matched with the wrong method.
pub async fn method_not_allowed() -> Response {
    ErrorResponse::new(StatusCode::METHOD_NOT_ALLOWED, messages::METHOD_NOT_ALLOWED)
        .into_response()
}
