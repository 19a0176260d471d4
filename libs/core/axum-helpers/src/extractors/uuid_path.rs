//! UUID path parameter extractor.

use crate::errors::AppError;
use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

/// Extractor for a single UUID path parameter.
///
/// A value that is not a UUID cannot name any stored entity, so the rejection
/// is a 404 rather than a 400.
///
/// ```ignore
/// async fn show(UuidPath(id): UuidPath) -> String {
///     id.to_string()
/// }
///
/// let app = Router::new().route("/admin/user/{id}", get(show));
/// ```
pub struct UuidPath(pub Uuid);

impl<S> FromRequestParts<S> for UuidPath
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| e.into_response())?;

        Uuid::parse_str(&raw)
            .map(UuidPath)
            .map_err(|_| AppError::NotFound(format!("Invalid identifier {raw}")).into_response())
    }
}
