//! JSON extractor that only parses.

use super::validated_json::parse_payload;
use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

/// JSON body with the same payload checks as
/// [`ValidatedJson`](super::ValidatedJson) but no `Validate` pass.
///
/// Use it when the handler validates together with checks that need
/// storage, so all field errors come back in one response.
pub struct JsonPayload<T>(pub T);

impl<T, S> FromRequest<S> for JsonPayload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| e.into_response())?;

        parse_payload(&bytes)
            .map(JsonPayload)
            .map_err(|e| e.into_response())
    }
}
