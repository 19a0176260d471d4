//! Custom extractors for Axum handlers.
//!
//! These reduce boilerplate and keep rejection bodies in the shared
//! [`ErrorResponse`](crate::errors::ErrorResponse) shape.

pub mod bearer;
pub mod json_payload;
pub mod uuid_path;
pub mod validated_json;

pub use bearer::extract_bearer_token;
pub use json_payload::JsonPayload;
pub use uuid_path::UuidPath;
pub use validated_json::{
    ValidatedJson, ValidationContext, field_errors, parse_payload, to_camel_case,
};
