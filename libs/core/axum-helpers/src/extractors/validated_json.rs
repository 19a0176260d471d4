//! JSON extractor with payload checks and validation through the validator crate.

use crate::errors::{AppError, FieldError, messages};
use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::{Validate, ValidationErrors};

/// Names the entity a request body is validated against.
///
/// The value ends up in the `context` of every [`FieldError`].
pub trait ValidationContext {
    const CONTEXT: &'static str = "Global";
}

/// JSON extractor with automatic validation.
///
/// Rejections:
/// - empty body, `null`, `{}` or malformed JSON: 400 "Request content is empty or not valid"
/// - a required key missing from the payload: 400 "Mandatory key {key} is missing payload"
/// - `Validate` failures: 422 "Validation failed." with one [`FieldError`] per field
///
/// # Example
/// ```ignore
/// use axum_helpers::extractors::{ValidatedJson, ValidationContext};
/// use serde::Deserialize;
/// use validator::Validate;
///
/// #[derive(Deserialize, Validate)]
/// struct LoginRequest {
///     #[validate(email(message = "This value is not a valid email address."))]
///     email: String,
///     password: String,
/// }
///
/// impl ValidationContext for LoginRequest {
///     const CONTEXT: &'static str = "User";
/// }
///
/// async fn login(ValidatedJson(payload): ValidatedJson<LoginRequest>) -> String {
///     payload.email
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + ValidationContext,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| e.into_response())?;

        let data: T = parse_payload(&bytes).map_err(|e| e.into_response())?;

        data.validate().map_err(|e| {
            AppError::Validation {
                message: messages::VALIDATION_FAILED.to_string(),
                errors: field_errors(&e, T::CONTEXT),
            }
            .into_response()
        })?;

        Ok(ValidatedJson(data))
    }
}

/// Deserialize a JSON payload, rejecting empty documents and reporting the
/// first missing key by its camelCase name.
pub fn parse_payload<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, AppError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|_| AppError::BadRequest(messages::EMPTY_PAYLOAD.to_string()))?;

    let is_empty = match &value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    };
    if is_empty {
        return Err(AppError::BadRequest(messages::EMPTY_PAYLOAD.to_string()));
    }

    serde_json::from_value(value).map_err(|e| {
        let text = e.to_string();
        match missing_field(&text) {
            Some(field) => AppError::BadRequest(messages::missing_key(&to_camel_case(field))),
            None => AppError::BadRequest(format!("Invalid payload: {text}")),
        }
    })
}

/// Flatten validator output into sorted [`FieldError`]s.
pub fn field_errors(errors: &ValidationErrors, context: &str) -> Vec<FieldError> {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .map(|(field, errors)| FieldError {
            property: to_camel_case(field),
            errors: errors
                .iter()
                .map(|err| {
                    err.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("This value is not valid ({}).", err.code))
                })
                .collect(),
            context: context.to_string(),
        })
        .collect();

    fields.sort_by(|a, b| a.property.cmp(&b.property));
    fields
}

/// `password_confirmation` -> `passwordConfirmation`
pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;

    for ch in name.chars() {
        if ch == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }

    out
}

fn missing_field(message: &str) -> Option<&str> {
    let rest = message.strip_prefix("missing field `")?;
    rest.split('`').next()
}
