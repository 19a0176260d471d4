//! Request and response bodies of the HTTP API.

use axum_helpers::ValidationContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidateEmail, ValidationError};

use crate::tokens::AuthToken;
use crate::user::User;
use crate::value_objects::UserRole;

pub const NOT_BLANK: &str = "This value should not be blank.";
pub const INVALID_EMAIL: &str = "This value is not a valid email address.";
pub const PASSWORDS_DO_NOT_MATCH: &str = "Passwords do not match.";

/// Format check that leaves blank values to the `length` rule.
fn email_format(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.to_string().validate_email() {
        Ok(())
    } else {
        Err(ValidationError::new("email").with_message(Cow::Borrowed(INVALID_EMAIL)))
    }
}

/// Public view of a user. The password hash is never part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: String,
    pub roles: Vec<UserRole>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_tokens: Option<Vec<AuthTokenResponse>>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id().as_uuid(),
            email: user.email().to_string(),
            first_name: user.first_name().map(str::to_string),
            last_name: user.last_name().map(str::to_string),
            display_name: user.display_name(),
            roles: user.roles(),
            role: user.role(),
            created_at: user.created_at(),
            updated_at: user.updated_at(),
            deleted_at: user.deleted_at(),
            auth_tokens: None,
        }
    }
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self::from(&user)
    }
}

impl UserResponse {
    /// Includes the device tokens the user holds, without their secret values.
    pub fn with_auth_tokens(user: &User) -> Self {
        Self {
            auth_tokens: Some(user.auth_tokens().iter().map(Into::into).collect()),
            ..Self::from(user)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuthTokenResponse {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&AuthToken> for AuthTokenResponse {
    fn from(token: &AuthToken) -> Self {
        Self {
            id: token.id,
            name: token.name.clone(),
            created_at: token.created_at,
            last_used_at: token.last_used_at,
            expires_at: token.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserEnvelope {
    pub user: UserResponse,
}

impl From<User> for UserEnvelope {
    fn from(user: User) -> Self {
        Self { user: user.into() }
    }
}

/// User plus the plain device token issued for this session.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserTokenResponse {
    pub user: UserResponse,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenPairResponse {
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardResponse {
    pub data: MessageResponse,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DispatchResponse {
    pub message_dispatched: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub items: Vec<UserResponse>,
    pub total_items: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(
        length(min = 1, message = "This value should not be blank."),
        custom(function = "email_format")
    )]
    pub email: String,
    #[validate(length(min = 1, message = "This value should not be blank."))]
    pub password: String,
    #[validate(
        length(min = 1, message = "This value should not be blank."),
        must_match(other = "password", message = "Passwords do not match.")
    )]
    pub password_confirmation: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// Device label for the issued token. Defaults to "web".
    #[serde(default)]
    pub device_name: Option<String>,
}

impl ValidationContext for RegisterRequest {
    const CONTEXT: &'static str = "User";
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub device_name: Option<String>,
}

impl ValidationContext for LoginRequest {}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "This value should not be blank."))]
    pub refresh_token: String,
}

impl ValidationContext for RefreshTokenRequest {}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(
        length(min = 1, message = "This value should not be blank."),
        custom(function = "email_format")
    )]
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl ValidationContext for UpdateProfileRequest {
    const CONTEXT: &'static str = "User";
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "This value should not be blank."))]
    pub current_password: String,
    #[validate(length(min = 1, message = "This value should not be blank."))]
    pub password: String,
    #[validate(
        length(min = 1, message = "This value should not be blank."),
        must_match(other = "password", message = "Passwords do not match.")
    )]
    pub password_confirmation: String,
}

impl ValidationContext for ChangePasswordRequest {
    const CONTEXT: &'static str = "User";
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct DeleteAccountRequest {
    #[validate(length(min = 1, message = "This value should not be blank."))]
    pub password: String,
}

impl ValidationContext for DeleteAccountRequest {
    const CONTEXT: &'static str = "User";
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(length(min = 1, message = "This value should not be blank."))]
    pub email: String,
}

impl ValidationContext for ForgotPasswordRequest {
    const CONTEXT: &'static str = "User";
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "This value should not be blank."))]
    pub email: String,
    #[validate(length(min = 1, message = "This value should not be blank."))]
    pub reset_token: String,
    #[validate(length(min = 1, message = "This value should not be blank."))]
    pub password: String,
    #[validate(
        length(min = 1, message = "This value should not be blank."),
        must_match(other = "password", message = "Passwords do not match.")
    )]
    pub password_confirmation: String,
}

impl ValidationContext for ResetPasswordRequest {
    const CONTEXT: &'static str = "User";
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AdminCreateUserRequest {
    #[validate(
        length(min = 1, message = "This value should not be blank."),
        custom(function = "email_format")
    )]
    pub email: String,
    #[validate(length(min = 1, message = "This value should not be blank."))]
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// `ROLE_USER` when omitted.
    #[serde(default)]
    pub role: Option<String>,
}

impl ValidationContext for AdminCreateUserRequest {
    const CONTEXT: &'static str = "User";
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AdminUpdateUserRequest {
    #[validate(
        length(min = 1, message = "This value should not be blank."),
        custom(function = "email_format")
    )]
    pub email: String,
    /// Rehashed only when present and not empty.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl ValidationContext for AdminUpdateUserRequest {
    const CONTEXT: &'static str = "User";
}

/// Query string of the admin user list.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserListParams {
    /// 1-based page, default 1. 0 returns every item.
    pub page: Option<u64>,
    /// Page size, default 15. 0 returns every item.
    pub limit: Option<u64>,
    /// `id`, `name`, `email` or `createdAt`, default `name`.
    pub order_by: Option<String>,
    /// `ASC` (default) or `DESC`.
    pub order_type: Option<String>,
    pub with_deleted: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PublishUpdateRequest {
    #[validate(length(min = 1, message = "This value should not be blank."))]
    pub topic: String,
    #[schema(value_type = Object)]
    pub payload: Value,
}

impl ValidationContext for PublishUpdateRequest {}
