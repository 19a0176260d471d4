use messaging::Job;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::bus::Command;
use crate::models::{
    AdminCreateUserRequest, AdminUpdateUserRequest, ChangePasswordRequest, RegisterRequest,
    ResetPasswordRequest, TokenPairResponse, UpdateProfileRequest,
};
use crate::user::User;
use crate::value_objects::EntityId;

/// App registration, answered with a device token.
#[derive(Debug, Clone)]
pub struct RegisterUser {
    pub request: RegisterRequest,
}

impl Command for RegisterUser {
    type Output = (User, String);
}

#[derive(Debug, Clone)]
pub struct RegisterWebUser {
    pub request: RegisterRequest,
}

impl Command for RegisterWebUser {
    type Output = User;
}

#[derive(Debug, Clone)]
pub struct LoginUser {
    pub email: String,
    pub password: String,
    pub device_name: Option<String>,
}

impl Command for LoginUser {
    type Output = (User, String);
}

#[derive(Debug, Clone)]
pub struct LogoutToken {
    pub token_id: Uuid,
}

impl Command for LogoutToken {
    type Output = User;
}

#[derive(Debug, Clone)]
pub struct SignOutUser {
    pub user_id: EntityId,
}

impl Command for SignOutUser {
    type Output = User;
}

#[derive(Debug, Clone)]
pub struct UpdateProfile {
    pub user_id: EntityId,
    pub request: UpdateProfileRequest,
}

impl Command for UpdateProfile {
    type Output = User;
}

#[derive(Debug, Clone)]
pub struct ChangePassword {
    pub user_id: EntityId,
    pub request: ChangePasswordRequest,
}

impl Command for ChangePassword {
    type Output = User;
}

#[derive(Debug, Clone)]
pub struct DeleteAccount {
    pub user_id: EntityId,
    pub password: String,
}

impl Command for DeleteAccount {
    type Output = ();
}

/// Mails a reset token. Runs on the background worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestPasswordReset {
    pub email: String,
    #[serde(default)]
    pub retry_count: u32,
}

impl RequestPasswordReset {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            retry_count: 0,
        }
    }
}

impl Command for RequestPasswordReset {
    type Output = ();
}

impl Job for RequestPasswordReset {
    fn job_id(&self) -> String {
        format!("reset-password:{}", self.email)
    }

    fn retry_count(&self) -> u32 {
        self.retry_count
    }

    fn with_retry(&self) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            ..self.clone()
        }
    }

    fn job_type(&self) -> &'static str {
        "request_password_reset"
    }
}

#[derive(Debug, Clone)]
pub struct ResetPassword {
    pub request: ResetPasswordRequest,
}

impl Command for ResetPassword {
    type Output = User;
}

#[derive(Debug, Clone)]
pub struct WebLoginCheck {
    pub email: String,
    pub password: String,
}

impl Command for WebLoginCheck {
    type Output = TokenPairResponse;
}

#[derive(Debug, Clone)]
pub struct RefreshWebToken {
    pub refresh_token: String,
}

impl Command for RefreshWebToken {
    type Output = TokenPairResponse;
}

#[derive(Debug, Clone)]
pub struct WebLogout {
    pub user: User,
}

impl Command for WebLogout {
    type Output = u64;
}

#[derive(Debug, Clone)]
pub struct AdminCreateUser {
    pub request: AdminCreateUserRequest,
    pub causer: User,
}

impl Command for AdminCreateUser {
    type Output = User;
}

#[derive(Debug, Clone)]
pub struct AdminUpdateUser {
    pub id: EntityId,
    pub request: AdminUpdateUserRequest,
    pub causer: User,
}

impl Command for AdminUpdateUser {
    type Output = User;
}

#[derive(Debug, Clone)]
pub struct AdminSoftDeleteUser {
    pub id: EntityId,
    pub causer: User,
}

impl Command for AdminSoftDeleteUser {
    type Output = User;
}

#[derive(Debug, Clone)]
pub struct AdminRestoreUser {
    pub id: EntityId,
    pub causer: User,
}

impl Command for AdminRestoreUser {
    type Output = User;
}

#[derive(Debug, Clone)]
pub struct AdminForceDeleteUser {
    pub id: EntityId,
    pub causer: User,
}

impl Command for AdminForceDeleteUser {
    type Output = ();
}

/// Publishes an arbitrary update to the hub.
#[derive(Debug, Clone)]
pub struct PublishUpdate {
    pub topic: String,
    pub payload: Value,
}

impl Command for PublishUpdate {
    type Output = ();
}
