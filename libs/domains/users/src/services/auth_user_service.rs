use axum_helpers::FieldError;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::events::EventPublisher;
use crate::models::{ChangePasswordRequest, RegisterRequest};
use crate::notifications::{UpdateAction, UserUpdatePublisher};
use crate::repository::UserRepository;
use crate::security::{Clock, PasswordHasher};
use crate::user::User;
use crate::value_objects::{EntityId, UserRole};

use super::auth_token_service::AuthTokenService;
use super::user_command_service::{UserCommandService, validate_with_unique_email};

pub const DEFAULT_DEVICE: &str = "web";
const WRONG_CURRENT_PASSWORD: &str = "Wrong value for your current password.";

/// Registration, device-token sessions and credential changes.
#[derive(Clone)]
pub struct AuthUserService {
    users: Arc<dyn UserRepository>,
    tokens: AuthTokenService,
    hasher: Arc<dyn PasswordHasher>,
    clock: Arc<dyn Clock>,
    events: EventPublisher,
    updates: UserUpdatePublisher,
    commands: UserCommandService,
}

impl AuthUserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: AuthTokenService,
        hasher: Arc<dyn PasswordHasher>,
        clock: Arc<dyn Clock>,
        events: EventPublisher,
        updates: UserUpdatePublisher,
        commands: UserCommandService,
    ) -> Self {
        Self {
            users,
            tokens,
            hasher,
            clock,
            events,
            updates,
            commands,
        }
    }

    /// App registration: creates the account and a token for the device.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> UserResult<(User, String)> {
        let device = device_or_default(request.device_name.clone());
        let mut user = self.create_account(request).await?;

        let token = self.tokens.generate_and_save_token(&mut user, &device).await?;
        self.announce(&user).await;

        Ok((user, token.token))
    }

    /// Web registration: the client logs in through the JWT flow afterwards.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register_web(&self, request: RegisterRequest) -> UserResult<User> {
        let user = self.create_account(request).await?;
        self.announce(&user).await;
        Ok(user)
    }

    async fn create_account(&self, request: RegisterRequest) -> UserResult<User> {
        validate_with_unique_email(self.users.as_ref(), &request, &request.email, None).await?;

        let hash = self.hasher.hash(&request.password)?;
        let (user, event) = User::create(
            &request.email,
            Some(hash),
            request.first_name,
            request.last_name,
            &[UserRole::User.as_str()],
            self.clock.now(),
        )?;

        self.users.save(&user).await?;
        self.events.publish(vec![event]).await;

        info!(user_id = %user.id(), "User registered");
        Ok(user)
    }

    /// Same error for unknown email, deleted account and wrong password.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> UserResult<Option<User>> {
        let Some(user) = self.users.find_by_email(email, false).await? else {
            return Ok(None);
        };

        match user.password() {
            Some(hash) if self.hasher.verify(password, hash) => Ok(Some(user)),
            _ => Ok(None),
        }
    }

    /// Issues a fresh token for the device, invalidating the previous one.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        device: Option<String>,
    ) -> UserResult<(User, String)> {
        let Some(mut user) = self.verify_credentials(email, password).await? else {
            warn!("Rejected login");
            return Err(UserError::invalid_credentials());
        };

        let device = device_or_default(device);
        if let Some(previous) = self.tokens.existing(user.id(), &device).await? {
            user.remove_auth_token(previous.id);
            self.tokens.delete(&previous).await?;
        }

        let token = self.tokens.generate_and_save_token(&mut user, &device).await?;
        self.announce(&user).await;

        info!(user_id = %user.id(), device = %device, "User logged in");
        Ok((user, token.token))
    }

    #[instrument(skip(self))]
    pub async fn logout(&self, token_id: Uuid) -> UserResult<User> {
        let token = self
            .tokens
            .find(token_id)
            .await?
            .ok_or_else(|| UserError::NotFound("Token not found".to_string()))?;

        let mut user = self
            .users
            .find(token.user_id, true)
            .await?
            .ok_or_else(UserError::not_found)?;

        user.remove_auth_token(token.id);
        self.tokens.delete(&token).await?;
        self.announce(&user).await;

        info!(user_id = %user.id(), "Device logged out");
        Ok(user)
    }

    /// Drops every device token of the user.
    #[instrument(skip(self))]
    pub async fn sign_out(&self, user_id: EntityId) -> UserResult<User> {
        let mut user = self
            .users
            .find(user_id, true)
            .await?
            .ok_or_else(|| UserError::AccessDenied("User not found".to_string()))?;

        for token in user.remove_all_auth_tokens() {
            self.tokens.delete(&token).await?;
        }
        self.announce(&user).await;

        info!(user_id = %user.id(), "Signed out of every device");
        Ok(user)
    }

    #[instrument(skip(self, request))]
    pub async fn change_password(
        &self,
        user_id: EntityId,
        request: ChangePasswordRequest,
    ) -> UserResult<User> {
        let mut user = self
            .users
            .find(user_id, false)
            .await?
            .ok_or_else(|| UserError::AccessDenied("User not found".to_string()))?;

        self.check_password(&user, &request.current_password, "currentPassword")?;

        user.set_password(self.hasher.hash(&request.password)?);
        user.touch(self.clock.now());
        self.users.save(&user).await?;

        info!(user_id = %user.id(), "Password changed");
        Ok(user)
    }

    /// Deletes the account of `user_id` after confirming the password.
    #[instrument(skip(self, password))]
    pub async fn delete_account(&self, user_id: EntityId, password: &str) -> UserResult<()> {
        let user = self
            .users
            .find(user_id, false)
            .await?
            .ok_or_else(|| UserError::AccessDenied("User not found".to_string()))?;

        self.check_password(&user, password, "password")?;
        self.commands.remove(user.id(), user.email().as_str()).await
    }

    fn check_password(&self, user: &User, password: &str, property: &str) -> UserResult<()> {
        match user.password() {
            Some(hash) if self.hasher.verify(password, hash) => Ok(()),
            _ => {
                warn!(user_id = %user.id(), "Wrong current password");
                Err(UserError::FormValidation {
                    message: "Invalid credentials".to_string(),
                    errors: vec![FieldError::new(property, WRONG_CURRENT_PASSWORD, "User")],
                })
            }
        }
    }

    async fn announce(&self, user: &User) {
        self.updates
            .publish_user(user, UpdateAction::Update, Some(user.email().as_str()))
            .await;
    }
}

fn device_or_default(device: Option<String>) -> String {
    device
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| DEFAULT_DEVICE.to_string())
}
