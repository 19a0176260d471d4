use axum_helpers::FieldError;
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{UserError, UserResult};
use crate::mailer::{MailMessage, Mailer};
use crate::models::ResetPasswordRequest;
use crate::repository::{ResetPasswordTokenRepository, UserRepository};
use crate::security::{Clock, PasswordHasher, TokenGenerator};
use crate::tokens::ResetPasswordToken;
use crate::user::User;

/// Forgotten-password flow: mail a one-time token, then exchange it for a new password.
#[derive(Clone)]
pub struct ResetPasswordService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn ResetPasswordTokenRepository>,
    generator: Arc<dyn TokenGenerator>,
    hasher: Arc<dyn PasswordHasher>,
    clock: Arc<dyn Clock>,
    mailer: Arc<dyn Mailer>,
    ttl: Option<Duration>,
    mail_from: String,
}

impl ResetPasswordService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn ResetPasswordTokenRepository>,
        generator: Arc<dyn TokenGenerator>,
        hasher: Arc<dyn PasswordHasher>,
        clock: Arc<dyn Clock>,
        mailer: Arc<dyn Mailer>,
        ttl: Option<Duration>,
        mail_from: impl Into<String>,
    ) -> Self {
        Self {
            users,
            tokens,
            generator,
            hasher,
            clock,
            mailer,
            ttl,
            mail_from: mail_from.into(),
        }
    }

    /// Replaces any pending token for the address and mails the new one.
    /// Unknown and soft-deleted accounts are ignored without an error.
    #[instrument(skip(self))]
    pub async fn generate_reset_password_token(&self, email: &str) -> UserResult<()> {
        let Some(user) = self.users.find_by_email(email, false).await? else {
            debug!("No active account for reset request");
            return Ok(());
        };

        let address = user.email().as_str();
        self.tokens.delete_by_email(address).await?;

        let now = self.clock.now();
        let token = ResetPasswordToken {
            email: address.to_string(),
            reset_token: self.generator.generate(),
            valid_until: self.ttl.map(|ttl| now + ttl),
        };
        self.tokens.save(&token).await?;

        self.mailer
            .send(MailMessage::password_reset(
                &self.mail_from,
                address,
                &token.reset_token,
            ))
            .await?;

        info!(user_id = %user.id(), "Reset password token sent");
        Ok(())
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> UserResult<User> {
        let token = match self.tokens.find_by_token(&request.reset_token).await? {
            Some(token) if token.email.eq_ignore_ascii_case(request.email.trim()) => token,
            _ => {
                warn!("Unknown reset token or mismatching email");
                return Err(invalid_reset(
                    "Password reset token is invalid or wrong email provided.",
                    "Provided email is invalid or reset token not found",
                ));
            }
        };

        if !token.is_valid(self.clock.now()) {
            warn!("Expired reset token");
            return Err(invalid_reset(
                "Password reset token is invalid.",
                "Password reset token expired",
            ));
        }

        let mut user = self
            .users
            .find_by_email(&token.email, false)
            .await?
            .ok_or_else(UserError::not_found)?;

        user.set_password(self.hasher.hash(&request.password)?);
        user.touch(self.clock.now());
        self.users.save(&user).await?;
        self.tokens.delete_by_email(&token.email).await?;

        info!(user_id = %user.id(), "Password reset");
        Ok(user)
    }
}

fn invalid_reset(message: &str, detail: &str) -> UserError {
    UserError::FormValidation {
        message: message.to_string(),
        errors: vec![FieldError::new("email", detail, "User")],
    }
}
