use axum_helpers::JwtAuth;
use chrono::Duration;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::error::{UserError, UserResult};
use crate::models::TokenPairResponse;
use crate::repository::{RefreshTokenRepository, UserRepository};
use crate::security::{Clock, TokenGenerator};
use crate::tokens::RefreshToken;
use crate::user::User;

use super::auth_user_service::AuthUserService;

pub const LOGGED_OUT: &str = "You have successfully logged out";
const INVALID_REFRESH_TOKEN: &str = "Invalid JWT Refresh Token";

/// JWT sessions of the web client: short-lived access tokens plus
/// single-use refresh tokens.
#[derive(Clone)]
pub struct WebAuthService {
    auth: AuthUserService,
    users: Arc<dyn UserRepository>,
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
    jwt: Arc<JwtAuth>,
    generator: Arc<dyn TokenGenerator>,
    clock: Arc<dyn Clock>,
    refresh_ttl: Duration,
}

impl WebAuthService {
    pub fn new(
        auth: AuthUserService,
        users: Arc<dyn UserRepository>,
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        jwt: Arc<JwtAuth>,
        generator: Arc<dyn TokenGenerator>,
        clock: Arc<dyn Clock>,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            auth,
            users,
            refresh_tokens,
            jwt,
            generator,
            clock,
            refresh_ttl,
        }
    }

    #[instrument(skip(self, password))]
    pub async fn login_check(&self, email: &str, password: &str) -> UserResult<TokenPairResponse> {
        let Some(user) = self.auth.verify_credentials(email, password).await? else {
            warn!("Rejected web login");
            return Err(UserError::Unauthorized("Invalid credentials.".to_string()));
        };

        let pair = self.issue(&user).await?;
        info!(user_id = %user.id(), "Web login");
        Ok(pair)
    }

    /// Exchanges a refresh token for a new pair. The presented token is consumed.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> UserResult<TokenPairResponse> {
        let invalid = || UserError::Unauthorized(INVALID_REFRESH_TOKEN.to_string());

        let Some(stored) = self.refresh_tokens.find_by_token(refresh_token).await? else {
            warn!("Unknown refresh token");
            return Err(invalid());
        };

        if !stored.is_valid(self.clock.now()) {
            warn!(username = %stored.username, "Expired refresh token");
            self.refresh_tokens.delete(stored.id).await?;
            return Err(invalid());
        }

        let user = self
            .users
            .find_by_email(&stored.username, false)
            .await?
            .ok_or_else(invalid)?;

        self.refresh_tokens.delete(stored.id).await?;
        self.issue(&user).await
    }

    /// Revokes every refresh token of the user. Returns how many were removed.
    #[instrument(skip(self, user), fields(user_id = %user.id()))]
    pub async fn logout(&self, user: &User) -> UserResult<u64> {
        let removed = self
            .refresh_tokens
            .delete_for_username(user.email().as_str())
            .await?;

        info!(removed, "Web logout");
        Ok(removed)
    }

    async fn issue(&self, user: &User) -> UserResult<TokenPairResponse> {
        let roles: Vec<String> = user.roles().iter().map(|r| r.as_str().to_string()).collect();
        let token = self.jwt.create_access_token(
            &user.id().to_string(),
            user.email().as_str(),
            &roles,
        )?;

        let refresh = RefreshToken::new(
            self.generator.generate(),
            user.email().as_str(),
            self.clock.now() + self.refresh_ttl,
        );
        self.refresh_tokens.save(&refresh).await?;

        Ok(TokenPairResponse {
            token,
            refresh_token: refresh.refresh_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth_user_service::tests::{Fixture, fixture, register_request};
    use crate::security::RandomHexTokenGenerator;
    use crate::testing::ManualClock;
    use axum_helpers::JwtConfig;

    fn web(f: &Fixture, clock: Arc<ManualClock>) -> WebAuthService {
        WebAuthService::new(
            f.service.clone(),
            f.repositories.users.clone(),
            f.repositories.refresh_tokens.clone(),
            Arc::new(JwtAuth::new(&JwtConfig::new(
                "test-secret-that-is-at-least-32-characters",
            ))),
            Arc::new(RandomHexTokenGenerator),
            clock,
            Duration::days(30),
        )
    }

    #[tokio::test]
    async fn test_login_check_issues_verifiable_jwt() {
        let f = fixture();
        let user = f.service.register_web(register_request("jane@example.com")).await.unwrap();
        let web = web(&f, Arc::new(ManualClock::new()));

        let pair = web.login_check("jane@example.com", "secret").await.unwrap();
        let claims = web.jwt.verify_token(&pair.token).unwrap();

        assert_eq!(claims.sub, user.id().to_string());
        assert_eq!(claims.email, "jane@example.com");
        assert_eq!(claims.roles, vec!["ROLE_USER".to_string()]);
        assert_eq!(pair.refresh_token.len(), 64);
    }

    #[tokio::test]
    async fn test_login_check_rejects_bad_credentials() {
        let f = fixture();
        f.service.register_web(register_request("jane@example.com")).await.unwrap();
        let web = web(&f, Arc::new(ManualClock::new()));

        let err = web.login_check("jane@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, UserError::Unauthorized(m) if m == "Invalid credentials."));
    }

    #[tokio::test]
    async fn test_refresh_rotates_tokens() {
        let f = fixture();
        f.service.register_web(register_request("jane@example.com")).await.unwrap();
        let web = web(&f, Arc::new(ManualClock::new()));

        let first = web.login_check("jane@example.com", "secret").await.unwrap();
        let second = web.refresh(&first.refresh_token).await.unwrap();
        assert_ne!(first.refresh_token, second.refresh_token);

        let err = web.refresh(&first.refresh_token).await.unwrap_err();
        assert!(matches!(err, UserError::Unauthorized(m) if m == INVALID_REFRESH_TOKEN));
        assert!(web.refresh(&second.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_refresh_token_is_rejected() {
        let f = fixture();
        f.service.register_web(register_request("jane@example.com")).await.unwrap();
        let clock = Arc::new(ManualClock::new());
        let web = web(&f, clock.clone());

        let pair = web.login_check("jane@example.com", "secret").await.unwrap();
        clock.advance(Duration::days(31));

        let err = web.refresh(&pair.refresh_token).await.unwrap_err();
        assert_eq!(err.to_string(), INVALID_REFRESH_TOKEN);
    }

    #[tokio::test]
    async fn test_logout_revokes_all_refresh_tokens() {
        let f = fixture();
        let user = f.service.register_web(register_request("jane@example.com")).await.unwrap();
        let web = web(&f, Arc::new(ManualClock::new()));

        let a = web.login_check("jane@example.com", "secret").await.unwrap();
        let b = web.login_check("jane@example.com", "secret").await.unwrap();

        assert_eq!(web.logout(&user).await.unwrap(), 2);
        assert!(web.refresh(&a.refresh_token).await.is_err());
        assert!(web.refresh(&b.refresh_token).await.is_err());
    }
}
