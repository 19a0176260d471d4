use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::UserResult;
use crate::repository::AuthTokenRepository;
use crate::security::{Clock, TokenGenerator};
use crate::tokens::AuthToken;
use crate::user::User;
use crate::value_objects::EntityId;

/// Issues and looks up per-device bearer tokens.
#[derive(Clone)]
pub struct AuthTokenService {
    tokens: Arc<dyn AuthTokenRepository>,
    generator: Arc<dyn TokenGenerator>,
    clock: Arc<dyn Clock>,
    ttl: Option<Duration>,
}

impl AuthTokenService {
    pub fn new(
        tokens: Arc<dyn AuthTokenRepository>,
        generator: Arc<dyn TokenGenerator>,
        clock: Arc<dyn Clock>,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            tokens,
            generator,
            clock,
            ttl,
        }
    }

    /// Creates a token for `device`, attaches it to the user and persists it.
    ///
    /// The caller must have removed any previous token for the same device.
    #[instrument(skip(self, user), fields(user_id = %user.id()))]
    pub async fn generate_and_save_token(&self, user: &mut User, device: &str) -> UserResult<AuthToken> {
        let token = AuthToken::new(
            user.id(),
            self.generator.generate(),
            device,
            self.clock.now(),
            self.ttl,
        );

        self.tokens.save(&token).await?;
        user.add_auth_token(token.clone());

        debug!(token_id = %token.id, "Issued auth token");
        Ok(token)
    }

    pub async fn existing(&self, user_id: EntityId, device: &str) -> UserResult<Option<AuthToken>> {
        self.tokens.find_by_user_and_name(user_id, device).await
    }

    pub async fn find(&self, token_id: Uuid) -> UserResult<Option<AuthToken>> {
        self.tokens.find(token_id).await
    }

    pub async fn find_by_token(&self, value: &str) -> UserResult<Option<AuthToken>> {
        self.tokens.find_by_token(value).await
    }

    pub async fn delete(&self, token: &AuthToken) -> UserResult<()> {
        self.tokens.delete(token.id).await?;
        debug!(token_id = %token.id, "Deleted auth token");
        Ok(())
    }

    /// Records that the token was just used.
    pub async fn touch(&self, token: &mut AuthToken) -> UserResult<()> {
        token.touch(self.clock.now());
        self.tokens.save(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryUserRepository;
    use crate::security::RandomHexTokenGenerator;
    use crate::testing::ManualClock;
    use chrono::Utc;

    fn service(clock: Arc<ManualClock>, ttl: Option<Duration>) -> AuthTokenService {
        AuthTokenService::new(
            Arc::new(InMemoryUserRepository::new().auth_token_repository()),
            Arc::new(RandomHexTokenGenerator),
            clock,
            ttl,
        )
    }

    fn user() -> User {
        User::create("jane@example.com", None, None, None, &["ROLE_USER"], Utc::now())
            .unwrap()
            .0
    }

    #[tokio::test]
    async fn test_generate_attaches_and_persists() {
        let clock = Arc::new(ManualClock::new());
        let service = service(clock.clone(), Some(Duration::minutes(30)));
        let mut user = user();

        let token = service.generate_and_save_token(&mut user, "iphone").await.unwrap();

        assert_eq!(token.token.len(), 64);
        assert_eq!(token.expires_at, Some(clock.now() + Duration::minutes(30)));
        assert_eq!(user.auth_token_for_device("iphone"), Some(&token));
        assert_eq!(
            service.existing(user.id(), "iphone").await.unwrap(),
            Some(token.clone())
        );
        assert_eq!(service.find_by_token(&token.token).await.unwrap(), Some(token));
    }

    #[tokio::test]
    async fn test_touch_updates_last_used() {
        let clock = Arc::new(ManualClock::new());
        let service = service(clock.clone(), None);
        let mut user = user();
        let mut token = service.generate_and_save_token(&mut user, "web").await.unwrap();

        clock.advance(Duration::minutes(5));
        service.touch(&mut token).await.unwrap();

        let stored = service.find(token.id).await.unwrap().unwrap();
        assert_eq!(stored.last_used_at, token.created_at + Duration::minutes(5));
    }

    #[tokio::test]
    async fn test_delete() {
        let service = service(Arc::new(ManualClock::new()), None);
        let mut user = user();
        let token = service.generate_and_save_token(&mut user, "web").await.unwrap();

        service.delete(&token).await.unwrap();
        assert!(service.find(token.id).await.unwrap().is_none());
    }
}
