use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{DUPLICATE_EMAIL, UserError, UserResult};
use crate::tokens::{AuthToken, RefreshToken, ResetPasswordToken};
use crate::user::User;
use crate::value_objects::EntityId;

/// Whitelisted sort keys of the user list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserOrder {
    Id,
    /// last name, then first name, then email
    Name,
    Email,
    CreatedAt,
}

impl UserOrder {
    /// Unknown keys yield `None`, which lists in insertion order.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "id" => Some(UserOrder::Id),
            "name" => Some(UserOrder::Name),
            "email" => Some(UserOrder::Email),
            "createdAt" => Some(UserOrder::CreatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserListCriteria {
    pub order: Option<UserOrder>,
    pub ascending: bool,
    pub with_deleted: bool,
    /// `None` returns every matching row.
    pub limit: Option<u64>,
    pub offset: u64,
}

impl Default for UserListCriteria {
    fn default() -> Self {
        Self {
            order: None,
            ascending: true,
            with_deleted: false,
            limit: None,
            offset: 0,
        }
    }
}

/// User persistence. Soft-deleted users are only returned when
/// `with_deleted` is set.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find(&self, id: EntityId, with_deleted: bool) -> UserResult<Option<User>>;

    /// Case-insensitive lookup.
    async fn find_by_email(&self, email: &str, with_deleted: bool) -> UserResult<Option<User>>;

    /// Checks every user, soft-deleted ones included.
    async fn email_exists(&self, email: &str, exclude: Option<EntityId>) -> UserResult<bool>;

    /// Insert or update the user row. Auth tokens are written only through
    /// [`AuthTokenRepository`].
    async fn save(&self, user: &User) -> UserResult<()>;

    /// Hard delete. Auth tokens go with the user.
    async fn delete(&self, id: EntityId) -> UserResult<bool>;

    /// Page of users plus the total count matching the filter. Auth tokens
    /// are not loaded.
    async fn list(&self, criteria: &UserListCriteria) -> UserResult<(Vec<User>, u64)>;
}

#[async_trait]
pub trait AuthTokenRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> UserResult<Option<AuthToken>>;

    async fn find_by_token(&self, token: &str) -> UserResult<Option<AuthToken>>;

    async fn find_by_user_and_name(
        &self,
        user_id: EntityId,
        name: &str,
    ) -> UserResult<Option<AuthToken>>;

    async fn save(&self, token: &AuthToken) -> UserResult<()>;

    async fn delete(&self, id: Uuid) -> UserResult<bool>;
}

#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn find_by_token(&self, refresh_token: &str) -> UserResult<Option<RefreshToken>>;

    async fn save(&self, token: &RefreshToken) -> UserResult<()>;

    async fn delete(&self, id: Uuid) -> UserResult<bool>;

    /// Returns how many tokens were removed.
    async fn delete_for_username(&self, username: &str) -> UserResult<u64>;
}

#[async_trait]
pub trait ResetPasswordTokenRepository: Send + Sync {
    async fn find_by_token(&self, reset_token: &str) -> UserResult<Option<ResetPasswordToken>>;

    async fn find_by_email(&self, email: &str) -> UserResult<Option<ResetPasswordToken>>;

    async fn save(&self, token: &ResetPasswordToken) -> UserResult<()>;

    async fn delete_by_email(&self, email: &str) -> UserResult<bool>;
}

/// Every repository the domain needs, behind trait objects.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub auth_tokens: Arc<dyn AuthTokenRepository>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
    pub reset_tokens: Arc<dyn ResetPasswordTokenRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        let store = InMemoryUserRepository::new();
        Self {
            auth_tokens: Arc::new(store.auth_token_repository()),
            users: Arc::new(store),
            refresh_tokens: Arc::new(InMemoryRefreshTokenRepository::new()),
            reset_tokens: Arc::new(InMemoryResetPasswordTokenRepository::new()),
        }
    }

    pub fn postgres(db: sea_orm::DatabaseConnection) -> Self {
        use crate::postgres_repository_impl::{
            PostgresAuthTokenRepository, PostgresRefreshTokenRepository,
            PostgresResetPasswordTokenRepository, PostgresUserRepository,
        };

        Self {
            users: Arc::new(PostgresUserRepository::new(db.clone())),
            auth_tokens: Arc::new(PostgresAuthTokenRepository::new(db.clone())),
            refresh_tokens: Arc::new(PostgresRefreshTokenRepository::new(db.clone())),
            reset_tokens: Arc::new(PostgresResetPasswordTokenRepository::new(db)),
        }
    }
}

type TokenMap = Arc<RwLock<HashMap<Uuid, AuthToken>>>;

/// In-memory user store (for development/testing).
///
/// Auth tokens live in a separate map shared with
/// [`InMemoryAuthTokenRepository`]. Locks are always taken users first.
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<EntityId, User>>>,
    tokens: TokenMap,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token repository over the same storage.
    pub fn auth_token_repository(&self) -> InMemoryAuthTokenRepository {
        InMemoryAuthTokenRepository {
            tokens: self.tokens.clone(),
        }
    }

    fn with_tokens(mut user: User, tokens: &HashMap<Uuid, AuthToken>) -> User {
        let mut owned: Vec<AuthToken> = tokens
            .values()
            .filter(|t| t.user_id == user.id)
            .cloned()
            .collect();
        owned.sort_by_key(|t| t.id);
        user.auth_tokens = owned;
        user
    }
}

fn compare(a: &User, b: &User, order: Option<UserOrder>) -> Ordering {
    match order {
        None | Some(UserOrder::Id) => Ordering::Equal,
        Some(UserOrder::Name) => a
            .last_name
            .cmp(&b.last_name)
            .then_with(|| a.first_name.cmp(&b.first_name))
            .then_with(|| a.email.as_str().cmp(b.email.as_str())),
        Some(UserOrder::Email) => a.email.as_str().cmp(b.email.as_str()),
        Some(UserOrder::CreatedAt) => a.created_at.cmp(&b.created_at),
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find(&self, id: EntityId, with_deleted: bool) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        let tokens = self.tokens.read().await;

        Ok(users
            .get(&id)
            .filter(|u| with_deleted || !u.is_deleted())
            .cloned()
            .map(|u| Self::with_tokens(u, &tokens)))
    }

    async fn find_by_email(&self, email: &str, with_deleted: bool) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        let tokens = self.tokens.read().await;

        Ok(users
            .values()
            .find(|u| u.email.matches(email) && (with_deleted || !u.is_deleted()))
            .cloned()
            .map(|u| Self::with_tokens(u, &tokens)))
    }

    async fn email_exists(&self, email: &str, exclude: Option<EntityId>) -> UserResult<bool> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .any(|u| u.email.matches(email) && Some(u.id) != exclude))
    }

    async fn save(&self, user: &User) -> UserResult<()> {
        let mut users = self.users.write().await;

        if users
            .values()
            .any(|u| u.id != user.id && u.email.matches(user.email.as_str()))
        {
            return Err(UserError::Conflict(DUPLICATE_EMAIL.to_string()));
        }

        let mut stored = user.clone();
        stored.auth_tokens.clear();
        users.insert(user.id, stored);

        tracing::debug!(user_id = %user.id, "Saved user");
        Ok(())
    }

    async fn delete(&self, id: EntityId) -> UserResult<bool> {
        let mut users = self.users.write().await;
        let removed = users.remove(&id).is_some();

        if removed {
            self.tokens.write().await.retain(|_, t| t.user_id != id);
            tracing::info!(user_id = %id, "Deleted user");
        }

        Ok(removed)
    }

    async fn list(&self, criteria: &UserListCriteria) -> UserResult<(Vec<User>, u64)> {
        let users = self.users.read().await;

        let mut matching: Vec<&User> = users
            .values()
            .filter(|u| criteria.with_deleted || !u.is_deleted())
            .collect();

        matching.sort_by(|a, b| {
            let ord = compare(a, b, criteria.order);
            let ord = if criteria.ascending { ord } else { ord.reverse() };
            match criteria.order {
                Some(UserOrder::Id) if !criteria.ascending => ord.then_with(|| b.id.cmp(&a.id)),
                _ => ord.then_with(|| a.id.cmp(&b.id)),
            }
        });

        let total = matching.len() as u64;
        let offset = usize::try_from(criteria.offset).unwrap_or(usize::MAX);
        let limit = criteria
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        let page = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok((page, total))
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryAuthTokenRepository {
    tokens: TokenMap,
}

#[async_trait]
impl AuthTokenRepository for InMemoryAuthTokenRepository {
    async fn find(&self, id: Uuid) -> UserResult<Option<AuthToken>> {
        Ok(self.tokens.read().await.get(&id).cloned())
    }

    async fn find_by_token(&self, token: &str) -> UserResult<Option<AuthToken>> {
        let tokens = self.tokens.read().await;
        Ok(tokens.values().find(|t| t.token == token).cloned())
    }

    async fn find_by_user_and_name(
        &self,
        user_id: EntityId,
        name: &str,
    ) -> UserResult<Option<AuthToken>> {
        let tokens = self.tokens.read().await;
        Ok(tokens
            .values()
            .find(|t| t.user_id == user_id && t.name == name)
            .cloned())
    }

    async fn save(&self, token: &AuthToken) -> UserResult<()> {
        let mut tokens = self.tokens.write().await;
        if tokens
            .values()
            .any(|t| t.id != token.id && t.user_id == token.user_id && t.name == token.name)
        {
            return Err(UserError::Conflict(format!(
                "Token for device {} already exists",
                token.name
            )));
        }
        tokens.insert(token.id, token.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> UserResult<bool> {
        Ok(self.tokens.write().await.remove(&id).is_some())
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryRefreshTokenRepository {
    tokens: Arc<RwLock<HashMap<Uuid, RefreshToken>>>,
}

impl InMemoryRefreshTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokenRepository {
    async fn find_by_token(&self, refresh_token: &str) -> UserResult<Option<RefreshToken>> {
        let tokens = self.tokens.read().await;
        Ok(tokens
            .values()
            .find(|t| t.refresh_token == refresh_token)
            .cloned())
    }

    async fn save(&self, token: &RefreshToken) -> UserResult<()> {
        self.tokens.write().await.insert(token.id, token.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> UserResult<bool> {
        Ok(self.tokens.write().await.remove(&id).is_some())
    }

    async fn delete_for_username(&self, username: &str) -> UserResult<u64> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| t.username != username);
        Ok((before - tokens.len()) as u64)
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryResetPasswordTokenRepository {
    tokens: Arc<RwLock<HashMap<String, ResetPasswordToken>>>,
}

impl InMemoryResetPasswordTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResetPasswordTokenRepository for InMemoryResetPasswordTokenRepository {
    async fn find_by_token(&self, reset_token: &str) -> UserResult<Option<ResetPasswordToken>> {
        let tokens = self.tokens.read().await;
        Ok(tokens
            .values()
            .find(|t| t.reset_token == reset_token)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> UserResult<Option<ResetPasswordToken>> {
        Ok(self.tokens.read().await.get(email).cloned())
    }

    async fn save(&self, token: &ResetPasswordToken) -> UserResult<()> {
        self.tokens
            .write()
            .await
            .insert(token.email.clone(), token.clone());
        Ok(())
    }

    async fn delete_by_email(&self, email: &str) -> UserResult<bool> {
        Ok(self.tokens.write().await.remove(email).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn user(email: &str, first: Option<&str>, last: Option<&str>) -> User {
        User::create(
            email,
            None,
            first.map(str::to_string),
            last.map(str::to_string),
            &["ROLE_USER"],
            Utc::now(),
        )
        .unwrap()
        .0
    }

    fn emails(users: &[User]) -> Vec<&str> {
        users.iter().map(|u| u.email().as_str()).collect()
    }

    #[tokio::test]
    async fn test_save_and_find_respects_soft_delete() {
        let repo = InMemoryUserRepository::new();
        let mut user = user("jane@example.com", None, None);
        repo.save(&user).await.unwrap();

        assert!(repo.find(user.id(), false).await.unwrap().is_some());
        assert!(repo.find_by_email("JANE@example.com", false).await.unwrap().is_some());

        user.soft_delete(Utc::now());
        repo.save(&user).await.unwrap();

        assert!(repo.find(user.id(), false).await.unwrap().is_none());
        assert!(repo.find_by_email("jane@example.com", false).await.unwrap().is_none());
        assert!(repo.find(user.id(), true).await.unwrap().is_some());
        assert!(repo.email_exists("jane@example.com", None).await.unwrap());
        assert!(!repo.email_exists("jane@example.com", Some(user.id())).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let repo = InMemoryUserRepository::new();
        repo.save(&user("jane@example.com", None, None)).await.unwrap();

        let err = repo
            .save(&user("Jane@Example.com", None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Conflict(m) if m == DUPLICATE_EMAIL));
    }

    #[tokio::test]
    async fn test_tokens_load_with_user_and_go_with_delete() {
        let repo = InMemoryUserRepository::new();
        let tokens = repo.auth_token_repository();
        let now = Utc::now();

        let user = user("jane@example.com", None, None);
        repo.save(&user).await.unwrap();
        let web = AuthToken::new(user.id(), "w".into(), "web", now, None);
        let phone = AuthToken::new(user.id(), "p".into(), "phone", now, None);
        tokens.save(&web).await.unwrap();
        tokens.save(&phone).await.unwrap();

        let loaded = repo.find(user.id(), false).await.unwrap().unwrap();
        assert_eq!(loaded.auth_tokens().len(), 2);

        repo.delete(user.id()).await.unwrap();
        assert!(tokens.find(web.id).await.unwrap().is_none());
        assert!(tokens.find(phone.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_saving_stale_user_keeps_token_rows() {
        let repo = InMemoryUserRepository::new();
        let tokens = repo.auth_token_repository();
        let now = Utc::now();

        let user = user("jane@example.com", None, None);
        repo.save(&user).await.unwrap();
        let web = AuthToken::new(user.id(), "w".into(), "web", now, None);
        tokens.save(&web).await.unwrap();

        // Loaded while only the web token existed.
        let mut stale = repo.find(user.id(), false).await.unwrap().unwrap();
        assert_eq!(stale.auth_tokens().len(), 1);

        let phone = AuthToken::new(user.id(), "p".into(), "phone", now, None);
        tokens.save(&phone).await.unwrap();
        tokens.delete(web.id).await.unwrap();

        stale.set_names(Some("Jane".into()), None);
        repo.save(&stale).await.unwrap();

        assert!(tokens.find(phone.id).await.unwrap().is_some());
        assert!(tokens.find(web.id).await.unwrap().is_none());
        assert!(tokens.find_by_token("w").await.unwrap().is_none());

        let reloaded = repo.find(user.id(), false).await.unwrap().unwrap();
        let devices: Vec<_> = reloaded.auth_tokens().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(devices, vec!["phone"]);
        assert_eq!(reloaded.first_name.as_deref(), Some("Jane"));
    }

    #[tokio::test]
    async fn test_token_unique_per_device() {
        let tokens = InMemoryUserRepository::new().auth_token_repository();
        let user_id = EntityId::new();
        let now = Utc::now();

        tokens
            .save(&AuthToken::new(user_id, "a".into(), "web", now, None))
            .await
            .unwrap();
        let err = tokens
            .save(&AuthToken::new(user_id, "b".into(), "web", now, None))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Conflict(_)));

        let found = tokens.find_by_user_and_name(user_id, "web").await.unwrap();
        assert_eq!(found.map(|t| t.token), Some("a".to_string()));
    }

    #[tokio::test]
    async fn test_list_orders_by_name_with_nulls_first() {
        let repo = InMemoryUserRepository::new();
        for user in [
            user("c@example.com", Some("Ann"), Some("Smith")),
            user("b@example.com", None, None),
            user("a@example.com", Some("Bob"), Some("Adams")),
            user("d@example.com", Some("Al"), Some("Smith")),
        ] {
            repo.save(&user).await.unwrap();
        }

        let (asc, total) = repo
            .list(&UserListCriteria {
                order: Some(UserOrder::Name),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(total, 4);
        assert_eq!(
            emails(&asc),
            vec!["b@example.com", "a@example.com", "d@example.com", "c@example.com"]
        );

        let (desc, _) = repo
            .list(&UserListCriteria {
                order: Some(UserOrder::Name),
                ascending: false,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(
            emails(&desc),
            vec!["c@example.com", "d@example.com", "a@example.com", "b@example.com"]
        );
    }

    #[tokio::test]
    async fn test_list_unknown_order_is_insertion_order_and_paginates() {
        let repo = InMemoryUserRepository::new();
        for email in ["z@example.com", "a@example.com", "m@example.com"] {
            repo.save(&user(email, None, None)).await.unwrap();
        }

        let (page, total) = repo
            .list(&UserListCriteria {
                limit: Some(2),
                offset: 1,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(total, 3);
        assert_eq!(emails(&page), vec!["a@example.com", "m@example.com"]);
    }

    #[tokio::test]
    async fn test_refresh_tokens_delete_for_username() {
        let repo = InMemoryRefreshTokenRepository::new();
        let valid = Utc::now() + Duration::days(1);
        repo.save(&RefreshToken::new("r1".into(), "jane@example.com", valid))
            .await
            .unwrap();
        repo.save(&RefreshToken::new("r2".into(), "jane@example.com", valid))
            .await
            .unwrap();
        repo.save(&RefreshToken::new("r3".into(), "john@example.com", valid))
            .await
            .unwrap();

        assert_eq!(repo.delete_for_username("jane@example.com").await.unwrap(), 2);
        assert!(repo.find_by_token("r1").await.unwrap().is_none());
        assert!(repo.find_by_token("r3").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reset_tokens_keyed_by_email() {
        let repo = InMemoryResetPasswordTokenRepository::new();
        let token = ResetPasswordToken {
            email: "jane@example.com".into(),
            reset_token: "first".into(),
            valid_until: None,
        };
        repo.save(&token).await.unwrap();
        repo.save(&ResetPasswordToken {
            reset_token: "second".into(),
            ..token
        })
        .await
        .unwrap();

        assert!(repo.find_by_token("first").await.unwrap().is_none());
        assert!(repo.find_by_email("jane@example.com").await.unwrap().is_some());
        assert!(repo.delete_by_email("jane@example.com").await.unwrap());
        assert!(!repo.delete_by_email("jane@example.com").await.unwrap());
    }
}
