//! Bearer authentication for the users API.
//!
//! A credential is either a JWT issued by the web login or an opaque device
//! token issued by the app login. Both resolve to a stored [`User`].

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_helpers::{JwtAuth, errors::messages, extractors::extract_bearer_token};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{UserError, UserResult};
use crate::repository::UserRepository;
use crate::security::Clock;
use crate::services::AuthTokenService;
use crate::user::User;
use crate::value_objects::{EntityId, UserRole};

pub struct CredentialResolver {
    jwt: Arc<JwtAuth>,
    users: Arc<dyn UserRepository>,
    tokens: AuthTokenService,
    clock: Arc<dyn Clock>,
}

impl CredentialResolver {
    pub fn new(
        jwt: Arc<JwtAuth>,
        users: Arc<dyn UserRepository>,
        tokens: AuthTokenService,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            jwt,
            users,
            tokens,
            clock,
        }
    }

    pub async fn resolve(&self, credential: &str) -> UserResult<User> {
        match self.jwt.verify_token(credential) {
            Ok(claims) => {
                let id: EntityId = claims
                    .sub
                    .parse()
                    .map_err(|_| UserError::invalid_credentials())?;
                let user = self.load(id).await?;
                debug!(user_id = %user.id(), "Authenticated with JWT");
                Ok(user)
            }
            Err(_) => self.resolve_device_token(credential).await,
        }
    }

    async fn resolve_device_token(&self, credential: &str) -> UserResult<User> {
        let mut token = match self.tokens.find_by_token(credential).await? {
            Some(token) if token.is_valid(self.clock.now()) => token,
            _ => {
                warn!("Unknown or expired bearer credential");
                return Err(UserError::invalid_credentials());
            }
        };

        let mut user = self.load(token.user_id).await?;
        self.tokens.touch(&mut token).await?;
        user.add_auth_token(token);

        debug!(user_id = %user.id(), "Authenticated with device token");
        Ok(user)
    }

    async fn load(&self, id: EntityId) -> UserResult<User> {
        let user = self
            .users
            .find(id, true)
            .await?
            .ok_or_else(UserError::invalid_credentials)?;

        if user.is_deleted() {
            warn!(user_id = %id, "Soft-deleted user presented a credential");
            return Err(UserError::Unauthorized("User is soft-deleted".to_string()));
        }
        Ok(user)
    }
}

async fn authenticate<S>(parts: &Parts, state: &S) -> UserResult<User>
where
    Arc<CredentialResolver>: FromRef<S>,
    S: Sync,
{
    let credential = extract_bearer_token(&parts.headers)
        .ok_or_else(|| UserError::AccessDenied(messages::AUTHENTICATION_REQUIRED.to_string()))?;

    let resolver = Arc::<CredentialResolver>::from_ref(state);
    resolver.resolve(&credential).await
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    Arc<CredentialResolver>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = UserError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await.map(CurrentUser)
    }
}

/// An authenticated caller holding `ROLE_ADMIN`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl<S> FromRequestParts<S> for AdminUser
where
    Arc<CredentialResolver>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = UserError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;

        if !user.has_role(UserRole::Admin) {
            warn!(user_id = %user.id(), "Admin route refused");
            return Err(UserError::Forbidden("Access Denied.".to_string()));
        }
        Ok(AdminUser(user))
    }
}
