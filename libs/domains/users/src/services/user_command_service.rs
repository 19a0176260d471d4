use axum_helpers::{FieldError, extractors::field_errors};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::error::{DUPLICATE_EMAIL, UserError, UserResult};
use crate::events::EventPublisher;
use crate::models::{AdminCreateUserRequest, AdminUpdateUserRequest, UpdateProfileRequest};
use crate::notifications::{UpdateAction, UserUpdatePublisher};
use crate::repository::UserRepository;
use crate::security::{Clock, PasswordHasher};
use crate::user::User;
use crate::value_objects::{EntityId, UserRole};

/// Validator output plus the uniqueness check on email, as one error.
pub(crate) async fn validate_with_unique_email<T: Validate>(
    users: &dyn UserRepository,
    request: &T,
    email: &str,
    exclude: Option<EntityId>,
) -> UserResult<()> {
    let mut errors = match request.validate() {
        Ok(()) => Vec::new(),
        Err(e) => field_errors(&e, "User"),
    };

    let conflict = !email.trim().is_empty() && users.email_exists(email, exclude).await?;
    if conflict {
        match errors.iter_mut().find(|e| e.property == "email") {
            Some(field) => field.errors.push(DUPLICATE_EMAIL.to_string()),
            None => errors.push(FieldError::new("email", DUPLICATE_EMAIL, "User")),
        }
        errors.sort_by(|a, b| a.property.cmp(&b.property));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(UserError::Validation { errors, conflict })
    }
}

/// Writes on users: admin management and profile updates.
#[derive(Clone)]
pub struct UserCommandService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    clock: Arc<dyn Clock>,
    events: EventPublisher,
    updates: UserUpdatePublisher,
}

impl UserCommandService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        clock: Arc<dyn Clock>,
        events: EventPublisher,
        updates: UserUpdatePublisher,
    ) -> Self {
        Self {
            users,
            hasher,
            clock,
            events,
            updates,
        }
    }

    fn ensure_not_self(target: EntityId, causer: &User) -> UserResult<()> {
        if target == causer.id() {
            return Err(UserError::BadRequest("User cannot soft-delete self".to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self, request, causer), fields(causer = %causer.email()))]
    pub async fn create(&self, request: AdminCreateUserRequest, causer: &User) -> UserResult<User> {
        validate_with_unique_email(self.users.as_ref(), &request, &request.email, None).await?;

        let roles = vec![
            request
                .role
                .unwrap_or_else(|| UserRole::User.as_str().to_string()),
        ];
        let hash = self.hasher.hash(&request.password)?;
        let (user, event) = User::create(
            &request.email,
            Some(hash),
            request.first_name,
            request.last_name,
            &roles,
            self.clock.now(),
        )?;

        self.users.save(&user).await?;
        self.events.publish(vec![event]).await;
        self.updates
            .publish_user(&user, UpdateAction::UserCreate, Some(causer.email().as_str()))
            .await;

        info!(user_id = %user.id(), "Admin created user");
        Ok(user)
    }

    #[instrument(skip(self, request, causer), fields(causer = %causer.email()))]
    pub async fn admin_update(
        &self,
        id: EntityId,
        request: AdminUpdateUserRequest,
        causer: &User,
    ) -> UserResult<User> {
        let mut user = self.users.find(id, false).await?.ok_or_else(UserError::not_found)?;
        validate_with_unique_email(self.users.as_ref(), &request, &request.email, Some(id)).await?;

        let mut events = Vec::new();
        events.extend(user.set_email(&request.email)?);
        user.set_names(request.first_name, request.last_name);

        if let Some(role) = request.role {
            user.set_roles(&[role])?;
        }
        if let Some(password) = request.password.filter(|p| !p.is_empty()) {
            user.set_password(self.hasher.hash(&password)?);
        }

        user.touch(self.clock.now());
        self.users.save(&user).await?;
        self.events.publish(events).await;
        self.updates
            .publish_user(&user, UpdateAction::UserUpdate, Some(causer.email().as_str()))
            .await;

        info!(user_id = %user.id(), "Admin updated user");
        Ok(user)
    }

    /// Profile change made by the user themself.
    #[instrument(skip(self, request))]
    pub async fn update_profile(
        &self,
        id: EntityId,
        request: UpdateProfileRequest,
    ) -> UserResult<User> {
        let mut user = self.users.find(id, false).await?.ok_or_else(UserError::not_found)?;
        validate_with_unique_email(self.users.as_ref(), &request, &request.email, Some(id)).await?;

        let events: Vec<_> = user.set_email(&request.email)?.into_iter().collect();
        user.set_names(request.first_name, request.last_name);
        user.touch(self.clock.now());

        self.users.save(&user).await?;
        self.events.publish(events).await;
        let causer = user.email().to_string();
        self.updates
            .publish_user(&user, UpdateAction::UserUpdate, Some(&causer))
            .await;

        info!(user_id = %user.id(), "Profile updated");
        Ok(user)
    }

    #[instrument(skip(self, causer), fields(causer = %causer.email()))]
    pub async fn soft_delete(&self, id: EntityId, causer: &User) -> UserResult<User> {
        Self::ensure_not_self(id, causer)?;
        let mut user = self.users.find(id, false).await?.ok_or_else(UserError::not_found)?;

        let event = user.soft_delete(self.clock.now());
        self.users.save(&user).await?;
        self.events.publish(vec![event]).await;
        self.updates
            .publish_user(&user, UpdateAction::UserSoftDelete, Some(causer.email().as_str()))
            .await;

        info!(user_id = %user.id(), "User soft-deleted");
        Ok(user)
    }

    #[instrument(skip(self, causer), fields(causer = %causer.email()))]
    pub async fn restore(&self, id: EntityId, causer: &User) -> UserResult<User> {
        Self::ensure_not_self(id, causer)?;
        let mut user = self.users.find(id, true).await?.ok_or_else(UserError::not_found)?;

        let event = user.restore();
        self.users.save(&user).await?;
        self.events.publish(vec![event]).await;
        self.updates
            .publish_user(&user, UpdateAction::UserRestore, Some(causer.email().as_str()))
            .await;

        info!(user_id = %user.id(), "User restored");
        Ok(user)
    }

    #[instrument(skip(self, causer), fields(causer = %causer.email()))]
    pub async fn force_delete(&self, id: EntityId, causer: &User) -> UserResult<()> {
        Self::ensure_not_self(id, causer)?;
        self.remove(id, causer.email().as_str()).await
    }

    /// Hard delete without the self check, used when a user deletes their own account.
    pub(crate) async fn remove(&self, id: EntityId, causer: &str) -> UserResult<()> {
        let user = self.users.find(id, true).await?.ok_or_else(UserError::not_found)?;

        self.users.delete(id).await?;
        self.updates
            .publish_user(&user, UpdateAction::UserForceDelete, Some(causer))
            .await;

        info!(user_id = %id, "User force-deleted");
        Ok(())
    }
}
