use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::UserResult;
use crate::events::UserDomainEvent;
use crate::tokens::AuthToken;
use crate::value_objects::{Email, EntityId, UserRole};

/// User aggregate. Owns its device tokens.
///
/// Mutators that other parts of the system react to return the
/// [`UserDomainEvent`] they produce instead of recording it internally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub(crate) id: EntityId,
    pub(crate) email: Email,
    pub(crate) password: Option<String>,
    pub(crate) first_name: Option<String>,
    pub(crate) last_name: Option<String>,
    pub(crate) roles: Vec<UserRole>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: Option<DateTime<Utc>>,
    pub(crate) deleted_at: Option<DateTime<Utc>>,
    pub(crate) auth_tokens: Vec<AuthToken>,
}

fn parse_roles<S: AsRef<str>>(roles: &[S]) -> UserResult<Vec<UserRole>> {
    let mut parsed = Vec::with_capacity(roles.len());
    for role in roles {
        let role: UserRole = role.as_ref().parse()?;
        if !parsed.contains(&role) {
            parsed.push(role);
        }
    }
    Ok(parsed)
}

impl User {
    pub fn create<S: AsRef<str>>(
        email: &str,
        password_hash: Option<String>,
        first_name: Option<String>,
        last_name: Option<String>,
        roles: &[S],
        now: DateTime<Utc>,
    ) -> UserResult<(Self, UserDomainEvent)> {
        let email = Email::parse(email)?;
        let roles = parse_roles(roles)?;

        let user = Self {
            id: EntityId::new(),
            email,
            password: password_hash,
            first_name,
            last_name,
            roles,
            created_at: now,
            updated_at: None,
            deleted_at: None,
            auth_tokens: Vec::new(),
        };

        let event = UserDomainEvent::UserCreated {
            user_id: user.id,
            email: user.email.to_string(),
        };

        Ok((user, event))
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref()
    }

    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Stored roles followed by the base role, without duplicates.
    pub fn roles(&self) -> Vec<UserRole> {
        let mut roles = self.roles.clone();
        if !roles.contains(&UserRole::User) {
            roles.push(UserRole::User);
        }
        roles
    }

    /// Primary role, the first of [`User::roles`].
    pub fn role(&self) -> UserRole {
        self.roles.first().copied().unwrap_or(UserRole::User)
    }

    pub fn has_role(&self, role: UserRole) -> bool {
        self.roles().contains(&role)
    }

    /// "first last" trimmed, or the email when both names are empty.
    pub fn display_name(&self) -> String {
        let full = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        );
        let full = full.trim();

        if full.is_empty() {
            self.email.to_string()
        } else {
            full.to_string()
        }
    }

    /// Returns an event only when the address actually changes.
    pub fn set_email(&mut self, email: &str) -> UserResult<Option<UserDomainEvent>> {
        let email = Email::parse(email)?;
        if email == self.email {
            return Ok(None);
        }

        let old = std::mem::replace(&mut self.email, email);
        Ok(Some(UserDomainEvent::UserEmailChanged {
            user_id: self.id,
            old_email: old.to_string(),
            new_email: self.email.to_string(),
        }))
    }

    pub fn set_names(&mut self, first_name: Option<String>, last_name: Option<String>) {
        self.first_name = first_name;
        self.last_name = last_name;
    }

    pub fn set_roles<S: AsRef<str>>(&mut self, roles: &[S]) -> UserResult<()> {
        self.roles = parse_roles(roles)?;
        Ok(())
    }

    pub fn set_password(&mut self, password_hash: String) {
        self.password = Some(password_hash);
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }

    /// Overwrites any previous deletion timestamp.
    pub fn soft_delete(&mut self, now: DateTime<Utc>) -> UserDomainEvent {
        self.deleted_at = Some(now);
        UserDomainEvent::UserSoftDeleted { user_id: self.id }
    }

    pub fn restore(&mut self) -> UserDomainEvent {
        self.deleted_at = None;
        UserDomainEvent::UserRestored { user_id: self.id }
    }

    pub fn auth_tokens(&self) -> &[AuthToken] {
        &self.auth_tokens
    }

    pub fn auth_token_for_device(&self, name: &str) -> Option<&AuthToken> {
        self.auth_tokens.iter().find(|token| token.name == name)
    }

    /// Replaces any token already held for the same device.
    pub fn add_auth_token(&mut self, token: AuthToken) {
        self.auth_tokens.retain(|existing| existing.name != token.name);
        self.auth_tokens.push(token);
    }

    pub fn remove_auth_token(&mut self, token_id: Uuid) -> Option<AuthToken> {
        let index = self.auth_tokens.iter().position(|t| t.id == token_id)?;
        Some(self.auth_tokens.remove(index))
    }

    pub fn remove_all_auth_tokens(&mut self) -> Vec<AuthToken> {
        std::mem::take(&mut self.auth_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UserError;

    fn user(roles: &[&str]) -> User {
        User::create(
            "jane@example.com",
            Some("hash".into()),
            Some("Jane".into()),
            Some("Doe".into()),
            roles,
            Utc::now(),
        )
        .unwrap()
        .0
    }

    #[test]
    fn test_create_emits_user_created() {
        let (user, event) =
            User::create("jane@example.com", None, None, None, &["ROLE_USER"], Utc::now()).unwrap();

        assert_eq!(
            event,
            UserDomainEvent::UserCreated {
                user_id: user.id(),
                email: "jane@example.com".into()
            }
        );
        assert!(!user.is_deleted());
        assert_eq!(user.updated_at(), None);
    }

    #[test]
    fn test_create_rejects_invalid_values() {
        let err = User::create("nope", None, None, None, &["ROLE_USER"], Utc::now()).unwrap_err();
        assert!(matches!(err, UserError::UnprocessableEntity(m) if m == "Email nope is not valid."));

        let err =
            User::create("a@b.com", None, None, None, &["ROLE_ROOT"], Utc::now()).unwrap_err();
        assert!(matches!(err, UserError::UnprocessableEntity(m) if m == "Role ROLE_ROOT is not valid."));
    }

    #[test]
    fn test_roles_always_include_base_role() {
        let admin = user(&["ROLE_ADMIN"]);
        assert_eq!(admin.roles(), vec![UserRole::Admin, UserRole::User]);
        assert_eq!(admin.role(), UserRole::Admin);
        assert!(admin.has_role(UserRole::Admin));

        let plain = user(&["ROLE_USER", "ROLE_USER"]);
        assert_eq!(plain.roles(), vec![UserRole::User]);
        assert_eq!(plain.role(), UserRole::User);

        let bare = user(&[]);
        assert_eq!(bare.roles(), vec![UserRole::User]);
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut user = user(&[]);
        assert_eq!(user.display_name(), "Jane Doe");

        user.set_names(None, Some("Doe".into()));
        assert_eq!(user.display_name(), "Doe");

        user.set_names(None, None);
        assert_eq!(user.display_name(), "jane@example.com");
    }

    #[test]
    fn test_set_email_only_reports_changes() {
        let mut user = user(&[]);
        assert_eq!(user.set_email("jane@example.com").unwrap(), None);

        let event = user.set_email("j.doe@example.com").unwrap();
        assert!(matches!(
            event,
            Some(UserDomainEvent::UserEmailChanged { ref old_email, ref new_email, .. })
                if old_email == "jane@example.com" && new_email == "j.doe@example.com"
        ));
        assert_eq!(user.email().as_str(), "j.doe@example.com");
    }

    #[test]
    fn test_soft_delete_is_not_idempotent() {
        let mut user = user(&[]);
        let first = Utc::now();
        let second = first + chrono::Duration::seconds(10);

        user.soft_delete(first);
        let event = user.soft_delete(second);

        assert_eq!(event, UserDomainEvent::UserSoftDeleted { user_id: user.id() });
        assert_eq!(user.deleted_at(), Some(second));

        user.restore();
        assert!(!user.is_deleted());
        assert_eq!(
            user.restore(),
            UserDomainEvent::UserRestored { user_id: user.id() }
        );
    }

    #[test]
    fn test_auth_token_collection() {
        let mut user = user(&[]);
        let now = Utc::now();
        let web = AuthToken::new(user.id(), "a".into(), "web", now, None);
        let phone = AuthToken::new(user.id(), "b".into(), "phone", now, None);

        user.add_auth_token(web.clone());
        user.add_auth_token(phone.clone());
        assert_eq!(user.auth_tokens().len(), 2);

        let replacement = AuthToken::new(user.id(), "c".into(), "web", now, None);
        user.add_auth_token(replacement.clone());
        assert_eq!(user.auth_token_for_device("web"), Some(&replacement));

        assert_eq!(user.remove_auth_token(phone.id), Some(phone));
        assert_eq!(user.remove_auth_token(web.id), None);
        assert_eq!(user.remove_all_auth_tokens().len(), 1);
        assert!(user.auth_tokens().is_empty());
    }
}
