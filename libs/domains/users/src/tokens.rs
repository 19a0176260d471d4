use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::value_objects::EntityId;

/// Opaque bearer token bound to one device of one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub id: Uuid,
    pub user_id: EntityId,
    pub token: String,
    /// Device label, unique per user.
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthToken {
    pub fn new(
        user_id: EntityId,
        token: String,
        name: impl Into<String>,
        now: DateTime<Utc>,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            token,
            name: name.into(),
            created_at: now,
            last_used_at: now,
            expires_at: ttl.map(|ttl| now + ttl),
        }
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_used_at = now;
    }
}

/// Single-use refresh token of the web flow, keyed by username (email).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub id: Uuid,
    pub refresh_token: String,
    pub username: String,
    pub valid: DateTime<Utc>,
}

impl RefreshToken {
    pub fn new(refresh_token: String, username: impl Into<String>, valid: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            refresh_token,
            username: username.into(),
            valid,
        }
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.valid >= now
    }
}

/// At most one per email. `valid_until == None` never expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetPasswordToken {
    pub email: String,
    pub reset_token: String,
    pub valid_until: Option<DateTime<Utc>>,
}

impl ResetPasswordToken {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.is_none_or(|valid_until| valid_until >= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_token_expiry() {
        let now = Utc::now();
        let token = AuthToken::new(EntityId::new(), "t".into(), "web", now, Some(Duration::minutes(5)));

        assert_eq!(token.last_used_at, now);
        assert!(token.is_valid(now + Duration::minutes(4)));
        assert!(!token.is_valid(now + Duration::minutes(5)));

        let forever = AuthToken::new(EntityId::new(), "t".into(), "web", now, None);
        assert!(forever.is_valid(now + Duration::days(3650)));
    }

    #[test]
    fn test_refresh_token_valid_until_inclusive() {
        let now = Utc::now();
        let token = RefreshToken::new("r".into(), "a@b.com", now);
        assert!(token.is_valid(now));
        assert!(!token.is_valid(now + Duration::seconds(1)));
    }

    #[test]
    fn test_reset_token_without_deadline_never_expires() {
        let token = ResetPasswordToken {
            email: "a@b.com".into(),
            reset_token: "r".into(),
            valid_until: None,
        };
        assert!(token.is_valid(Utc::now() + Duration::days(365)));
    }
}
