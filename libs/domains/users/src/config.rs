use chrono::Duration;
use core_config::{ConfigError, FromEnv, env_or_default, env_parse};

/// Token lifetimes and mail settings for the users domain.
#[derive(Clone, Debug)]
pub struct SecurityConfig {
    /// Device token lifetime. `None` keeps tokens until logout.
    pub auth_token_ttl: Option<Duration>,
    /// Reset token lifetime. `None` keeps tokens until used.
    pub reset_token_ttl: Option<Duration>,
    pub refresh_token_ttl: Duration,
    /// Sender address of password reset emails.
    pub mail_from: String,
    /// Bounded capacity of the reset-request queue.
    pub reset_queue_capacity: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            auth_token_ttl: None,
            reset_token_ttl: Some(Duration::minutes(60)),
            refresh_token_ttl: Duration::seconds(2_592_000),
            mail_from: "no-reply@accounts.local".to_string(),
            reset_queue_capacity: 1024,
        }
    }
}

/// Positive minute counts become a lifetime; zero or less means no expiry.
fn minutes(value: i64) -> Option<Duration> {
    if value > 0 {
        Duration::try_minutes(value)
    } else {
        None
    }
}

impl FromEnv for SecurityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let auth_token_ttl = minutes(env_parse("AUTH_TOKEN_TTL_MINUTES", "0")?);
        let reset_token_ttl = minutes(env_parse("RESET_PASSWORD_TOKEN_TTL_MINUTES", "60")?);

        let refresh_secs: i64 = env_parse("REFRESH_TOKEN_TTL_SECS", "2592000")?;
        let refresh_token_ttl = Duration::try_seconds(refresh_secs)
            .filter(|_| refresh_secs > 0)
            .ok_or_else(|| ConfigError::ParseError {
                key: "REFRESH_TOKEN_TTL_SECS".to_string(),
                details: "must be a positive number of seconds".to_string(),
            })?;

        let reset_queue_capacity: usize = env_parse("RESET_QUEUE_CAPACITY", "1024")?;

        Ok(Self {
            auth_token_ttl,
            reset_token_ttl,
            refresh_token_ttl,
            mail_from: env_or_default("MAIL_FROM", "no-reply@accounts.local"),
            reset_queue_capacity: reset_queue_capacity.max(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: [&str; 5] = [
        "AUTH_TOKEN_TTL_MINUTES",
        "RESET_PASSWORD_TOKEN_TTL_MINUTES",
        "REFRESH_TOKEN_TTL_SECS",
        "MAIL_FROM",
        "RESET_QUEUE_CAPACITY",
    ];

    #[test]
    fn test_defaults() {
        temp_env::with_vars_unset(KEYS, || {
            let config = SecurityConfig::from_env().unwrap();
            assert_eq!(config.auth_token_ttl, None);
            assert_eq!(config.reset_token_ttl, Some(Duration::minutes(60)));
            assert_eq!(config.refresh_token_ttl, Duration::seconds(2_592_000));
            assert_eq!(config.reset_queue_capacity, 1024);
        });
    }

    #[test]
    fn test_overrides() {
        temp_env::with_vars(
            [
                ("AUTH_TOKEN_TTL_MINUTES", Some("15")),
                ("RESET_PASSWORD_TOKEN_TTL_MINUTES", Some("0")),
                ("REFRESH_TOKEN_TTL_SECS", Some("60")),
                ("MAIL_FROM", Some("accounts@example.com")),
                ("RESET_QUEUE_CAPACITY", Some("8")),
            ],
            || {
                let config = SecurityConfig::from_env().unwrap();
                assert_eq!(config.auth_token_ttl, Some(Duration::minutes(15)));
                assert_eq!(config.reset_token_ttl, None);
                assert_eq!(config.refresh_token_ttl, Duration::seconds(60));
                assert_eq!(config.mail_from, "accounts@example.com");
                assert_eq!(config.reset_queue_capacity, 8);
            },
        );
    }

    #[test]
    fn test_rejects_non_positive_refresh_ttl() {
        temp_env::with_var("REFRESH_TOKEN_TTL_SECS", Some("0"), || {
            assert!(SecurityConfig::from_env().is_err());
        });
    }

    #[test]
    fn test_rejects_garbage() {
        temp_env::with_var("AUTH_TOKEN_TTL_MINUTES", Some("soon"), || {
            assert!(matches!(
                SecurityConfig::from_env(),
                Err(ConfigError::ParseError { .. })
            ));
        });
    }
}
