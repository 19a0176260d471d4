//! JWT configuration loaded through `core_config::FromEnv`.

use core_config::{ConfigError, FromEnv, env_parse, env_required};

use super::jwt::DEFAULT_ACCESS_TOKEN_TTL;

/// JWT authentication configuration.
///
/// Loaded from environment variables:
/// - `JWT_SECRET` (required) - at least 32 characters
/// - `JWT_TTL_SECS` (default: 3600) - access token lifetime
#[derive(Clone, Debug)]
pub struct JwtConfig {
    /// HMAC signing secret
    pub secret: String,
    /// Access token lifetime in seconds
    pub ttl_secs: i64,
}

impl JwtConfig {
    /// Create a config with the default TTL.
    ///
    /// # Panics
    /// Panics if the secret is less than 32 characters.
    pub fn new(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        assert!(
            secret.len() >= 32,
            "JWT secret must be at least 32 characters"
        );
        Self {
            secret,
            ttl_secs: DEFAULT_ACCESS_TOKEN_TTL,
        }
    }

    pub fn with_ttl_secs(mut self, ttl_secs: i64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }
}

impl FromEnv for JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret = env_required("JWT_SECRET")?;

        if secret.len() < 32 {
            return Err(ConfigError::ParseError {
                key: "JWT_SECRET".to_string(),
                details: format!(
                    "must be at least 32 characters (got {}). Generate one with: openssl rand -base64 32",
                    secret.len()
                ),
            });
        }

        let ttl_secs: i64 = env_parse("JWT_TTL_SECS", "3600")?;
        if ttl_secs <= 0 {
            return Err(ConfigError::ParseError {
                key: "JWT_TTL_SECS".to_string(),
                details: "must be a positive number of seconds".to_string(),
            });
        }

        Ok(Self { secret, ttl_secs })
    }
}
