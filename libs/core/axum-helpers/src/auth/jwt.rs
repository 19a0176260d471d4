use super::config::JwtConfig;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Access token lifetime when `JWT_TTL_SECS` is not set.
pub const DEFAULT_ACCESS_TOKEN_TTL: i64 = 3600;

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,        // Subject (user ID)
    pub email: String,      // User email
    pub roles: Vec<String>, // User roles
    pub exp: i64,           // Expiration time
    pub iat: i64,           // Issued at
    pub jti: String,        // JWT ID
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),

    #[error("Invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

/// Stateless HS256 access tokens.
#[derive(Clone)]
pub struct JwtAuth {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl JwtAuth {
    pub fn new(config: &JwtConfig) -> Self {
        tracing::info!(ttl_secs = config.ttl_secs, "JWT auth initialized");
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl_secs: config.ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Create a signed access token for the given subject.
    pub fn create_access_token(
        &self,
        user_id: &str,
        email: &str,
        roles: &[String],
    ) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            roles: roles.to_vec(),
            exp: (now + Duration::seconds(self.ttl_secs)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::now_v7().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(JwtError::Encode)
    }

    /// Verify signature and expiry, returning the decoded claims.
    pub fn verify_token(&self, token: &str) -> Result<JwtClaims, JwtError> {
        decode::<JwtClaims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(JwtError::Invalid)
    }
}

impl std::fmt::Debug for JwtAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuth")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}
