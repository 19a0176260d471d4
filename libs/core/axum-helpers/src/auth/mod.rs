//! JWT issuing and verification for the web client.
//!
//! ```ignore
//! use axum_helpers::auth::{JwtAuth, JwtConfig};
//! use core_config::FromEnv;
//!
//! let jwt = JwtAuth::new(&JwtConfig::from_env()?);
//! let token = jwt.create_access_token(&user_id, &email, &roles)?;
//! let claims = jwt.verify_token(&token)?;
//! ```
//!
//! Refresh tokens are opaque and persisted by the domain, so this module only
//! deals with short-lived access tokens.

pub mod config;
pub mod jwt;

pub use config::JwtConfig;
pub use jwt::{DEFAULT_ACCESS_TOKEN_TTL, JwtAuth, JwtClaims, JwtError};
