//! Users Domain
//!
//! Accounts, authentication and user administration.
//!
//! # Features
//!
//! - Registration with aggregated field validation
//! - Per-device opaque tokens for the mobile app
//! - JWT access tokens with single-use refresh tokens for the web client
//! - Password change and mailed reset tokens
//! - Admin listing, soft delete, restore and hard delete
//! - Domain events and hub notifications after every write
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints, bearer extractors
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Command/    │  ← One handler per command or query,
//! │ Query bus   │    reset requests go through a worker
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │  Services   │  ← Business rules, hashing, tokens, events
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Data access (traits, in-memory and Postgres)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Domain    │  ← User aggregate, tokens, value objects
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use axum_helpers::{JwtAuth, JwtConfig};
//! use domain_users::{Repositories, SecurityConfig, UsersDeps, UsersModule};
//!
//! # async fn run() -> domain_users::UserResult<()> {
//! let jwt = JwtAuth::new(&JwtConfig::new("change-me-to-a-secret-of-32-chars!!"));
//! let deps = UsersDeps::new(Repositories::in_memory(), jwt, SecurityConfig::default());
//! let module = UsersModule::build(deps)?;
//!
//! let api = module.api_router();
//! // ... serve, then
//! module.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod mailer;
pub mod models;
pub mod module;
pub mod notifications;
mod postgres_repository_impl;
pub mod repository;
pub mod security;
pub mod services;
pub mod tokens;
pub mod user;
pub mod value_objects;

#[cfg(test)]
mod testing;

pub use auth::{AdminUser, CredentialResolver, CurrentUser};
pub use config::SecurityConfig;
pub use error::{UserError, UserResult};
pub use handlers::ApiDoc;
pub use mailer::{InMemoryMailer, LoggingMailer, MailMessage, Mailer};
pub use module::{UsersDeps, UsersModule, UsersState};
pub use notifications::{BroadcastNotifier, LoggingNotifier, UpdateMessage, UpdateNotifier};
pub use postgres_repository_impl::{
    PostgresAuthTokenRepository, PostgresRefreshTokenRepository,
    PostgresResetPasswordTokenRepository, PostgresUserRepository,
};
pub use repository::{
    InMemoryUserRepository, Repositories, UserListCriteria, UserOrder, UserRepository,
};
pub use security::{Argon2PasswordHasher, Clock, PasswordHasher, SystemClock, TokenGenerator};
pub use user::User;
pub use value_objects::{Email, EntityId, UserRole};
