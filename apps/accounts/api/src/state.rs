//! Shared application state.
//!
//! The users domain carries its own state inside its routers; this one only
//! holds what the app-level endpoints need.

use database::postgres::DatabaseConnection;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded from environment variables
    pub config: crate::config::Config,
    /// PostgreSQL pool, absent with in-memory storage
    pub db: Option<DatabaseConnection>,
}
