use axum_helpers::JwtConfig;
use core_config::{AppInfo, ConfigError, FromEnv, app_info, env_or_default, server::ServerConfig};
use database::postgres::PostgresConfig;
use domain_users::SecurityConfig;

pub use core_config::Environment;

/// Backing store of the users domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Storage {
    Postgres,
    Memory,
}

impl FromEnv for Storage {
    /// STORAGE: `postgres` (default) or `memory`
    fn from_env() -> Result<Self, ConfigError> {
        match env_or_default("STORAGE", "postgres").to_ascii_lowercase().as_str() {
            "postgres" => Ok(Storage::Postgres),
            "memory" => Ok(Storage::Memory),
            other => Err(ConfigError::ParseError {
                key: "STORAGE".to_string(),
                details: format!("expected 'postgres' or 'memory', got '{other}'"),
            }),
        }
    }
}

/// Application-specific configuration
/// Composes shared config components from the `config` library
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub security: SecurityConfig,
    pub storage: Storage,
    /// Only read when `storage` is Postgres.
    pub database: Option<PostgresConfig>,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let server = ServerConfig::from_env()?; // Uses defaults: HOST=0.0.0.0, PORT=8080
        let jwt = JwtConfig::from_env()?; // Required - will fail if JWT_SECRET is not set
        let security = SecurityConfig::from_env()?;
        let storage = Storage::from_env()?;

        let database = match storage {
            Storage::Postgres => Some(PostgresConfig::from_env()?),
            Storage::Memory => None,
        };

        Ok(Self {
            app: app_info!(),
            environment,
            server,
            jwt,
            security,
            storage,
            database,
        })
    }
}
