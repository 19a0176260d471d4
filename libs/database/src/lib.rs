//! Database connectors and utilities.
//!
//! # Features
//!
//! - `postgres` (default) - PostgreSQL through SeaORM
//! - `config` - `core_config::FromEnv` for [`postgres::PostgresConfig`]
//!
//! # Example
//!
//! ```ignore
//! use database::postgres::{self, PostgresConfig};
//! use core_config::FromEnv;
//!
//! let db = postgres::connect_from_config_with_retry(PostgresConfig::from_env()?, None).await?;
//! postgres::check_health(&db).await?;
//! ```
//!
//! Schema management is left to the deployment; connectors never run DDL.

pub mod common;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use common::{DatabaseError, DatabaseResult};
