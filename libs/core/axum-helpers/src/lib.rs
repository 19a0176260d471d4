//! # Axum Helpers
//!
//! Shared building blocks for the HTTP services in this workspace.
//!
//! ## Modules
//!
//! - **[`auth`]**: HS256 JWT issuing and verification
//! - **[`server`]**: Router assembly, health checks, graceful shutdown
//! - **[`http`]**: CORS and security header middleware
//! - **[`errors`]**: `ErrorResponse` / `FieldError` bodies and OpenAPI responses
//! - **[`extractors`]**: Bearer parsing, UUID path and JSON payload extractors
//!
//! ## Quick Start
//!
//! ```ignore
//! use axum::Router;
//! use axum_helpers::server::{create_production_app, create_router};
//! use core_config::server::ServerConfig;
//! use utoipa::OpenApi;
//!
//! #[derive(OpenApi)]
//! #[openapi(paths())]
//! struct ApiDoc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = create_router::<ApiDoc>(Router::new(), Router::new())?;
//!     create_production_app(router, &ServerConfig::default(), async {}).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod errors;
pub mod extractors;
pub mod http;
pub mod server;

pub use auth::{JwtAuth, JwtClaims, JwtConfig, JwtError};

pub use server::{
    HealthCheckFuture, HealthResponse, ShutdownCoordinator, create_production_app, create_router,
    health_router, run_health_checks, shutdown_signal,
};

pub use http::{create_cors_layer, security_headers};

pub use errors::{AppError, ErrorResponse, FieldError};

pub use extractors::{JsonPayload, UuidPath, ValidatedJson, ValidationContext};
