use axum_helpers::server::{create_production_app, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_users::{Repositories, UsersDeps, UsersModule};
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output (before any fallible operations)
    install_color_eyre();

    // Load configuration from environment variables
    let config = Config::from_env()?;

    // Initialize tracing with ErrorLayer for span trace capture
    init_tracing(&config.environment);

    let db = match config.database.clone() {
        Some(database) => Some(
            database::postgres::connect_from_config_with_retry(database, None)
                .await
                .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))?,
        ),
        None => {
            info!("STORAGE=memory, users are kept in process memory");
            None
        }
    };

    let repositories = match &db {
        Some(db) => Repositories::postgres(db.clone()),
        None => Repositories::in_memory(),
    };

    let jwt = axum_helpers::JwtAuth::new(&config.jwt);
    let users = UsersModule::build(UsersDeps::new(repositories, jwt, config.security.clone()))
        .map_err(|e| eyre::eyre!("Failed to build users module: {}", e))?;

    // create_router adds docs/middleware and nests the API under /api
    let router = axum_helpers::create_router::<openapi::ApiDoc>(
        api::root_routes(&users),
        api::routes(&users),
    )?;

    // - /health: liveness check with app name/version
    // - /ready: readiness check against the configured storage
    let state = AppState { config, db };
    let app = router
        .merge(health_router(state.config.app))
        .merge(api::ready_router(state.clone()));

    info!(
        storage = ?state.config.storage,
        "Starting accounts API with graceful shutdown"
    );

    let server = state.config.server.clone();
    create_production_app(app, &server, async move {
        info!("Shutting down: draining reset-password queue");
        users.shutdown().await;

        if let Some(db) = state.db {
            match db.close().await {
                Ok(_) => info!("PostgreSQL connection closed successfully"),
                Err(e) => tracing::error!("Error closing PostgreSQL: {}", e),
            }
        }
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Accounts API shutdown complete");
    Ok(())
}
