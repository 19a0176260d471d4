//! Readiness check backed by the configured storage.

use crate::state::AppState;
use axum::{extract::State, response::IntoResponse};
use axum_helpers::server::{HealthCheckFuture, run_health_checks};

/// Readiness check endpoint. Pings PostgreSQL when it backs the users domain;
/// in-memory storage is always ready.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "All dependencies are reachable"),
        (status = 503, description = "At least one dependency is down")
    )
)]
pub async fn ready_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut checks: Vec<(&str, HealthCheckFuture<'_>)> = Vec::new();

    if let Some(db) = &state.db {
        checks.push((
            "database",
            Box::pin(async move {
                database::postgres::check_health(db)
                    .await
                    .map_err(|e| format!("Database ping failed: {}", e))
            }),
        ));
    }

    run_health_checks(checks).await
}
