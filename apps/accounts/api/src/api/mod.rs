use axum::{Router, routing::get};
use domain_users::UsersModule;

pub mod health;

/// Routes nested under `/api` by `create_router`.
pub fn routes(users: &UsersModule) -> Router {
    users.api_router()
}

/// Routes mounted at the root, next to the docs.
pub fn root_routes(users: &UsersModule) -> Router {
    users.home_router()
}

/// Creates a router with the /ready endpoint that performs actual health checks.
///
/// This router has state applied and can be merged with the stateless app router
/// from `create_router`.
pub fn ready_router(state: crate::state::AppState) -> Router {
    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(state)
}
