use super::shutdown::ShutdownCoordinator;
use crate::errors::handlers::{method_not_allowed, not_found};
use crate::http::{create_cors_layer, parse_allowed_origins, security_headers};
use axum::{Router, middleware};
use core_config::{env_or_default, server::ServerConfig};
use std::future::Future;
use std::io;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Combine domain routers with documentation and cross-cutting layers.
///
/// - Swagger UI at `/swagger-ui`, spec at `/api-docs/openapi.json`
/// - `apis` nested under `/api`, `root` merged as is
/// - JSON 404 / 405 fallbacks
/// - tracing, security headers, CORS and compression layers
///
/// Domain routers apply their own state before being passed in.
///
/// `CORS_ALLOWED_ORIGIN` holds comma-separated origins and defaults to
/// `http://localhost:3000`.
pub fn create_router<T>(root: Router, apis: Router) -> io::Result<Router>
where
    T: OpenApi + 'static,
{
    let origins = env_or_default("CORS_ALLOWED_ORIGIN", "http://localhost:3000");
    let cors_layer = create_cors_layer(parse_allowed_origins(&origins)?);
    info!("CORS configured with allowed origins: {}", origins);

    let router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", T::openapi()))
        .merge(root)
        .nest("/api", apis)
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(middleware::from_fn(security_headers))
        .layer(cors_layer)
        .layer(CompressionLayer::new());

    Ok(router)
}

/// Serve `router` until SIGINT/SIGTERM, then run `cleanup` bounded by
/// `server_config.shutdown_timeout`.
///
/// ```ignore
/// let cleanup = async move {
///     worker.shutdown().await;
///     db.close().await.ok();
/// };
/// create_production_app(router, &config, cleanup).await?;
/// ```
pub async fn create_production_app<F>(
    router: Router,
    server_config: &ServerConfig,
    cleanup: F,
) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let coordinator = ShutdownCoordinator::default();
    let shutdown_timeout = server_config.shutdown_timeout;

    let listener = tokio::net::TcpListener::bind(server_config.address()).await?;
    info!("Server starting on {}", listener.local_addr()?);

    let mut cleanup_rx = coordinator.subscribe();
    let cleanup_handle = tokio::spawn(async move {
        let _ = cleanup_rx.recv().await;

        info!("Starting cleanup tasks (timeout: {:?})", shutdown_timeout);
        match tokio::time::timeout(shutdown_timeout, cleanup).await {
            Ok(()) => info!("Cleanup completed successfully"),
            Err(_) => tracing::warn!(
                "Cleanup exceeded timeout of {:?}, forcing shutdown",
                shutdown_timeout
            ),
        }
    });

    let signal = coordinator.clone();
    let serve_result = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move { signal.wait_for_signal().await })
        .await
        .inspect_err(|e| tracing::error!("Server encountered an error: {:?}", e));

    // Serve can fail before any signal; make sure cleanup still runs.
    coordinator.shutdown();
    cleanup_handle.await.ok();

    serve_result
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
    };
    use tower::ServiceExt;

    #[derive(OpenApi)]
    #[openapi()]
    struct EmptyDoc;

    fn router() -> Router {
        temp_env::with_var_unset("CORS_ALLOWED_ORIGIN", || {
            create_router::<EmptyDoc>(
                Router::new().route("/", get(|| async { "home" })),
                Router::new().route("/ping", get(|| async { "pong" })),
            )
            .unwrap()
        })
    }

    async fn status_for(method: &str, uri: &str) -> StatusCode {
        router()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_routes_are_mounted() {
        assert_eq!(status_for("GET", "/").await, StatusCode::OK);
        assert_eq!(status_for("GET", "/api/ping").await, StatusCode::OK);
        assert_eq!(status_for("GET", "/api-docs/openapi.json").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_fallbacks() {
        assert_eq!(status_for("GET", "/missing").await, StatusCode::NOT_FOUND);
        assert_eq!(
            status_for("DELETE", "/api/ping").await,
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[test]
    fn test_invalid_cors_origin_is_an_error() {
        temp_env::with_var("CORS_ALLOWED_ORIGIN", Some(" , "), || {
            assert!(create_router::<EmptyDoc>(Router::new(), Router::new()).is_err());
        });
    }
}
