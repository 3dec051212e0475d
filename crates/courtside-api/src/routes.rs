//! Router setup with all API routes and middleware.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use courtside_core::config::CourtsideConfig;
use courtside_core::error::CourtsideError;

use crate::handlers;
use crate::rate_limit::rate_limit_middleware;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Browser clients on the API port and the dev server next to it.
    let port = state.config.general.port;
    let origins = [port, port.saturating_add(1)]
        .iter()
        .flat_map(|p| [format!("http://127.0.0.1:{}", p), format!("http://localhost:{}", p)])
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(handlers::USER_ID_HEADER),
            HeaderName::from_static(handlers::REQUEST_ID_HEADER),
        ]);

    // Routes that reach the generative backend.
    let model_routes = Router::new()
        .route("/flows/{name}", post(handlers::run_flow))
        .route("/plan-weekend", post(handlers::plan_weekend))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/flows", get(handlers::list_flows))
        .route("/tools/{name}", get(handlers::run_tool))
        .merge(model_routes)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on 127.0.0.1 at the configured port.
pub async fn start_server(config: &CourtsideConfig, state: AppState) -> Result<(), CourtsideError> {
    let addr = format!("127.0.0.1:{}", config.general.port);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CourtsideError::Api(format!("Failed to bind {}: {}", addr, e)))?;
    info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| CourtsideError::Api(format!("Server error: {}", e)))
}
