//! REST API server module
//!
//! Provides an OpenAPI 3.1 compliant REST API for triggering extraction
//! runs, monitoring sessions and credentials, and querying harvested items.

use crate::{Config, Result, VideoHarvester};
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Extraction
/// - `POST /extraction/run` - Start a single-query run
/// - `POST /extraction/comprehensive` - Start a comprehensive run
/// - `POST /extraction/targeted` - Start a targeted run
/// - `POST /extraction/stop` - Request a cooperative stop
/// - `GET /extraction/status` - Current status snapshot
/// - `GET /extraction/sessions/:id` - Fetch one session
///
/// ## Harvested data
/// - `GET /videos` - Query the harvested video cache
/// - `GET /videos/channels` - Channel aggregates
///
/// ## System
/// - `GET /credentials` - Credential pool summary (hashed, never raw keys)
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
/// - `GET /events` - Server-sent events stream
pub fn create_router(harvester: Arc<VideoHarvester>, config: Arc<Config>) -> Router {
    let state = AppState::new(harvester, config.clone());

    let router = Router::new()
        // Extraction
        .route("/extraction/run", post(routes::start_single_run))
        .route(
            "/extraction/comprehensive",
            post(routes::start_comprehensive_run),
        )
        .route("/extraction/targeted", post(routes::start_targeted_run))
        .route("/extraction/stop", post(routes::stop_run))
        .route("/extraction/status", get(routes::extraction_status))
        .route("/extraction/sessions/:id", get(routes::get_session))
        // Harvested data
        .route("/videos", get(routes::list_videos))
        .route("/videos/channels", get(routes::top_channels))
        // System
        .route("/credentials", get(routes::credential_status))
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream));

    // Merge Swagger UI routes if enabled in config (before applying state)
    let router = if config.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api/v1/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state);

    // Request tracing for every route
    let router = router.layer(tower_http::trace::TraceLayer::new_for_http());

    // Apply authentication middleware if an API key is configured
    let router = if config.api.api_key.is_some() {
        router.layer(middleware::from_fn_with_state(
            config.api.api_key.clone(),
            auth::require_api_key,
        ))
    } else {
        router
    };

    // Apply CORS middleware if enabled in config
    if config.api.cors_enabled {
        let cors = build_cors_layer(&config.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins ("*" allows any origin).
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Creates a TCP listener, binds it to the configured address, and serves the
/// API router until the server is shut down.
pub async fn start_api_server(harvester: Arc<VideoHarvester>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(harvester, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
