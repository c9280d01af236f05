//! REST API server module
//!
//! Exposes job submission, inspection and a live event stream over HTTP so
//! that UIs in other processes can follow transfers.

use crate::{JobController, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

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
/// ## Jobs
/// - `GET /jobs` - List all jobs
/// - `POST /jobs` - Submit a URL
/// - `GET /jobs/:id` - Get single job
/// - `DELETE /jobs/:id` - Forget a finished job
/// - `POST /jobs/:id/complete` - Deliver a completion signal
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
/// - `GET /events` - Server-sent events stream
/// - `POST /shutdown` - Graceful shutdown
pub fn create_router(controller: Arc<JobController>) -> Router {
    let config = controller.get_config();
    let state = AppState::new(controller);

    let router = Router::new()
        // Jobs
        .route("/jobs", get(routes::list_jobs).post(routes::submit_job))
        .route("/jobs/:id", get(routes::get_job).delete(routes::forget_job))
        .route("/jobs/:id/complete", post(routes::complete_job))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream))
        .route("/shutdown", post(routes::shutdown));

    // Swagger UI serves its own copy of the document under /api-docs
    let router = if config.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.api.cors_enabled {
        router.layer(build_cors_layer(&config.api.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin; otherwise only the listed
/// origins that parse as header values are allowed.
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
/// Runs until the listener fails or the task is aborted.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use transfer_tracker::{Config, JobController, NoOpObserver};
/// # use transfer_tracker::backend::TransferBackend;
///
/// # async fn example(backend: Arc<dyn TransferBackend>) -> Result<(), Box<dyn std::error::Error>> {
/// let controller = Arc::new(JobController::new(
///     Config::default(),
///     backend,
///     Arc::new(NoOpObserver),
/// )?);
///
/// // Start API server (blocks until shutdown)
/// transfer_tracker::api::start_api_server(controller).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(controller: Arc<JobController>) -> Result<()> {
    let bind_address = controller.get_config().api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(controller);

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
