//! Axum REST API handlers

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    body::Bytes,
    routing::{get, post},
    extract::{State, DefaultBodyLimit, rejection::BytesRejection},
    http::StatusCode,
    response::Json,
};
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::engine::AgeTransformer;
use crate::error::ReageError;
use crate::service::ReagingService;

use super::dto::*;

/// Application state shared across handlers
pub struct AppState<T: AgeTransformer> {
    pub service: Arc<ReagingService<T>>,
    pub start_time: Instant,
}

/// Create the REST API router
pub fn create_rest_router<T: AgeTransformer>(state: Arc<AppState<T>>, body_limit: usize) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/process-image", post(process_image_handler::<T>))
        .route("/health", get(health_handler::<T>))
        // Middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness check
async fn index_handler() -> &'static str {
    "Server is running"
}

/// Re-age the face in a submitted image.
///
/// The body is read and parsed by hand rather than with the `Json` extractor
/// so that oversized or malformed bodies and missing fields report like every
/// other failure.
async fn process_image_handler<T: AgeTransformer>(
    State(state): State<Arc<AppState<T>>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ProcessImageResponse>, (StatusCode, Json<ErrorResponse>)> {
    let body = body
        .map_err(|e| ReageError::invalid_request(e.body_text()))
        .map_err(internal_error)?;

    let request: ProcessImageRequest = serde_json::from_slice(&body)
        .map_err(|e| ReageError::invalid_request(e.to_string()))
        .map_err(internal_error)?;

    debug!(
        "Received data: source_age={}, target_age={}",
        request.source_age, request.target_age
    );

    let result = state.service.process(request).await.map_err(internal_error)?;

    Ok(Json(ProcessImageResponse {
        processed_image: result.processed_image,
    }))
}

/// Health check
async fn health_handler<T: AgeTransformer>(
    State(state): State<Arc<AppState<T>>>,
) -> Json<HealthResponse> {
    let health = state.service.health();

    Json(HealthResponse {
        healthy: health.healthy,
        version: health.version,
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

fn internal_error(e: ReageError) -> (StatusCode, Json<ErrorResponse>) {
    error!("Error processing image: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse::new(&e.to_string())))
}
