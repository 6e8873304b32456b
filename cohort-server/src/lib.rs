//! # Cohort Server
//!
//! HTTP surface for enrollment-fee checkout, staff admission review, and
//! lecture progress. State lives in PostgreSQL (or an in-memory store for
//! development); identities come from sessions issued by an external auth
//! service.

pub mod auth;
pub mod handlers;
pub mod infra;
pub mod routes;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

pub use infra::app_state::AppState;

/// Full application router: versioned API, health probe, CORS, and request
/// tracing.
pub fn create_app(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors_layer = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(routes::create_api_router(state.clone()))
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
