use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};
use tracing::warn;

use crate::AppState;

/// Liveness plus a database ping when PostgreSQL backs the store.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    if let Some(db) = state.postgres.as_ref()
        && let Err(err) = db.ping().await
    {
        warn!(error = %err, "health check database ping failed");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "database": "unreachable" })),
        );
    }

    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
