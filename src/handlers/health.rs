// handlers/health.rs - GET /health

use axum::{extract::State, http::StatusCode, response::{IntoResponse, Json}};
use serde_json::json;

use crate::state::AppState;

/// GET /health - Liveness plus a ping of the tenant store
pub async fn get(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.stores.tenants.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
