//! Health check handler.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use relayq_store::JobStore;

use crate::dto::response::{ApiResponse, HealthResponse};
use crate::state::AppState;

/// GET /health
///
/// Answers 503 when the job store cannot be reached.
pub async fn health(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    let reachable = match state.system.queue().store().health_check().await {
        Ok(ok) => ok,
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            false
        }
    };

    let (status, label) = if reachable {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: label.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        store: if reachable { "connected" } else { "unreachable" }.to_string(),
        worker: state.system.pool_metrics(),
    };

    (status, Json(ApiResponse::ok(body)))
}
