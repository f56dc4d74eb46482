//! Queue inspection handler.

use axum::Json;
use axum::extract::{Path, State};

use relayq_store::JobStore;

use crate::dto::response::{ApiResponse, QueueCountsResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// GET /queues/{name}/counts
pub async fn queue_counts(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<QueueCountsResponse>>, ApiError> {
    let counts = state.system.queue().store().counts(&name).await?;
    Ok(Json(ApiResponse::ok(QueueCountsResponse {
        queue: name,
        counts,
    })))
}
