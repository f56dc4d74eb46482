//! Job lookup handler.

use axum::Json;
use axum::extract::{Path, State};

use relayq_core::error::AppError;
use relayq_core::types::id::JobId;

use crate::dto::response::{ApiResponse, JobResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// GET /jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<JobResponse>>, ApiError> {
    let job_id: JobId = id
        .parse()
        .map_err(|_| AppError::validation(format!("Invalid job id '{id}'")))?;

    let job = state
        .system
        .queue()
        .get(job_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Job {job_id} not found")))?;

    Ok(Json(ApiResponse::ok(JobResponse::from(job))))
}
