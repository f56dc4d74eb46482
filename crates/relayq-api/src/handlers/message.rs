//! Message submission handler.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use validator::Validate;

use relayq_core::error::AppError;

use crate::dto::request::SubmitMessageRequest;
use crate::dto::response::MessageAccepted;
use crate::error::ApiError;
use crate::state::AppState;

/// POST /message
///
/// Enqueues the message and answers without waiting for it to be processed.
pub async fn submit_message(
    State(state): State<AppState>,
    payload: Result<Json<SubmitMessageRequest>, JsonRejection>,
) -> Result<Json<MessageAccepted>, ApiError> {
    let Json(req) = payload?;
    req.validate()
        .map_err(|e| AppError::validation(format!("Invalid request: {e}")))?;

    let job_id = state.system.submit_message(req.message.as_deref()).await?;
    tracing::debug!(job_id = %job_id, "Message accepted");

    Ok(Json(MessageAccepted::new(job_id)))
}
