//! Conversion between [`Job`] and its Redis hash representation.
//!
//! Timestamps are stored as RFC 3339 strings, except the lease deadline
//! which is kept in epoch milliseconds so scripts can compare it with the
//! active set scores.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};

use relayq_core::error::AppError;
use relayq_core::result::AppResult;
use relayq_core::types::id::JobId;
use relayq_entity::job::{Job, JobStatus};

/// Field/value pairs written when a job is first stored.
pub fn to_fields(job: &Job) -> AppResult<Vec<(&'static str, String)>> {
    let mut fields = vec![
        ("id", job.id.to_string()),
        ("queue", job.queue.clone()),
        ("name", job.name.clone()),
        ("payload", serde_json::to_string(&job.payload)?),
        ("status", job.status.as_str().to_string()),
        ("attempts_made", job.attempts_made.to_string()),
        ("max_attempts", job.max_attempts.to_string()),
        ("enqueued_at", job.enqueued_at.to_rfc3339()),
    ];

    if let Some(worker_id) = &job.worker_id {
        fields.push(("worker_id", worker_id.clone()));
    }
    if let Some(lease) = job.lease_expires_at {
        fields.push(("lease_expires_at", lease.timestamp_millis().to_string()));
    }
    if let Some(value) = &job.return_value {
        fields.push(("return_value", serde_json::to_string(value)?));
    }
    if let Some(reason) = &job.failure_reason {
        fields.push(("failure_reason", reason.clone()));
    }
    if let Some(error) = &job.last_error {
        fields.push(("last_error", error.clone()));
    }
    if let Some(started) = job.started_at {
        fields.push(("started_at", started.to_rfc3339()));
    }
    if let Some(finished) = job.finished_at {
        fields.push(("finished_at", finished.to_rfc3339()));
    }

    Ok(fields)
}

/// Rebuild a job from its hash. An empty map means the key does not exist.
pub fn from_fields(fields: &HashMap<String, String>) -> AppResult<Option<Job>> {
    if fields.is_empty() {
        return Ok(None);
    }

    let id = required(fields, "id")?;
    let id = JobId::from_str(id)
        .map_err(|e| AppError::internal(format!("corrupt job id '{id}': {e}")))?;
    let status = required(fields, "status")?;
    let status = JobStatus::from_str(status).map_err(AppError::internal)?;

    Ok(Some(Job {
        id,
        queue: required(fields, "queue")?.to_string(),
        name: required(fields, "name")?.to_string(),
        payload: serde_json::from_str(required(fields, "payload")?)?,
        status,
        attempts_made: number(fields, "attempts_made")?.unwrap_or(0),
        max_attempts: number(fields, "max_attempts")?.unwrap_or(1),
        worker_id: fields.get("worker_id").cloned(),
        lease_expires_at: number::<i64>(fields, "lease_expires_at")?
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        return_value: fields
            .get("return_value")
            .map(|raw| serde_json::from_str(raw))
            .transpose()?,
        failure_reason: fields.get("failure_reason").cloned(),
        last_error: fields.get("last_error").cloned(),
        enqueued_at: timestamp(fields, "enqueued_at")?.unwrap_or_else(Utc::now),
        started_at: timestamp(fields, "started_at")?,
        finished_at: timestamp(fields, "finished_at")?,
    }))
}

fn required<'a>(fields: &'a HashMap<String, String>, name: &str) -> AppResult<&'a str> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| AppError::internal(format!("job record is missing field '{name}'")))
}

fn number<T: FromStr>(fields: &HashMap<String, String>, name: &str) -> AppResult<Option<T>> {
    fields
        .get(name)
        .map(|raw| {
            raw.parse::<T>().map_err(|_| {
                AppError::internal(format!("job field '{name}' is not a number: {raw}"))
            })
        })
        .transpose()
}

fn timestamp(fields: &HashMap<String, String>, name: &str) -> AppResult<Option<DateTime<Utc>>> {
    fields
        .get(name)
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|e| {
                    AppError::internal(format!("job field '{name}' is not a timestamp: {e}"))
                })
        })
        .transpose()
}
