//! Job inspection command.

use clap::Args;

use relayq_core::config::AppConfig;
use relayq_core::error::AppError;
use relayq_core::types::id::JobId;

use crate::output::{self, OutputFormat};

/// Arguments for the job command
#[derive(Debug, Args)]
pub struct JobArgs {
    /// Job id
    pub id: String,
}

/// Execute the job command
pub async fn execute(
    args: &JobArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let job_id: JobId = args
        .id
        .parse()
        .map_err(|_| AppError::validation(format!("Invalid job id '{}'", args.id)))?;

    let queue = super::open_queue(config).await?;
    let job = queue
        .get(job_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Job {job_id} not found")))?;

    match format {
        OutputFormat::Json => output::print_json(&job),
        OutputFormat::Table => {
            println!("Job {}:", job.id);
            output::print_kv("Queue", &job.queue);
            output::print_kv("Name", &job.name);
            output::print_kv("Status", job.status.as_str());
            output::print_kv(
                "Attempts",
                &format!("{}/{}", job.attempts_made, job.max_attempts),
            );
            output::print_kv("Payload", &job.payload.to_string());
            output::print_kv("Enqueued", &job.enqueued_at.to_rfc3339());
            if let Some(worker) = &job.worker_id {
                output::print_kv("Worker", worker);
            }
            if let Some(value) = &job.return_value {
                output::print_kv("Result", &value.to_string());
            }
            if let Some(reason) = &job.failure_reason {
                output::print_kv("Failure", reason);
            }
            if let Some(error) = &job.last_error {
                output::print_kv("Last error", error);
            }
            if let Some(ms) = job.processing_time_ms() {
                output::print_kv("Processing", &format!("{ms} ms"));
            }
        }
    }
    Ok(())
}
