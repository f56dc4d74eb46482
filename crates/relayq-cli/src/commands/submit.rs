//! Enqueue a message from the command line.

use clap::Args;
use serde_json::json;

use relayq_core::config::AppConfig;
use relayq_core::error::AppError;
use relayq_worker::jobs::submit_message;

use crate::output::{self, OutputFormat};

/// Arguments for the submit command
#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Message text
    pub text: String,
}

/// Execute the submit command
pub async fn execute(
    args: &SubmitArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let queue = super::open_queue(config).await?;
    let job_id = submit_message(&queue, Some(&args.text)).await?;

    match format {
        OutputFormat::Table => {
            output::print_success("Message added to queue");
            output::print_kv("Job", &job_id.to_string());
            output::print_kv("Queue", queue.name());
        }
        OutputFormat::Json => output::print_json(&json!({
            "status": "success",
            "message": "Message added to queue",
            "jobId": job_id,
        })),
    }
    Ok(())
}
