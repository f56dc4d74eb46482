//! Queue status command.

use clap::Args;
use tabled::Tabled;

use relayq_core::config::AppConfig;
use relayq_core::error::AppError;
use relayq_store::JobStore;

use crate::output::{self, OutputFormat};

/// Arguments for the status command
#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Queue to inspect (defaults to queue.name)
    #[arg(short, long)]
    pub queue: Option<String>,
}

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Jobs")]
    jobs: u64,
}

/// Execute the status command
pub async fn execute(
    args: &StatusArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let queue = super::open_queue(config).await?;
    let name = args.queue.as_deref().unwrap_or(queue.name());
    let counts = queue.store().counts(name).await?;

    let rows = [
        CountRow { status: "waiting", jobs: counts.waiting },
        CountRow { status: "active", jobs: counts.active },
        CountRow { status: "completed", jobs: counts.completed },
        CountRow { status: "failed", jobs: counts.failed },
    ];

    if format == OutputFormat::Table {
        println!("Queue '{name}':");
    }
    output::print_rows(&counts, &rows, format);
    Ok(())
}
