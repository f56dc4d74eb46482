//! CLI command definitions and dispatch.

pub mod job;
pub mod serve;
pub mod status;
pub mod submit;

use clap::{Parser, Subcommand};

use relayq_core::config::AppConfig;
use relayq_core::error::AppError;
use relayq_store::StoreManager;
use relayq_worker::JobQueue;

use crate::output::{self, OutputFormat};

/// relayq: message queue broker with a bounded worker pool
#[derive(Debug, Parser)]
#[command(name = "relayq", version, about, long_about = None)]
pub struct Cli {
    /// Configuration overlay to load from config/{env}.toml
    #[arg(long, global = true, env = "RELAYQ_ENV", default_value = "development")]
    pub config_env: String,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP server together with the worker pool
    Serve(serve::ServeArgs),
    /// Enqueue a message
    Submit(submit::SubmitArgs),
    /// Show job counts of a queue
    Status(status::StatusArgs),
    /// Show one job
    Job(job::JobArgs),
}

impl Cli {
    /// Whether the long-running server was requested
    pub fn is_serve(&self) -> bool {
        matches!(self.command, Commands::Serve(_))
    }

    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = AppConfig::load(&self.config_env)?;
        match &self.command {
            Commands::Serve(args) => serve::execute(args, config).await,
            Commands::Submit(args) => submit::execute(args, &config, self.format).await,
            Commands::Status(args) => status::execute(args, &config, self.format).await,
            Commands::Job(args) => job::execute(args, &config, self.format).await,
        }
    }
}

/// Helper: open the configured store and a handle to the main queue
pub async fn open_queue(config: &AppConfig) -> Result<JobQueue, AppError> {
    if config.store.provider == "memory" {
        output::print_warning(
            "store.provider is 'memory': this process sees only its own jobs",
        );
    }
    let store = StoreManager::new(&config.store).await?;
    Ok(JobQueue::new(store, &config.queue, config.store.retry.clone()))
}
