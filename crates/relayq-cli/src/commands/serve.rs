//! Start the relayq server.

use clap::Args;

use relayq_core::config::AppConfig;
use relayq_core::error::AppError;

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Override the server port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Override the server host
    #[arg(long)]
    pub host: Option<String>,

    /// Override the worker concurrency
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Accept messages without processing them in this process
    #[arg(long)]
    pub no_worker: bool,
}

/// Execute the serve command
pub async fn execute(args: &ServeArgs, mut config: AppConfig) -> Result<(), AppError> {
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }
    if let Some(concurrency) = args.concurrency {
        config.worker.concurrency = concurrency;
    }
    if args.no_worker {
        config.worker.enabled = false;
    }
    config.validate()?;

    relayq_api::run_server(config).await
}
