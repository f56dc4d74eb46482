//! relayq CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.is_serve() { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Err(e) = cli.execute().await {
        output::print_error(&e.to_string());
        std::process::exit(1);
    }
}
