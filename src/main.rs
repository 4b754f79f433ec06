//! tabfit - Main Entry Point

use clap::Parser;
use tabfit::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tabfit=info".into()),
        )
        .init();

    run(Cli::parse())
}
