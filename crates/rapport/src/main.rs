//! Rapport CLI binary.

use anyhow::Result;
use rapport::cli::Cli;
use tracing_subscriber::EnvFilter;

/// Main entry point for the rapport CLI.
///
/// Uses tokio's current_thread runtime; every command is a short sequence of
/// file operations.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Controlled via RUST_LOG, e.g. RUST_LOG=rapport=debug
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rapport=info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Starting rapport CLI");

    let cli = Cli::parse_args();
    cli.execute().await?;

    tracing::debug!("Rapport CLI completed successfully");
    Ok(())
}
