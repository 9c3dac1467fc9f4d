//! Entry point for byok-compact.
//!
//! This binary loads environment variables, sets up logging, parses CLI
//! arguments via [`cli`], and dispatches to the appropriate subcommand handler.

mod cli;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Runs the byok-compact CLI.
///
/// Loads `.env` files (silently ignored if absent), installs a stderr log
/// subscriber filtered by `RUST_LOG` (default `warn`), then dispatches the
/// chosen subcommand via [`cli::run`].
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();
    let cli = cli::parse();
    cli::run(cli).await
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
