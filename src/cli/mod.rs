//! Command-line interface definition and dispatch for byok-compact.
//!
//! Uses [`clap`] for argument parsing with derive macros. Each subcommand is
//! routed to its handler; the offline dry run lives in the [`inspect`]
//! submodule.

mod inspect;

use anyhow::{Context, Result};
use byok_compact::compaction::{CompactionEngine, OutgoingRequest};
use byok_compact::config::Config;
use byok_compact::constants::CHAT_STREAM_PATH;
use byok_compact::output;
use byok_compact::provider::HttpTransport;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Top-level CLI structure for byok-compact.
#[derive(Parser)]
#[command(
    name = "byok-compact",
    about = "Compact long chat histories before they reach a BYOK proxy"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the byok-compact CLI.
///
/// The `///` doc comments on variants double as `--help` text rendered by clap.
#[derive(Subcommand)]
pub enum Commands {
    /// Compact a chat-stream request body and print the result
    Compact {
        /// Request body file (reads stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Endpoint path the request is sent to
        #[arg(long, default_value = CHAT_STREAM_PATH)]
        path: String,
    },
    /// Show where a request body would be cut, without summarizing
    Inspect {
        /// Request body file (reads stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Subcommands for the `config` command.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current config (API token redacted)
    Show,
}

/// Parses command-line arguments into a [`Cli`] struct.
pub fn parse() -> Cli {
    Cli::parse()
}

/// Dispatches the parsed CLI command to its handler.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Compact { input, path } => compact(input.as_deref(), path).await,
        Commands::Inspect { input } => inspect::handle_inspect(input.as_deref()).await,
        Commands::Config { action } => {
            let config = Config::load()?;
            match action {
                ConfigAction::Show => {
                    let path = Config::config_path()?;
                    println!("{} {}", "Config path:".bold(), path.display());
                    println!();
                    let toml_str = toml::to_string_pretty(&config.redacted())?;
                    println!("{}", toml_str);
                }
            }
            Ok(())
        }
    }
}

/// Runs the engine once over a request body.
///
/// The (possibly rewritten) body goes to stdout so the command can sit in a
/// pipe; the status line goes to stderr.
async fn compact(input: Option<&Path>, path: String) -> Result<()> {
    let body = read_body(input)?;
    let config = Config::load()?;
    let transport = HttpTransport::from_config(&config)?;
    let engine = CompactionEngine::new(config.policy_source()?, Arc::new(transport));

    let mut request = OutgoingRequest::post(path, body);
    let result = engine.attempt(&mut request).await;
    let mut stdout = std::io::stdout();
    stdout.write_all(request.body.as_bytes())?;
    stdout.flush()?;
    output::print_status(&result);
    Ok(())
}

/// Reads a request body from `input`, or from stdin when `None`.
pub(crate) fn read_body(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .context("Failed to read request body from stdin")?;
            Ok(body)
        }
    }
}
