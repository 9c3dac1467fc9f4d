//! Offline dry run of the compaction planner.
//!
//! `byok-compact inspect` evaluates a request body against the active policy
//! and prints the sizes, the trigger decision and where the history would be
//! cut. It never calls the summarizer.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use byok_compact::compaction::{evaluate, plan, ChatPayload};
use byok_compact::config::Config;
use byok_compact::exchange::Exchange;
use byok_compact::tokens::{format_number, format_usage, tokens_for_chars};

/// Evaluates a request body and prints the planned cut.
pub(crate) async fn handle_inspect(input: Option<&Path>) -> Result<()> {
    let body = super::read_body(input)?;
    let config = Config::load()?;
    let policy = config
        .policy_source()?
        .fetch()
        .await?
        .context("No history_summary policy configured")?;
    let payload = ChatPayload::parse(&body)?;

    let history = Exchange::decode_history(payload.history());
    let decision = evaluate(&policy, &history, payload.pending_message(), payload.model());

    println!(
        "{} {} exchanges (key: {})",
        "History:".bold(),
        history.len(),
        payload.history_key()
    );
    println!(
        "{} {} chars [{}]",
        "Size:".bold(),
        format_usage(decision.total_chars, decision.threshold_chars),
        decision.strategy.as_str()
    );
    if decision.context_window_tokens > 0 {
        println!(
            "{} {} tokens",
            "Context:".bold(),
            format_usage(
                tokens_for_chars(decision.total_chars),
                decision.context_window_tokens
            )
        );
    }
    println!(
        "{} {} chars",
        "Tail budget:".bold(),
        format_number(decision.tail_budget_chars)
    );
    println!();

    match plan(&policy, &payload) {
        Ok(cut) => {
            println!(
                "{} drop {} exchanges, keep {} starting at {}",
                "would compact:".green().bold(),
                cut.head().len(),
                cut.tail().len(),
                cut.boundary_request_id.cyan()
            );
        }
        Err(skip) => {
            println!("{} {}", "no compaction:".dimmed(), skip);
        }
    }
    Ok(())
}
