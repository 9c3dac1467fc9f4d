//! Produces the natural-language summary of a dropped history head.
//!
//! Two modes. Full mode summarizes the whole head. Rolling mode feeds the
//! previous summary plus only the exchanges dropped since, and asks the
//! model to update it.

use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::cache::SummaryRecord;
use super::error::SummaryError;
use crate::config::HistorySummaryPolicy;
use crate::constants::{
    BYOK_MODEL_HEADER, BYOK_MODE_HEADER, CHAT_STREAM_ENDPOINT, NDJSON_CONTENT_TYPE,
    PROXY_INTERNAL_HEADER, PROXY_INTERNAL_HISTORY_SUMMARY, ROLLING_PROMPT_SUFFIX,
};
use crate::exchange::{EstimateSize, Exchange};
use crate::provider::{collect_text_deltas, ModelTransport, TransportRequest};

/// Which kind of summarization call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryMode {
    Full,
    /// Continues the summary that ended at `previous_boundary`.
    Rolling { previous_boundary: String },
}

/// Prompt and history of one summarization call.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryInput {
    pub mode: SummaryMode,
    pub prompt: String,
    pub history: Vec<Exchange>,
}

/// Chooses the summarization input for a cut at `boundary`.
///
/// Rolling mode is used when the policy enables it, `previous` is a fresh
/// non-empty record for a different boundary, and that previous boundary
/// exchange is still in the history before the new one. The delta starts at
/// the previous boundary itself, since that exchange was kept verbatim last
/// time and is dropped now.
///
/// The input is then trimmed to `max_summarization_input_chars`: full mode
/// drops the oldest exchanges, rolling mode drops the oldest delta exchanges
/// and keeps the previous summary. Neither goes below one exchange.
pub fn plan_summary_input(
    policy: &HistorySummaryPolicy,
    history: &[Exchange],
    boundary: usize,
    boundary_request_id: &str,
    previous: Option<&SummaryRecord>,
    base_prompt: &str,
) -> SummaryInput {
    let rolling = previous
        .filter(|_| policy.rolling_summary())
        .and_then(|prev| rolling_input(history, boundary, boundary_request_id, prev));

    let mut input = match rolling {
        Some((previous_boundary, rolling_history)) => SummaryInput {
            mode: SummaryMode::Rolling { previous_boundary },
            prompt: format!("{base_prompt}{ROLLING_PROMPT_SUFFIX}"),
            history: rolling_history,
        },
        None => SummaryInput {
            mode: SummaryMode::Full,
            prompt: base_prompt.to_string(),
            history: history[..boundary.min(history.len())].to_vec(),
        },
    };

    let keep_first = matches!(input.mode, SummaryMode::Rolling { .. });
    trim_to_budget(
        &mut input.history,
        policy.max_summarization_input_chars(),
        keep_first,
    );
    input
}

fn rolling_input(
    history: &[Exchange],
    boundary: usize,
    boundary_request_id: &str,
    prev: &SummaryRecord,
) -> Option<(String, Vec<Exchange>)> {
    let previous_boundary = prev.summarized_until_request_id.trim();
    let previous_text = prev.summary_text.trim();
    if previous_boundary.is_empty()
        || previous_text.is_empty()
        || previous_boundary == boundary_request_id
    {
        return None;
    }

    let pos = history
        .iter()
        .position(|ex| ex.request_id == previous_boundary)?;
    if pos >= boundary {
        return None;
    }

    let mut input = Vec::with_capacity(boundary - pos + 1);
    input.push(Exchange::previous_summary(previous_text));
    input.extend_from_slice(&history[pos..boundary]);
    Some((previous_boundary.to_string(), input))
}

/// Drops exchanges until `history` fits `max_chars` or one remains. With
/// `keep_first`, removal starts at index 1.
fn trim_to_budget(history: &mut Vec<Exchange>, max_chars: usize, keep_first: bool) {
    if max_chars == 0 {
        return;
    }
    let mut total = history.estimated_chars();
    let drop_at = usize::from(keep_first);
    while history.len() > 1 && total > max_chars {
        let removed = history.remove(drop_at);
        total = total.saturating_sub(removed.estimated_chars());
    }
}

/// Builds the summarization request.
pub fn summary_request(
    input: &SummaryInput,
    byok_model: &str,
    timeout: Duration,
) -> TransportRequest {
    let chat_history: Vec<Value> = input.history.iter().map(|ex| ex.raw().clone()).collect();
    TransportRequest {
        endpoint: CHAT_STREAM_ENDPOINT.to_string(),
        headers: vec![
            ("content-type".to_string(), "application/json".to_string()),
            ("accept".to_string(), NDJSON_CONTENT_TYPE.to_string()),
            (BYOK_MODE_HEADER.to_string(), "byok".to_string()),
            (BYOK_MODEL_HEADER.to_string(), byok_model.to_string()),
            (
                PROXY_INTERNAL_HEADER.to_string(),
                PROXY_INTERNAL_HISTORY_SUMMARY.to_string(),
            ),
        ],
        body: json!({
            "message": input.prompt,
            "chat_history": chat_history,
            "conversation_id": null,
            "agent_memories": "",
            "mode": "",
            "prefix": "",
            "suffix": "",
            "lang": "",
            "path": "",
            "user_guidelines": "",
            "tool_definitions": [],
            "nodes": [],
            "structured_request_nodes": [],
            "request_nodes": []
        }),
        timeout,
    }
}

/// Runs one summarization call and returns the trimmed summary text.
///
/// The call is dropped when `timeout` elapses.
///
/// # Errors
///
/// Returns a [`SummaryError`] on timeout, transport failure, non-2xx status,
/// or an empty summary.
pub async fn run_summary(
    transport: &dyn ModelTransport,
    input: &SummaryInput,
    byok_model: &str,
    timeout: Duration,
) -> Result<String, SummaryError> {
    let request = summary_request(input, byok_model, timeout);
    debug!(
        model = byok_model,
        exchanges = input.history.len(),
        rolling = matches!(input.mode, SummaryMode::Rolling { .. }),
        "requesting history summary"
    );

    let response = tokio::time::timeout(timeout, transport.send(request))
        .await
        .map_err(|_| SummaryError::Timeout(timeout))??;
    if !response.is_success() {
        return Err(SummaryError::Status(response.status));
    }

    let text = collect_text_deltas(&response.body);
    if text.is_empty() {
        return Err(SummaryError::Empty);
    }
    Ok(text)
}
