//! Struct definitions and serde defaults for byok-compact configuration.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Root configuration for byok-compact, deserialized from `config.toml`.
///
/// Every field is optional so the tool runs against a bare or missing file.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    /// Base URL of the BYOK proxy (e.g. `"https://proxy.example.com/"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_url: Option<String>,
    /// Bearer token for the proxy. `BYOK_API_TOKEN` takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// Lifetime of a fetched policy snapshot, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_ttl_ms: Option<u64>,
    /// Local compaction policy. When absent, the policy is fetched from the
    /// proxy's config endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_summary: Option<HistorySummaryPolicy>,
}

/// History compaction policy.
///
/// Mirrors the `history_summary` object of the proxy config. Numeric fields
/// that are absent or zero fall back to the defaults in
/// [`crate::constants`]; see the accessors in `resolve.rs`. Numeric fields
/// also accept floats and numeric strings; any other value reads as absent.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct HistorySummaryPolicy {
    /// Master switch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Whether the client may compact on its own. Absent means not allowed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_compaction_enabled: Option<bool>,
    /// `chars`, `ratio` or `auto` (case-insensitive).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_strategy: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_usize"
    )]
    pub trigger_on_history_size_chars: Option<usize>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_usize"
    )]
    pub history_tail_size_chars_to_exclude: Option<usize>,
    /// Fraction of the context window at which compaction triggers.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_f64"
    )]
    pub trigger_on_context_ratio: Option<f64>,
    /// Fraction of the context window a compacted request aims for.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_f64"
    )]
    pub target_context_ratio: Option<f64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_usize"
    )]
    pub min_tail_exchanges: Option<usize>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_usize"
    )]
    pub max_summarization_input_chars: Option<usize>,
    /// Summary cache lifetime. `0` keeps summaries forever.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u64"
    )]
    pub cache_ttl_ms: Option<u64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u64"
    )]
    pub timeout_seconds: Option<u64>,
    /// Token limit of a generated summary.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_usize"
    )]
    pub max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abridged_history_params: Option<AbridgedHistoryParams>,
    /// Context window sizes keyed by model-id substring.
    #[serde(
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "lenient_token_map"
    )]
    pub context_window_tokens_overrides: BTreeMap<String, i64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_i64"
    )]
    pub context_window_tokens_default: Option<i64>,
    /// Instruction sent to the summarization model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Message template stored in the summary node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_node_request_message_template: Option<String>,
    /// BYOK provider of the summarization model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    /// Summarization model id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Update the previous summary instead of re-summarizing the whole head.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rolling_summary: Option<bool>,
}

/// Limits of the abridged transcript embedded in the summary node.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AbridgedHistoryParams {
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_usize"
    )]
    pub total_chars_limit: Option<usize>,
}

/// A finite number from a JSON/TOML number or a numeric string.
fn lenient_number(value: Option<Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(lenient_number(Option::deserialize(deserializer)?))
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(lenient_f64(deserializer)?.map(|n| n.trunc() as i64))
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Ok(lenient_f64(deserializer)?
        .filter(|n| *n >= 0.0)
        .map(|n| n.trunc() as u64))
}

fn lenient_usize<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<usize>, D::Error> {
    Ok(lenient_f64(deserializer)?
        .filter(|n| *n >= 0.0)
        .map(|n| n.trunc() as usize))
}

/// Keeps the entries whose value reads as a number.
fn lenient_token_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, i64>, D::Error> {
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| lenient_number(Some(value)).map(|n| (key, n.trunc() as i64)))
        .collect())
}

/// How the trigger evaluator decides that a history is too large.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerStrategy {
    /// Fixed character threshold.
    Chars,
    /// Fraction of the model's context window.
    Ratio,
    /// `Ratio` when the context window resolves, `Chars` otherwise.
    Auto,
}

impl TriggerStrategy {
    /// Parses a strategy name. Matching is case-insensitive; blank means
    /// `auto` and any unrecognized name means `chars`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "" | "auto" => Self::Auto,
            "ratio" => Self::Ratio,
            _ => Self::Chars,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chars => "chars",
            Self::Ratio => "ratio",
            Self::Auto => "auto",
        }
    }
}
