//! Environment variable substitution, credential normalization, and policy
//! accessors with their defaults.

use std::time::Duration;

use super::types::{Config, HistorySummaryPolicy, TriggerStrategy};

use crate::constants::{
    API_TOKEN_ENV, CHARS_PER_TOKEN, DEFAULT_ABRIDGED_TOTAL_CHARS_LIMIT, DEFAULT_CACHE_TTL_MS,
    DEFAULT_MAX_SUMMARIZATION_INPUT_CHARS, DEFAULT_MIN_TAIL_EXCHANGES, DEFAULT_POLICY_TTL_MS,
    DEFAULT_SUMMARY_MAX_TOKENS, DEFAULT_TARGET_CONTEXT_RATIO, DEFAULT_TIMEOUT_SECONDS,
    DEFAULT_TRIGGER_STRATEGY, SUMMARY_OVERHEAD_PADDING_CHARS,
};

impl Config {
    /// Resolve {env:VAR_NAME} patterns in string fields.
    pub(super) fn resolve_substitutions(&mut self) {
        resolve_opt(&mut self.completion_url);
        resolve_opt(&mut self.api_token);
        if let Some(ref mut hs) = self.history_summary {
            resolve_opt(&mut hs.prompt);
            resolve_opt(&mut hs.summary_node_request_message_template);
            resolve_opt(&mut hs.provider_id);
            resolve_opt(&mut hs.model);
        }
    }

    /// Replace {env:VAR} with the environment variable value.
    pub(super) fn resolve_str(s: &str) -> String {
        let mut result = s.to_string();
        while let Some(start) = result.find("{env:") {
            if let Some(end) = result[start..].find('}') {
                let var_name = &result[start + 5..start + end];
                let value = std::env::var(var_name).unwrap_or_default();
                result = format!(
                    "{}{}{}",
                    &result[..start],
                    value,
                    &result[start + end + 1..]
                );
            } else {
                break;
            }
        }
        result
    }

    /// Proxy base URL with a trailing slash, if configured.
    pub fn base_url(&self) -> Option<String> {
        self.completion_url.as_deref().and_then(normalize_base_url)
    }

    /// Resolve the proxy token: env var first, then config value.
    pub fn resolve_api_token(&self) -> Option<String> {
        if let Ok(val) = std::env::var(API_TOKEN_ENV) {
            if let Some(token) = normalize_token(&val) {
                return Some(token);
            }
        }
        self.api_token.as_deref().and_then(normalize_token)
    }

    /// Lifetime of a fetched policy snapshot.
    pub fn policy_ttl_ms(&self) -> u64 {
        self.policy_ttl_ms.unwrap_or(DEFAULT_POLICY_TTL_MS)
    }

    /// Copy of the config with the token masked, for display.
    pub fn redacted(&self) -> Config {
        let mut config = self.clone();
        if config.api_token.as_deref().is_some_and(|t| !t.is_empty()) {
            config.api_token = Some("***".to_string());
        }
        config
    }
}

fn resolve_opt(field: &mut Option<String>) {
    if let Some(ref mut s) = field {
        *s = Config::resolve_str(s);
    }
}

/// Trims a base URL and guarantees a trailing `/`. `None` when blank.
pub fn normalize_base_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    if url.ends_with('/') {
        Some(url.to_string())
    } else {
        Some(format!("{url}/"))
    }
}

/// Normalizes a pasted credential.
///
/// Strips a leading `Bearer ` and unwraps `NAME=value` when `NAME` looks like
/// an environment variable holding a token (`*_TOKEN`, `*_KEY`, ...).
/// `None` when blank.
pub fn normalize_token(raw: &str) -> Option<String> {
    let mut token = raw.trim();
    if let Some(rest) = token
        .get(..7)
        .filter(|prefix| prefix.eq_ignore_ascii_case("bearer "))
        .and_then(|_| token.get(7..))
    {
        token = rest.trim();
    }
    if let Some((name, value)) = token.split_once('=') {
        let name = name.trim();
        let value = value.trim();
        let env_like = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
            && (name.ends_with("_TOKEN") || name.ends_with("_KEY"));
        if env_like && !value.is_empty() {
            token = value;
        }
    }
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Trimmed, non-empty string field.
fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// `Some(v)` only for a positive value.
fn positive<T: Default + PartialOrd + Copy>(v: Option<T>) -> Option<T> {
    v.filter(|v| *v > T::default())
}

impl HistorySummaryPolicy {
    /// Whether the client may compact. Both switches must be set.
    pub fn is_active(&self) -> bool {
        self.enabled.unwrap_or(false) && self.client_compaction_enabled.unwrap_or(false)
    }

    pub fn trigger_strategy(&self) -> TriggerStrategy {
        let name = non_blank(&self.trigger_strategy).unwrap_or(DEFAULT_TRIGGER_STRATEGY);
        TriggerStrategy::parse(name)
    }

    /// Character threshold of the `chars` strategy. `0` never triggers.
    pub fn trigger_chars(&self) -> usize {
        self.trigger_on_history_size_chars.unwrap_or(0)
    }

    /// Tail budget of the `chars` strategy.
    pub fn tail_exclude_chars(&self) -> usize {
        self.history_tail_size_chars_to_exclude.unwrap_or(0)
    }

    /// Trigger ratio when it lies in `(0, 1]`.
    pub fn trigger_ratio(&self) -> Option<f64> {
        self.trigger_on_context_ratio.filter(|r| valid_ratio(*r))
    }

    /// Target ratio, defaulting when absent or outside `(0, 1]`.
    pub fn target_ratio(&self) -> f64 {
        self.target_context_ratio
            .filter(|r| valid_ratio(*r))
            .unwrap_or(DEFAULT_TARGET_CONTEXT_RATIO)
    }

    /// Minimum tail length, never below one exchange.
    pub fn min_tail_exchanges(&self) -> usize {
        positive(self.min_tail_exchanges)
            .unwrap_or(DEFAULT_MIN_TAIL_EXCHANGES)
            .max(1)
    }

    pub fn max_summarization_input_chars(&self) -> usize {
        positive(self.max_summarization_input_chars)
            .unwrap_or(DEFAULT_MAX_SUMMARIZATION_INPUT_CHARS)
    }

    /// Summary cache lifetime in milliseconds. `0` means no expiry.
    pub fn cache_ttl_ms(&self) -> u64 {
        self.cache_ttl_ms.unwrap_or(DEFAULT_CACHE_TTL_MS)
    }

    /// Deadline of a summarization call.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(positive(self.timeout_seconds).unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    pub fn summary_max_tokens(&self) -> usize {
        positive(self.max_tokens).unwrap_or(DEFAULT_SUMMARY_MAX_TOKENS)
    }

    pub fn abridged_chars_limit(&self) -> usize {
        positive(
            self.abridged_history_params
                .as_ref()
                .and_then(|p| p.total_chars_limit),
        )
        .unwrap_or(DEFAULT_ABRIDGED_TOTAL_CHARS_LIMIT)
    }

    /// Space reserved for the summary exchange when budgeting the tail.
    pub fn summary_overhead_chars(&self) -> usize {
        self.abridged_chars_limit()
            .saturating_add(self.summary_max_tokens().saturating_mul(CHARS_PER_TOKEN))
            .saturating_add(SUMMARY_OVERHEAD_PADDING_CHARS)
    }

    pub fn prompt(&self) -> Option<&str> {
        non_blank(&self.prompt)
    }

    pub fn message_template(&self) -> Option<&str> {
        non_blank(&self.summary_node_request_message_template)
    }

    pub fn provider_id(&self) -> Option<&str> {
        non_blank(&self.provider_id)
    }

    pub fn summary_model(&self) -> Option<&str> {
        non_blank(&self.model)
    }

    pub fn rolling_summary(&self) -> bool {
        self.rolling_summary.unwrap_or(false)
    }

    /// Field-wise merge; values set on `self` win over `fallback`.
    pub fn merged_over(self, fallback: HistorySummaryPolicy) -> HistorySummaryPolicy {
        let mut overrides = fallback.context_window_tokens_overrides;
        overrides.extend(self.context_window_tokens_overrides);
        HistorySummaryPolicy {
            enabled: self.enabled.or(fallback.enabled),
            client_compaction_enabled: self
                .client_compaction_enabled
                .or(fallback.client_compaction_enabled),
            trigger_strategy: self.trigger_strategy.or(fallback.trigger_strategy),
            trigger_on_history_size_chars: self
                .trigger_on_history_size_chars
                .or(fallback.trigger_on_history_size_chars),
            history_tail_size_chars_to_exclude: self
                .history_tail_size_chars_to_exclude
                .or(fallback.history_tail_size_chars_to_exclude),
            trigger_on_context_ratio: self
                .trigger_on_context_ratio
                .or(fallback.trigger_on_context_ratio),
            target_context_ratio: self.target_context_ratio.or(fallback.target_context_ratio),
            min_tail_exchanges: self.min_tail_exchanges.or(fallback.min_tail_exchanges),
            max_summarization_input_chars: self
                .max_summarization_input_chars
                .or(fallback.max_summarization_input_chars),
            cache_ttl_ms: self.cache_ttl_ms.or(fallback.cache_ttl_ms),
            timeout_seconds: self.timeout_seconds.or(fallback.timeout_seconds),
            max_tokens: self.max_tokens.or(fallback.max_tokens),
            abridged_history_params: self
                .abridged_history_params
                .or(fallback.abridged_history_params),
            context_window_tokens_overrides: overrides,
            context_window_tokens_default: self
                .context_window_tokens_default
                .or(fallback.context_window_tokens_default),
            prompt: self.prompt.or(fallback.prompt),
            summary_node_request_message_template: self
                .summary_node_request_message_template
                .or(fallback.summary_node_request_message_template),
            provider_id: self.provider_id.or(fallback.provider_id),
            model: self.model.or(fallback.model),
            rolling_summary: self.rolling_summary.or(fallback.rolling_summary),
        }
    }
}

fn valid_ratio(r: f64) -> bool {
    r.is_finite() && r > 0.0 && r <= 1.0
}
