//! Token budget approximation for byok-compact.
//!
//! Compaction never tokenizes. Budgets are derived from byte lengths at a
//! fixed [`CHARS_PER_TOKEN`] ratio, and the context window of the requested
//! model is looked up in the policy's override table.

use crate::config::HistorySummaryPolicy;
use crate::constants::CHARS_PER_TOKEN;
use crate::provider::normalize_model_for_match;

/// Approximate token count of `chars` bytes of text, rounded up.
pub fn tokens_for_chars(chars: usize) -> usize {
    chars.div_ceil(CHARS_PER_TOKEN)
}

/// Character budget equivalent to `tokens` tokens.
pub fn chars_for_tokens(tokens: usize) -> usize {
    tokens.saturating_mul(CHARS_PER_TOKEN)
}

/// Resolves the context window (in tokens) of the requested model.
///
/// The model id is normalized first (see [`normalize_model_for_match`]).
/// Among the non-blank override keys contained in the normalized id, the
/// longest one with a positive value wins; equal-length keys are tried in
/// key order. Falls back to the policy default.
///
/// Returns `0` when nothing resolves, meaning "unknown".
pub fn resolve_context_window_tokens(policy: &HistorySummaryPolicy, model_id: &str) -> usize {
    let model = normalize_model_for_match(model_id);
    if model.is_empty() {
        return 0;
    }

    let mut keys: Vec<&String> = policy
        .context_window_tokens_overrides
        .keys()
        .filter(|k| !k.trim().is_empty())
        .collect();
    // Stable sort keeps BTreeMap order among equal lengths.
    keys.sort_by(|a, b| b.len().cmp(&a.len()));

    for key in keys {
        if !model.contains(key.as_str()) {
            continue;
        }
        if let Some(&tokens) = policy.context_window_tokens_overrides.get(key) {
            if tokens > 0 {
                return tokens as usize;
            }
        }
    }

    match policy.context_window_tokens_default {
        Some(tokens) if tokens > 0 => tokens as usize,
        _ => 0,
    }
}

/// Format a size for display. Example: "1,234 / 128,000"
pub fn format_usage(used: usize, limit: usize) -> String {
    format!("{} / {}", format_number(used), format_number(limit))
}

/// Inserts thousands separators into a number.
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn policy_with(overrides: &[(&str, i64)], default: Option<i64>) -> HistorySummaryPolicy {
        HistorySummaryPolicy {
            context_window_tokens_overrides: overrides
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
            context_window_tokens_default: default,
            ..Default::default()
        }
    }

    #[test]
    fn test_char_token_conversion() {
        assert_eq!(tokens_for_chars(0), 0);
        assert_eq!(tokens_for_chars(1), 1);
        assert_eq!(tokens_for_chars(4), 1);
        assert_eq!(tokens_for_chars(5), 2);
        assert_eq!(chars_for_tokens(1024), 4096);
    }

    #[test]
    fn test_longest_override_wins() {
        let policy = policy_with(&[("claude", 100_000), ("claude-sonnet-4", 200_000)], Some(8_000));
        assert_eq!(
            resolve_context_window_tokens(&policy, "claude-sonnet-4-5"),
            200_000
        );
        assert_eq!(resolve_context_window_tokens(&policy, "claude-haiku"), 100_000);
        assert_eq!(resolve_context_window_tokens(&policy, "gpt-4.1"), 8_000);
    }

    #[test]
    fn test_byok_prefix_is_stripped() {
        let policy = policy_with(&[("claude-opus", 200_000)], None);
        assert_eq!(
            resolve_context_window_tokens(&policy, "byok:anthropic:claude-opus-4"),
            200_000
        );
        // The provider id alone never matches an override.
        let policy = policy_with(&[("anthropic", 1)], None);
        assert_eq!(
            resolve_context_window_tokens(&policy, "byok:anthropic:claude-opus-4"),
            0
        );
    }

    #[test]
    fn test_non_positive_override_is_skipped() {
        let policy = policy_with(&[("claude-sonnet", 0), ("claude", 150_000)], None);
        assert_eq!(
            resolve_context_window_tokens(&policy, "claude-sonnet-4"),
            150_000
        );
    }

    #[test]
    fn test_blank_keys_ignored_and_unknown_is_zero() {
        let policy = policy_with(&[("  ", 999)], None);
        assert_eq!(resolve_context_window_tokens(&policy, "anything"), 0);
        assert_eq!(resolve_context_window_tokens(&policy, "   "), 0);
        let policy = policy_with(&[], Some(-5));
        assert_eq!(resolve_context_window_tokens(&policy, "model"), 0);
    }

    #[test]
    fn test_equal_length_keys_use_key_order() {
        let policy = policy_with(&[("bbb", 2), ("aaa", 1)], None);
        assert_eq!(resolve_context_window_tokens(&policy, "aaa-bbb"), 1);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_234_567), "1,234,567");
        assert_eq!(format_usage(50_000, 400_000), "50,000 / 400,000");
    }
}
