//! Decides whether a history needs compaction.

use crate::config::{HistorySummaryPolicy, TriggerStrategy};
use crate::constants::CHARS_PER_TOKEN;
use crate::exchange::{history_contains_summary, EstimateSize, Exchange};
use crate::tokens::{chars_for_tokens, resolve_context_window_tokens, tokens_for_chars};

/// Outcome of evaluating a history against the policy.
#[derive(Debug, Clone, PartialEq)]
pub struct CompactionDecision {
    pub triggered: bool,
    /// History size at which compaction fires.
    pub threshold_chars: usize,
    /// How much of the most recent history may be kept verbatim.
    pub tail_budget_chars: usize,
    /// Estimated size of the history plus the pending message.
    pub total_chars: usize,
    /// Strategy that actually produced the decision.
    pub strategy: TriggerStrategy,
    /// Context window used by the ratio strategy, `0` when unused.
    pub context_window_tokens: usize,
}

impl CompactionDecision {
    fn by_chars(policy: &HistorySummaryPolicy, total_chars: usize) -> Self {
        let threshold = policy.trigger_chars();
        Self {
            triggered: threshold > 0 && total_chars >= threshold,
            threshold_chars: threshold,
            tail_budget_chars: policy.tail_exclude_chars(),
            total_chars,
            strategy: TriggerStrategy::Chars,
            context_window_tokens: 0,
        }
    }

    fn not_triggered(policy: &HistorySummaryPolicy, total_chars: usize) -> Self {
        Self {
            triggered: false,
            ..Self::by_chars(policy, total_chars)
        }
    }
}

/// Evaluates the trigger for one request.
///
/// Pure: the same inputs always give the same decision.
///
/// # Arguments
///
/// * `history` - Past exchanges of the conversation, oldest first.
/// * `pending_message` - The user message about to be sent.
/// * `model_id` - Requested model, used to resolve the context window.
pub fn evaluate(
    policy: &HistorySummaryPolicy,
    history: &[Exchange],
    pending_message: &str,
    model_id: &str,
) -> CompactionDecision {
    let total_chars = history
        .estimated_chars()
        .saturating_add(pending_message.trim().len());

    if !policy.is_active() || history.is_empty() || history_contains_summary(history) {
        return CompactionDecision::not_triggered(policy, total_chars);
    }

    let strategy = policy.trigger_strategy();
    if strategy == TriggerStrategy::Chars {
        return CompactionDecision::by_chars(policy, total_chars);
    }

    let mut window = resolve_context_window_tokens(policy, model_id);
    let trigger_chars = policy.trigger_chars();
    if strategy == TriggerStrategy::Auto {
        if window == 0 {
            return CompactionDecision::by_chars(policy, total_chars);
        }
        // A configured char threshold caps the effective window.
        if trigger_chars > 0 {
            window = window.min(tokens_for_chars(trigger_chars));
        }
    }

    let Some(trigger_ratio) = policy.trigger_ratio().filter(|_| window > 0) else {
        return CompactionDecision::by_chars(policy, total_chars);
    };

    let approx_tokens = tokens_for_chars(total_chars);
    let ratio = approx_tokens as f64 / window as f64;

    let threshold_chars = (window as f64 * trigger_ratio * CHARS_PER_TOKEN as f64).ceil() as usize;
    let target_tokens = (window as f64 * policy.target_ratio()).floor() as usize;
    let tail_budget_chars =
        chars_for_tokens(target_tokens).saturating_sub(policy.summary_overhead_chars());

    CompactionDecision {
        triggered: ratio >= trigger_ratio,
        threshold_chars,
        tail_budget_chars,
        total_chars,
        strategy: TriggerStrategy::Ratio,
        context_window_tokens: window,
    }
}
