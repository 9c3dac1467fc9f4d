//! History compaction for chat requests.
//!
//! When a conversation's history outgrows the policy's budget, the engine
//! replaces its oldest exchanges with a single synthetic summary exchange and
//! keeps a recent tail verbatim. Each request moves through
//! evaluate → split → cache lookup or summarize → rewrite, and every stage
//! returns `Err(CompactionSkip)` to leave the request unmodified.

mod abridged;
mod cache;
mod error;
mod request;
mod split;
mod summarizer;
mod trigger;

pub use abridged::{build_abridged_text, truncate_inline};
pub use cache::{SummaryCache, SummaryRecord};
pub use error::{CompactionSkip, SummaryError};
pub use request::{normalize_endpoint_path, ChatPayload, OutgoingRequest};
pub use split::{adjust_boundary_for_tool_results, split_history, HistorySplit};
pub use summarizer::{plan_summary_input, run_summary, summary_request, SummaryInput, SummaryMode};
pub use trigger::{evaluate, CompactionDecision};

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::{HistorySummaryPolicy, PolicySource};
use crate::constants::ABRIDGED_WINDOW_EXCHANGES;
use crate::exchange::{history_contains_summary, EstimateSize, Exchange};
use crate::provider::{byok_model_id, ModelTransport};

/// Metadata of a rewrite that was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionOutcome {
    pub conversation_id: String,
    /// Request id of the first exchange kept verbatim.
    pub boundary_request_id: String,
    pub dropped_exchanges: usize,
    pub kept_exchanges: usize,
    pub before_chars: usize,
    pub after_chars: usize,
    /// Whether the summary was reused from the cache.
    pub cache_hit: bool,
}

/// Where a history would be cut, computed without any I/O.
#[derive(Debug, Clone, PartialEq)]
pub struct CompactionPlan {
    pub conversation_id: String,
    pub decision: CompactionDecision,
    pub history: Vec<Exchange>,
    /// Index of the first exchange kept verbatim.
    pub boundary: usize,
    pub boundary_request_id: String,
}

impl CompactionPlan {
    pub fn head(&self) -> &[Exchange] {
        &self.history[..self.boundary]
    }

    pub fn tail(&self) -> &[Exchange] {
        &self.history[self.boundary..]
    }
}

/// Evaluates the trigger and finds the cut for `payload`.
///
/// # Errors
///
/// Returns the [`CompactionSkip`] naming the first check that failed.
pub fn plan(
    policy: &HistorySummaryPolicy,
    payload: &ChatPayload,
) -> Result<CompactionPlan, CompactionSkip> {
    if !policy.is_active() {
        return Err(CompactionSkip::Disabled);
    }
    let conversation_id = payload
        .conversation_id()
        .ok_or(CompactionSkip::MissingConversationId)?;

    let history = Exchange::decode_history(payload.history());
    if history.is_empty() {
        return Err(CompactionSkip::EmptyHistory);
    }
    if history_contains_summary(&history) {
        return Err(CompactionSkip::AlreadySummarized);
    }

    let decision = evaluate(policy, &history, payload.pending_message(), payload.model());
    if !decision.triggered {
        return Err(CompactionSkip::BelowThreshold);
    }

    let split = split_history(
        &history,
        decision.tail_budget_chars,
        decision.threshold_chars,
        policy.min_tail_exchanges(),
    );
    if split.head.is_empty() || split.tail.is_empty() {
        return Err(CompactionSkip::NoSplit);
    }

    let boundary = adjust_boundary_for_tool_results(&history, split.boundary());
    if boundary == 0 || boundary >= history.len() {
        return Err(CompactionSkip::StructuralConflict);
    }

    let boundary_request_id = history[boundary].request_id.clone();
    if boundary_request_id.is_empty() {
        return Err(CompactionSkip::MissingBoundaryId);
    }

    Ok(CompactionPlan {
        conversation_id,
        decision,
        history,
        boundary,
        boundary_request_id,
    })
}

/// The compaction engine.
///
/// Owns the summary cache; construct one per process and share it by
/// reference. Safe to call on every outgoing request.
pub struct CompactionEngine {
    policy_source: Arc<dyn PolicySource>,
    transport: Arc<dyn ModelTransport>,
    cache: SummaryCache,
    clock: Arc<dyn Clock>,
}

impl CompactionEngine {
    pub fn new(policy_source: Arc<dyn PolicySource>, transport: Arc<dyn ModelTransport>) -> Self {
        Self {
            policy_source,
            transport,
            cache: SummaryCache::new(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn cache(&self) -> &SummaryCache {
        &self.cache
    }

    /// Attempts compaction on an outgoing HTTP request.
    ///
    /// Only `POST /chat-stream` requests with a plaintext JSON body that the
    /// compactor did not issue itself are considered. On success the body is
    /// replaced by the rewritten payload; on any skip it is left untouched.
    pub async fn attempt(
        &self,
        request: &mut OutgoingRequest,
    ) -> Result<CompactionOutcome, CompactionSkip> {
        let result = self.try_attempt(request).await;
        log_skip(&result);
        result
    }

    /// Attempts compaction on an already parsed payload.
    pub async fn compact_payload(
        &self,
        payload: &mut ChatPayload,
    ) -> Result<CompactionOutcome, CompactionSkip> {
        let result = self.try_compact_payload(payload).await;
        log_skip(&result);
        result
    }

    async fn try_attempt(
        &self,
        request: &mut OutgoingRequest,
    ) -> Result<CompactionOutcome, CompactionSkip> {
        request.check_eligible()?;
        let policy = self.current_policy().await?;
        let mut payload = ChatPayload::parse(&request.body)?;
        let outcome = self.compact_with_policy(&policy, &mut payload).await?;
        request.body = payload.to_json_string()?;
        Ok(outcome)
    }

    async fn try_compact_payload(
        &self,
        payload: &mut ChatPayload,
    ) -> Result<CompactionOutcome, CompactionSkip> {
        let policy = self.current_policy().await?;
        self.compact_with_policy(&policy, payload).await
    }

    async fn current_policy(&self) -> Result<HistorySummaryPolicy, CompactionSkip> {
        let policy = self
            .policy_source
            .fetch()
            .await
            .map_err(|e| CompactionSkip::PolicyUnavailable(format!("{e:#}")))?;
        match policy {
            Some(policy) if policy.is_active() => Ok(policy),
            Some(_) => Err(CompactionSkip::Disabled),
            None => Err(CompactionSkip::PolicyUnavailable(
                "no history_summary policy".to_string(),
            )),
        }
    }

    async fn compact_with_policy(
        &self,
        policy: &HistorySummaryPolicy,
        payload: &mut ChatPayload,
    ) -> Result<CompactionOutcome, CompactionSkip> {
        let plan = plan(policy, payload)?;
        debug!(
            conversation_id = %plan.conversation_id,
            boundary_request_id = %plan.boundary_request_id,
            total_chars = plan.decision.total_chars,
            threshold_chars = plan.decision.threshold_chars,
            tail_budget_chars = plan.decision.tail_budget_chars,
            "compaction triggered"
        );

        let template = policy
            .message_template()
            .ok_or(CompactionSkip::MissingTemplate)?
            .to_string();

        let now = self.clock.now_ms();
        let previous = self
            .cache
            .get(&plan.conversation_id)
            .filter(|rec| rec.is_fresh(now, policy.cache_ttl_ms()));

        let (record, cache_hit) = match previous {
            Some(rec) if rec.covers(&plan.boundary_request_id) => (rec, true),
            previous => {
                let record = self.summarize(policy, &plan, previous.as_ref(), now).await?;
                self.cache.put(&plan.conversation_id, record.clone());
                (record, false)
            }
        };

        let head = plan.head();
        let tail = plan.tail();
        let abridged = build_abridged_text(head, policy.abridged_chars_limit());
        let dropped_before_window = head.len().saturating_sub(ABRIDGED_WINDOW_EXCHANGES);
        let summary = Exchange::history_summary(json!({
            "summary_text": record.summary_text,
            "summarization_request_id": record.summarization_request_id,
            "history_beginning_dropped_num_exchanges": dropped_before_window,
            "history_middle_abridged_text": abridged,
            "history_end": [],
            "message_template": template,
        }));

        let before_chars = plan.history.estimated_chars();
        let after_chars = summary
            .estimated_chars()
            .saturating_add(tail.estimated_chars());

        let mut new_history: Vec<Value> = Vec::with_capacity(tail.len() + 1);
        new_history.push(summary.into_raw());
        new_history.extend(tail.iter().map(|ex| ex.raw().clone()));
        payload.set_history(new_history);

        let outcome = CompactionOutcome {
            conversation_id: plan.conversation_id.clone(),
            boundary_request_id: plan.boundary_request_id.clone(),
            dropped_exchanges: head.len(),
            kept_exchanges: tail.len(),
            before_chars,
            after_chars,
            cache_hit,
        };
        info!(
            conversation_id = %outcome.conversation_id,
            boundary_request_id = %outcome.boundary_request_id,
            before_chars = outcome.before_chars,
            after_chars = outcome.after_chars,
            cache_hit = outcome.cache_hit,
            "history compacted"
        );
        Ok(outcome)
    }

    async fn summarize(
        &self,
        policy: &HistorySummaryPolicy,
        plan: &CompactionPlan,
        previous: Option<&SummaryRecord>,
        now: i64,
    ) -> Result<SummaryRecord, CompactionSkip> {
        let byok_model = policy
            .provider_id()
            .zip(policy.summary_model())
            .and_then(|(provider, model)| byok_model_id(provider, model))
            .ok_or(CompactionSkip::SummaryModelUnset)?;
        let base_prompt = policy.prompt().ok_or(CompactionSkip::SummaryModelUnset)?;

        let input = plan_summary_input(
            policy,
            &plan.history,
            plan.boundary,
            &plan.boundary_request_id,
            previous,
            base_prompt,
        );

        let transport = self.transport.as_ref();
        let summary_text = run_summary(transport, &input, &byok_model, policy.timeout())
            .await
            .inspect_err(|e| {
                warn!(
                    conversation_id = %plan.conversation_id,
                    error = %e,
                    "history summarization failed"
                );
            })?;

        Ok(SummaryRecord {
            summary_text,
            summarized_until_request_id: plan.boundary_request_id.clone(),
            summarization_request_id: Uuid::new_v4().to_string(),
            updated_at_ms: now,
        })
    }
}

fn log_skip(result: &Result<CompactionOutcome, CompactionSkip>) {
    if let Err(skip) = result {
        debug!(reason = %skip, "compaction skipped");
    }
}
