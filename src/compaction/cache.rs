//! In-memory summary cache, keyed by conversation id.
//!
//! Records are self-describing: each states the boundary exchange it was
//! produced for, so a record written by a racing request for an older
//! boundary is simply ignored by later readers. Staleness is checked at
//! read time only.

use std::collections::HashMap;
use std::sync::Mutex;

/// A summary of everything before `summarized_until_request_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRecord {
    pub summary_text: String,
    /// Request id of the first exchange kept verbatim after this summary.
    pub summarized_until_request_id: String,
    /// Id minted when the summary was produced.
    pub summarization_request_id: String,
    pub updated_at_ms: i64,
}

impl SummaryRecord {
    /// Whether the record is within `ttl_ms` of `now_ms`. A zero TTL never
    /// expires.
    pub fn is_fresh(&self, now_ms: i64, ttl_ms: u64) -> bool {
        if ttl_ms == 0 {
            return true;
        }
        let age = now_ms.saturating_sub(self.updated_at_ms);
        age <= i64::try_from(ttl_ms).unwrap_or(i64::MAX)
    }

    /// Whether the record summarizes exactly up to `boundary_request_id`.
    pub fn covers(&self, boundary_request_id: &str) -> bool {
        self.summarized_until_request_id.trim() == boundary_request_id
    }
}

/// Per-conversation summary records.
#[derive(Debug, Default)]
pub struct SummaryCache {
    entries: Mutex<HashMap<String, SummaryRecord>>,
}

impl SummaryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, conversation_id: &str) -> Option<SummaryRecord> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(conversation_id).cloned())
    }

    /// Stores `record`, replacing any previous one for the conversation.
    pub fn put(&self, conversation_id: &str, record: SummaryRecord) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(conversation_id.to_string(), record);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
