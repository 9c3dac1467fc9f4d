//! Reasons a request leaves the engine unmodified.

use std::time::Duration;

use crate::provider::TransportError;

/// Why a summarization call produced no summary.
#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("summarization timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("summarization returned status {0}")]
    Status(u16),
    #[error("summarization returned no text")]
    Empty,
}

/// Why compaction did not rewrite a request.
///
/// Every variant means the same thing to the caller: send the original
/// request unchanged.
#[derive(Debug, thiserror::Error)]
pub enum CompactionSkip {
    #[error("not a chat-stream POST")]
    NotApplicable,
    #[error("request was issued by the compactor")]
    InternalRequest,
    #[error("payload is encrypted")]
    EncryptedPayload,
    #[error("policy unavailable: {0}")]
    PolicyUnavailable(String),
    #[error("compaction disabled by policy")]
    Disabled,
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("payload has no conversation id")]
    MissingConversationId,
    #[error("history is empty")]
    EmptyHistory,
    #[error("history already contains a summary")]
    AlreadySummarized,
    #[error("history is below the compaction threshold")]
    BelowThreshold,
    #[error("history fits in the tail budget")]
    NoSplit,
    #[error("no boundary keeps tool results with their calls")]
    StructuralConflict,
    #[error("boundary exchange has no request id")]
    MissingBoundaryId,
    #[error("summary node message template is not configured")]
    MissingTemplate,
    #[error("summary model or prompt is not configured")]
    SummaryModelUnset,
    #[error("summarization failed: {0}")]
    SummarizationFailed(#[from] SummaryError),
}
