//! Centralized constants for byok-compact.
//!
//! All magic numbers, default strings, and wire identifiers live here so they
//! can be changed in one place.

/// Application name used in CLI output and directory paths.
pub const APP_NAME: &str = "byok-compact";

/// Configuration filename.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Per-project configuration filename.
pub const PROJECT_CONFIG_FILENAME: &str = "byok-compact.toml";

/// Environment variable that overrides the configured API token.
pub const API_TOKEN_ENV: &str = "BYOK_API_TOKEN";

// --- Endpoints ---

/// Path of the chat endpoint whose requests are compacted.
pub const CHAT_STREAM_PATH: &str = "/chat-stream";

/// Endpoint (relative to the completion URL) used for summarization calls.
pub const CHAT_STREAM_ENDPOINT: &str = "chat-stream";

/// Endpoint (relative to the completion URL) serving the proxy config.
pub const PROXY_CONFIG_ENDPOINT: &str = "admin/api/config";

// --- Headers ---

/// Marks requests issued by the compactor itself. Requests carrying it are
/// never compacted.
pub const PROXY_INTERNAL_HEADER: &str = "x-byok-proxy-internal";

/// Value of [`PROXY_INTERNAL_HEADER`] on summarization calls.
pub const PROXY_INTERNAL_HISTORY_SUMMARY: &str = "history-summary";

pub const BYOK_MODE_HEADER: &str = "x-byok-mode";
pub const BYOK_MODEL_HEADER: &str = "x-byok-model";

/// Media type of the streamed chat response.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Body marker of encrypted payloads, which are passed through untouched.
pub const ENCRYPTED_DATA_MARKER: &str = "\"encrypted_data\"";

// --- Synthetic exchanges ---

/// Request id of the exchange that replaces a dropped history head.
pub const SUMMARY_REQUEST_ID: &str = "proxy_history_summary";

/// Request id of the exchange carrying a previous summary into a rolling
/// summarization call.
pub const PREVIOUS_SUMMARY_REQUEST_ID: &str = "proxy_history_summary_prev";

/// Appended to the base prompt for rolling summarization.
pub const ROLLING_PROMPT_SUFFIX: &str = "\n\nYou will be given an existing summary and \
    additional new conversation turns. Update the summary to include the new information. \
    Output only the updated summary.";

// --- Token counting ---

/// Bytes of text assumed per token by the budget approximation.
pub const CHARS_PER_TOKEN: usize = 4;

// --- Policy defaults ---

/// Default trigger strategy name.
pub const DEFAULT_TRIGGER_STRATEGY: &str = "auto";

/// Default minimum number of exchanges kept verbatim.
pub const DEFAULT_MIN_TAIL_EXCHANGES: usize = 2;

/// Default cap on the size of the summarizer's input history.
pub const DEFAULT_MAX_SUMMARIZATION_INPUT_CHARS: usize = 250_000;

/// Default summary cache lifetime (30 minutes).
pub const DEFAULT_CACHE_TTL_MS: u64 = 30 * 60 * 1000;

/// Default summarization call timeout.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Default token limit of a generated summary.
pub const DEFAULT_SUMMARY_MAX_TOKENS: usize = 1024;

/// Default size limit of the abridged history text.
pub const DEFAULT_ABRIDGED_TOTAL_CHARS_LIMIT: usize = 10_000;

/// Default fraction of the context window a compacted request aims for.
pub const DEFAULT_TARGET_CONTEXT_RATIO: f64 = 0.55;

/// Fixed allowance added to the summary overhead when budgeting the tail.
pub const SUMMARY_OVERHEAD_PADDING_CHARS: usize = 4096;

/// Default lifetime of a fetched policy snapshot.
pub const DEFAULT_POLICY_TTL_MS: u64 = 10_000;

// --- Abridged history ---

/// Number of trailing head exchanges rendered into the abridged text.
pub const ABRIDGED_WINDOW_EXCHANGES: usize = 6;

/// Per-exchange limit on the user side of the abridged text.
pub const ABRIDGED_USER_CHARS: usize = 1000;

/// Per-exchange limit on the assistant side of the abridged text.
pub const ABRIDGED_ASSISTANT_CHARS: usize = 2000;
