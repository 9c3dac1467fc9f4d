//! The outgoing request as the compaction engine sees it.

use serde_json::{Map, Value};

use super::error::CompactionSkip;
use crate::constants::{CHAT_STREAM_PATH, ENCRYPTED_DATA_MARKER, PROXY_INTERNAL_HEADER};
use crate::exchange::pick;

/// Wire spellings of the history field, in lookup order.
const HISTORY_KEYS: [&str; 2] = ["chat_history", "chatHistory"];

/// An HTTP request on its way to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRequest {
    pub method: String,
    /// Endpoint path, e.g. `/chat-stream`.
    pub path: String,
    pub headers: Vec<(String, String)>,
    /// Serialized JSON body.
    pub body: String,
}

impl OutgoingRequest {
    /// A `POST` with no headers.
    pub fn post(path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: "POST".to_string(),
            path: path.into(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Checks the request-level preconditions of compaction: a `POST` to the
    /// chat-stream endpoint that the compactor did not issue itself, with a
    /// plaintext body.
    pub(crate) fn check_eligible(&self) -> Result<(), CompactionSkip> {
        if !self.method.trim().eq_ignore_ascii_case("POST")
            || normalize_endpoint_path(&self.path) != CHAT_STREAM_PATH
        {
            return Err(CompactionSkip::NotApplicable);
        }
        if self
            .header(PROXY_INTERNAL_HEADER)
            .is_some_and(|v| !v.is_empty())
        {
            return Err(CompactionSkip::InternalRequest);
        }
        if self.body.is_empty() {
            return Err(CompactionSkip::NotApplicable);
        }
        if self.body.contains(ENCRYPTED_DATA_MARKER) {
            return Err(CompactionSkip::EncryptedPayload);
        }
        Ok(())
    }
}

/// Normalizes an endpoint path: leading `/`, no trailing `/`.
pub fn normalize_endpoint_path(path: &str) -> String {
    let path = path.trim();
    if path.is_empty() {
        return String::new();
    }
    let trimmed = path.trim_start_matches('/').trim_end_matches('/');
    format!("/{trimmed}")
}

/// A parsed chat request body.
///
/// Keeps the full JSON object so every field the engine does not touch is
/// re-emitted unchanged, and remembers which spelling the history used.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPayload {
    body: Map<String, Value>,
    history_key: &'static str,
}

impl ChatPayload {
    /// Wraps a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`CompactionSkip::MalformedPayload`] if the body is not an object.
    pub fn from_value(value: Value) -> Result<Self, CompactionSkip> {
        let Value::Object(body) = value else {
            return Err(CompactionSkip::MalformedPayload(
                "body is not a JSON object".to_string(),
            ));
        };
        let history_key = HISTORY_KEYS
            .into_iter()
            .find(|k| body.get(*k).is_some_and(Value::is_array))
            .unwrap_or(HISTORY_KEYS[0]);
        Ok(Self { body, history_key })
    }

    /// Parses a serialized body.
    pub fn parse(body: &str) -> Result<Self, CompactionSkip> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| CompactionSkip::MalformedPayload(e.to_string()))?;
        Self::from_value(value)
    }

    /// Trimmed conversation id, if any.
    pub fn conversation_id(&self) -> Option<String> {
        pick(&self.body, "conversation_id", "conversationId")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// The wire key the history was found under.
    pub fn history_key(&self) -> &'static str {
        self.history_key
    }

    /// Raw history entries, empty when the field is missing.
    pub fn history(&self) -> &[Value] {
        self.body
            .get(self.history_key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The pending user message, trimmed.
    pub fn pending_message(&self) -> &str {
        self.body
            .get("message")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default()
    }

    /// The requested model id.
    pub fn model(&self) -> &str {
        self.body
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Replaces the history under the key it was read from.
    pub fn set_history(&mut self, history: Vec<Value>) {
        self.body
            .insert(self.history_key.to_string(), Value::Array(history));
    }

    /// Serializes the body.
    pub fn to_json_string(&self) -> Result<String, CompactionSkip> {
        serde_json::to_string(&self.body)
            .map_err(|e| CompactionSkip::MalformedPayload(e.to_string()))
    }
}
