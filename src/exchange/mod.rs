//! Conversation exchange types for byok-compact.
//!
//! An [`Exchange`] is one past request/response turn of a chat history as the
//! editor client sends it. The wire format is loosely typed (every field has a
//! snake_case and a camelCase spelling, and content nodes carry optional
//! payload objects), so exchanges are decoded once at the boundary into the
//! canonical types here. The original JSON of each exchange is kept alongside
//! so retained turns are re-emitted exactly as received.

mod decode;
mod size;

pub(crate) use decode::pick;
pub use size::{EstimateSize, NODE_OVERHEAD_CHARS, TOOL_RESULT_ITEM_OVERHEAD_CHARS};

use serde_json::{json, Value};

/// Request node type: plain text.
pub const REQUEST_NODE_TEXT: i64 = 0;
/// Request node type: result of a tool invocation.
pub const REQUEST_NODE_TOOL_RESULT: i64 = 1;
/// Request node type: inline image.
pub const REQUEST_NODE_IMAGE: i64 = 2;
/// Request node type: reference to an uploaded image.
pub const REQUEST_NODE_IMAGE_ID: i64 = 3;
/// Request node type: IDE state snapshot.
pub const REQUEST_NODE_IDE_STATE: i64 = 4;
/// Request node type: editor edit events.
pub const REQUEST_NODE_EDIT_EVENTS: i64 = 5;
/// Request node type: checkpoint reference.
pub const REQUEST_NODE_CHECKPOINT_REF: i64 = 6;
/// Request node type: personality change.
pub const REQUEST_NODE_CHANGE_PERSONALITY: i64 = 7;
/// Request node type: attached file.
pub const REQUEST_NODE_FILE: i64 = 8;
/// Request node type: reference to an uploaded file.
pub const REQUEST_NODE_FILE_ID: i64 = 9;
/// Request node type: compacted history summary.
pub const REQUEST_NODE_HISTORY_SUMMARY: i64 = 10;

/// Node id used for the synthetic history-summary node.
pub const SUMMARY_NODE_ID: i64 = -10;

/// A tool invocation the assistant emitted in a response node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolUse {
    pub tool_use_id: String,
    pub tool_name: String,
    pub input_json: String,
    pub mcp_server_name: String,
    pub mcp_tool_name: String,
}

/// One item of a tool result's structured content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolResultItem {
    pub text_content: String,
    /// Encoded image payload, when the item is an image.
    pub image_data: Option<String>,
}

/// The result of a tool invocation, sent back to the model in a request node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolResult {
    pub tool_use_id: String,
    pub content: String,
    pub items: Vec<ToolResultItem>,
}

/// A typed payload attached to a [`ContentNode`].
///
/// A node normally carries exactly one payload, but the decoder keeps every
/// payload object it finds so size estimates match what is actually sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodePayload {
    Text { content: String },
    ToolResult(ToolResult),
    Image { image_data: String },
    ToolUse(ToolUse),
    Thinking { summary: String },
    /// A previously inserted history summary. Only its encoded size matters here.
    HistorySummary { encoded_len: usize },
    /// Any other structured payload (IDE state, edit events, file refs, ...),
    /// kept only as the length of its JSON encoding.
    Structured { encoded_len: usize },
}

/// A single structured content node of a request or response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentNode {
    pub id: i64,
    /// Wire type code, `-1` when absent or not a number.
    pub node_type: i64,
    pub content: String,
    pub payloads: Vec<NodePayload>,
}

impl ContentNode {
    /// True for a tool-result node that actually carries a tool result.
    pub fn is_tool_result(&self) -> bool {
        self.node_type == REQUEST_NODE_TOOL_RESULT
            && self
                .payloads
                .iter()
                .any(|p| matches!(p, NodePayload::ToolResult(_)))
    }

    /// True for a history-summary node that actually carries a summary.
    pub fn is_history_summary(&self) -> bool {
        self.node_type == REQUEST_NODE_HISTORY_SUMMARY
            && self
                .payloads
                .iter()
                .any(|p| matches!(p, NodePayload::HistorySummary { .. }))
    }
}

/// One past turn of a conversation.
///
/// `request_nodes` is the concatenation of the wire's `request_nodes`,
/// `structured_request_nodes` and `nodes` arrays; `response_nodes` joins
/// `response_nodes` and `structured_output_nodes`.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub request_id: String,
    pub request_message: String,
    pub response_text: String,
    pub request_nodes: Vec<ContentNode>,
    pub response_nodes: Vec<ContentNode>,
    raw: Value,
}

impl Exchange {
    /// Decodes an exchange from its wire JSON. Never fails: missing or
    /// mistyped fields decode as empty.
    pub fn from_value(raw: Value) -> Self {
        decode::decode_exchange(raw)
    }

    /// Decodes every element of a JSON history array.
    pub fn decode_history(items: &[Value]) -> Vec<Self> {
        items.iter().cloned().map(Self::from_value).collect()
    }

    /// The wire JSON this exchange was decoded from.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    /// Whether any request node is a tool result.
    pub fn has_tool_results(&self) -> bool {
        self.request_nodes.iter().any(ContentNode::is_tool_result)
    }

    /// Whether any request node is a history summary.
    pub fn has_history_summary(&self) -> bool {
        self.request_nodes.iter().any(ContentNode::is_history_summary)
    }

    /// Builds a plain text-only exchange with no structured nodes.
    pub fn plain(
        request_id: impl Into<String>,
        request_message: impl Into<String>,
        response_text: impl Into<String>,
    ) -> Self {
        Self::from_value(json!({
            "request_id": request_id.into(),
            "request_message": request_message.into(),
            "response_text": response_text.into(),
            "request_nodes": [],
            "structured_request_nodes": [],
            "nodes": [],
            "response_nodes": [],
            "structured_output_nodes": []
        }))
    }

    /// Builds the synthetic exchange that feeds a previous summary into a
    /// rolling summarization call.
    pub fn previous_summary(summary_text: &str) -> Self {
        Self::plain(
            crate::constants::PREVIOUS_SUMMARY_REQUEST_ID,
            format!(
                "[PREVIOUS_SUMMARY]\n{}\n[/PREVIOUS_SUMMARY]",
                summary_text.trim()
            ),
            "",
        )
    }

    /// Builds the synthetic exchange that replaces a dropped history head.
    ///
    /// `summary_node` becomes the `history_summary_node` of a single request
    /// node of type [`REQUEST_NODE_HISTORY_SUMMARY`].
    pub fn history_summary(summary_node: Value) -> Self {
        Self::from_value(json!({
            "request_id": crate::constants::SUMMARY_REQUEST_ID,
            "request_message": "",
            "response_text": "",
            "request_nodes": [{
                "id": SUMMARY_NODE_ID,
                "type": REQUEST_NODE_HISTORY_SUMMARY,
                "content": "",
                "history_summary_node": summary_node
            }],
            "structured_request_nodes": [],
            "nodes": [],
            "response_nodes": [],
            "structured_output_nodes": []
        }))
    }
}

/// Whether a history has already been compacted.
pub fn history_contains_summary(history: &[Exchange]) -> bool {
    history.iter().any(Exchange::has_history_summary)
}

#[cfg(test)]
mod tests;
