//! Approximate character footprint of exchanges and histories.
//!
//! The estimate sums the textual (or encoded binary) payload of every
//! structured node, which is what the backend ends up tokenizing. Lengths are
//! UTF-8 byte lengths; the 4-bytes-per-token approximation in
//! [`crate::tokens`] is calibrated against the same measure.

use super::{ContentNode, Exchange, NodePayload};

/// Fixed cost charged for every content node, including malformed ones.
pub const NODE_OVERHEAD_CHARS: usize = 16;

/// Fixed cost charged for every item inside a tool result.
pub const TOOL_RESULT_ITEM_OVERHEAD_CHARS: usize = 8;

/// Anything whose size can be estimated in characters.
pub trait EstimateSize {
    fn estimated_chars(&self) -> usize;
}

impl EstimateSize for NodePayload {
    fn estimated_chars(&self) -> usize {
        match self {
            NodePayload::Text { content } => content.len(),
            NodePayload::ToolResult(tr) => {
                let items: usize = tr
                    .items
                    .iter()
                    .map(|item| {
                        TOOL_RESULT_ITEM_OVERHEAD_CHARS
                            + item.text_content.len()
                            + item.image_data.as_deref().map_or(0, str::len)
                    })
                    .sum();
                tr.tool_use_id.len() + tr.content.len() + items
            }
            NodePayload::Image { image_data } => image_data.len(),
            NodePayload::ToolUse(tu) => {
                tu.tool_use_id.len()
                    + tu.tool_name.len()
                    + tu.input_json.len()
                    + tu.mcp_server_name.len()
                    + tu.mcp_tool_name.len()
            }
            NodePayload::Thinking { summary } => summary.len(),
            NodePayload::HistorySummary { encoded_len } => *encoded_len,
            NodePayload::Structured { encoded_len } => *encoded_len,
        }
    }
}

impl EstimateSize for ContentNode {
    fn estimated_chars(&self) -> usize {
        NODE_OVERHEAD_CHARS
            + self.content.len()
            + self
                .payloads
                .iter()
                .map(EstimateSize::estimated_chars)
                .sum::<usize>()
    }
}

impl EstimateSize for Exchange {
    /// Structured nodes when present, otherwise the flat text fields,
    /// evaluated separately for the request and the response side.
    fn estimated_chars(&self) -> usize {
        let request = if self.request_nodes.is_empty() {
            self.request_message.len()
        } else {
            self.request_nodes.estimated_chars()
        };
        let response = if self.response_nodes.is_empty() {
            self.response_text.len()
        } else {
            self.response_nodes.estimated_chars()
        };
        request.saturating_add(response)
    }
}

impl<T: EstimateSize> EstimateSize for [T] {
    fn estimated_chars(&self) -> usize {
        self.iter()
            .map(EstimateSize::estimated_chars)
            .fold(0usize, usize::saturating_add)
    }
}

impl<T: EstimateSize> EstimateSize for Vec<T> {
    fn estimated_chars(&self) -> usize {
        self.as_slice().estimated_chars()
    }
}
