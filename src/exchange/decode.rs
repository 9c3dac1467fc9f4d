//! Wire decoder for chat-history exchanges.
//!
//! Accepts both field spellings the client emits (`request_nodes` /
//! `requestNodes`, ...) and normalizes to the canonical types. Lookups follow
//! the client's own `a || b` reads: the snake_case value wins unless it is
//! absent or falsy.

use serde_json::{Map, Value};

use super::{ContentNode, Exchange, NodePayload, ToolResult, ToolResultItem, ToolUse};

/// Structured payloads that only contribute their encoded size.
const STRUCTURED_FIELDS: &[(&str, &str)] = &[
    ("image_id_node", "imageIdNode"),
    ("ide_state_node", "ideStateNode"),
    ("edit_events_node", "editEventsNode"),
    ("checkpoint_ref_node", "checkpointRefNode"),
    ("change_personality_node", "changePersonalityNode"),
    ("file_node", "fileNode"),
    ("file_id_node", "fileIdNode"),
];

pub(super) fn decode_exchange(raw: Value) -> Exchange {
    let empty = Map::new();
    let (request_id, request_message, response_text, request_nodes, response_nodes) = {
        let obj = raw.as_object().unwrap_or(&empty);

        let request_nodes = array_of(pick(obj, "request_nodes", "requestNodes"))
            .iter()
            .chain(array_of(pick(
                obj,
                "structured_request_nodes",
                "structuredRequestNodes",
            )))
            .chain(array_of(obj.get("nodes")))
            .map(decode_node)
            .collect();

        let response_nodes = array_of(pick(obj, "response_nodes", "responseNodes"))
            .iter()
            .chain(array_of(pick(
                obj,
                "structured_output_nodes",
                "structuredOutputNodes",
            )))
            .map(decode_node)
            .collect();

        (
            string_of(pick(obj, "request_id", "requestId")).trim().to_string(),
            string_of(pick(obj, "request_message", "requestMessage")),
            string_of(pick(obj, "response_text", "responseText")),
            request_nodes,
            response_nodes,
        )
    };

    Exchange {
        request_id,
        request_message,
        response_text,
        request_nodes,
        response_nodes,
        raw,
    }
}

fn decode_node(value: &Value) -> ContentNode {
    let Some(obj) = value.as_object() else {
        return ContentNode {
            id: 0,
            node_type: -1,
            content: String::new(),
            payloads: Vec::new(),
        };
    };

    let mut payloads = Vec::new();

    if let Some(text) = object_of(pick(obj, "text_node", "textNode")) {
        payloads.push(NodePayload::Text {
            content: string_of(text.get("content")),
        });
    }

    if let Some(tr) = object_of(pick(obj, "tool_result_node", "toolResultNode")) {
        payloads.push(NodePayload::ToolResult(decode_tool_result(tr)));
    }

    if let Some(img) = object_of(pick(obj, "image_node", "imageNode")) {
        payloads.push(NodePayload::Image {
            image_data: string_of(pick(img, "image_data", "imageData")),
        });
    }

    for &(snake, camel) in STRUCTURED_FIELDS {
        if let Some(v) = pick(obj, snake, camel) {
            payloads.push(NodePayload::Structured {
                encoded_len: encoded_len(v),
            });
        }
    }

    if let Some(v) = pick(obj, "history_summary_node", "historySummaryNode") {
        payloads.push(NodePayload::HistorySummary {
            encoded_len: encoded_len(v),
        });
    }

    if let Some(tu) = object_of(pick(obj, "tool_use", "toolUse")) {
        payloads.push(NodePayload::ToolUse(ToolUse {
            tool_use_id: string_of(pick(tu, "tool_use_id", "toolUseId")),
            tool_name: string_of(pick(tu, "tool_name", "toolName")),
            input_json: string_of(pick(tu, "input_json", "inputJson")),
            mcp_server_name: string_of(pick(tu, "mcp_server_name", "mcpServerName")),
            mcp_tool_name: string_of(pick(tu, "mcp_tool_name", "mcpToolName")),
        }));
    }

    if let Some(th) = object_of(obj.get("thinking")) {
        payloads.push(NodePayload::Thinking {
            summary: string_of(th.get("summary")),
        });
    }

    ContentNode {
        id: number_of(obj.get("id")).unwrap_or(0),
        node_type: number_of(obj.get("type")).unwrap_or(-1),
        content: string_of(obj.get("content")),
        payloads,
    }
}

fn decode_tool_result(tr: &Map<String, Value>) -> ToolResult {
    let items = array_of(pick(tr, "content_nodes", "contentNodes"))
        .iter()
        .map(|item| match item.as_object() {
            Some(item) => ToolResultItem {
                text_content: string_of(pick(item, "text_content", "textContent")),
                image_data: object_of(pick(item, "image_content", "imageContent"))
                    .map(|img| string_of(pick(img, "image_data", "imageData"))),
            },
            None => ToolResultItem::default(),
        })
        .collect();

    ToolResult {
        tool_use_id: string_of(pick(tr, "tool_use_id", "toolUseId")),
        content: string_of(tr.get("content")),
        items,
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Looks up a field under its snake_case spelling, then camelCase.
pub(crate) fn pick<'a>(obj: &'a Map<String, Value>, snake: &str, camel: &str) -> Option<&'a Value> {
    obj.get(snake)
        .filter(|v| is_truthy(v))
        .or_else(|| obj.get(camel).filter(|v| is_truthy(v)))
}

fn string_of(v: Option<&Value>) -> String {
    v.and_then(Value::as_str).unwrap_or_default().to_string()
}

fn object_of(v: Option<&Value>) -> Option<&Map<String, Value>> {
    v.and_then(Value::as_object)
}

fn array_of(v: Option<&Value>) -> &[Value] {
    v.and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

fn number_of(v: Option<&Value>) -> Option<i64> {
    let v = v?;
    v.as_i64().or_else(|| {
        v.as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

fn encoded_len(v: &Value) -> usize {
    serde_json::to_string(v).map(|s| s.len()).unwrap_or(0)
}
