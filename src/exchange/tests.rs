use super::*;
use serde_json::json;

fn tool_result_exchange(id: &str) -> Exchange {
    Exchange::from_value(json!({
        "request_id": id,
        "request_nodes": [{
            "id": 1,
            "type": REQUEST_NODE_TOOL_RESULT,
            "content": "",
            "tool_result_node": {
                "tool_use_id": "tool-1",
                "content": "OK",
                "content_nodes": [{ "type": 1, "text_content": "OK" }],
                "is_error": false
            }
        }],
        "response_text": "done"
    }))
}

#[test]
fn test_decode_snake_case_exchange() {
    let ex = Exchange::from_value(json!({
        "request_id": " r1 ",
        "request_message": "hello",
        "response_text": "hi there",
        "request_nodes": [{
            "id": 1,
            "type": 0,
            "content": "",
            "text_node": { "content": "hello" }
        }],
        "response_nodes": []
    }));
    assert_eq!(ex.request_id, "r1");
    assert_eq!(ex.request_message, "hello");
    assert_eq!(ex.request_nodes.len(), 1);
    assert_eq!(
        ex.request_nodes[0].payloads,
        vec![NodePayload::Text {
            content: "hello".into()
        }]
    );
    assert!(ex.response_nodes.is_empty());
}

#[test]
fn test_decode_camel_case_exchange() {
    let ex = Exchange::from_value(json!({
        "requestId": "r2",
        "requestMessage": "q",
        "responseText": "a",
        "requestNodes": [{
            "id": 3,
            "type": 1,
            "toolResultNode": {
                "toolUseId": "t",
                "content": "out",
                "contentNodes": [{ "textContent": "x", "imageContent": { "imageData": "AAAA" } }]
            }
        }],
        "structuredOutputNodes": [{
            "id": 4,
            "type": 5,
            "toolUse": { "toolName": "view", "inputJson": "{}" }
        }]
    }));
    assert_eq!(ex.request_id, "r2");
    assert!(ex.has_tool_results());
    let NodePayload::ToolResult(tr) = &ex.request_nodes[0].payloads[0] else {
        panic!("expected tool result payload");
    };
    assert_eq!(tr.tool_use_id, "t");
    assert_eq!(tr.items[0].image_data.as_deref(), Some("AAAA"));
    let NodePayload::ToolUse(tool_use) = &ex.response_nodes[0].payloads[0] else {
        panic!("expected tool use payload");
    };
    assert_eq!(tool_use.tool_name, "view");
}

#[test]
fn test_snake_case_wins_when_both_present() {
    let ex = Exchange::from_value(json!({
        "request_id": "snake",
        "requestId": "camel",
        "request_message": "",
        "requestMessage": "fallback"
    }));
    assert_eq!(ex.request_id, "snake");
    // An empty snake_case string falls through to the camelCase spelling.
    assert_eq!(ex.request_message, "fallback");
}

#[test]
fn test_nodes_concatenate_in_wire_order() {
    let ex = Exchange::from_value(json!({
        "request_nodes": [{ "id": 1, "type": 0 }],
        "structured_request_nodes": [{ "id": 2, "type": 0 }],
        "nodes": [{ "id": 3, "type": 0 }],
        "response_nodes": [{ "id": 4, "type": 0 }],
        "structured_output_nodes": [{ "id": 5, "type": 0 }]
    }));
    let ids: Vec<i64> = ex.request_nodes.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    let ids: Vec<i64> = ex.response_nodes.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![4, 5]);
}

#[test]
fn test_malformed_shapes_decode_without_error() {
    let ex = Exchange::from_value(json!("not an object"));
    assert!(ex.request_id.is_empty());
    assert_eq!(ex.estimated_chars(), 0);

    let ex = Exchange::from_value(json!({
        "request_nodes": ["junk", 42, { "type": "1", "tool_result_node": [] }]
    }));
    assert_eq!(ex.request_nodes.len(), 3);
    assert!(!ex.has_tool_results());
    assert_eq!(ex.request_nodes[0].node_type, -1);
    // Each malformed node costs only the fixed overhead.
    assert_eq!(ex.estimated_chars(), 3 * NODE_OVERHEAD_CHARS);
}

#[test]
fn test_tool_result_requires_type_and_payload() {
    let typed_without_payload = Exchange::from_value(json!({
        "request_nodes": [{ "type": 1, "content": "x" }]
    }));
    assert!(!typed_without_payload.has_tool_results());

    let payload_without_type = Exchange::from_value(json!({
        "request_nodes": [{ "type": 0, "tool_result_node": { "content": "x" } }]
    }));
    assert!(!payload_without_type.has_tool_results());

    assert!(tool_result_exchange("r").has_tool_results());
}

#[test]
fn test_size_falls_back_to_flat_text() {
    let ex = Exchange::plain("r1", "abcd", "efghij");
    assert_eq!(ex.estimated_chars(), 10);
}

#[test]
fn test_size_sums_structured_nodes() {
    let ex = tool_result_exchange("r1");
    // request: 16 overhead + tool_use_id(6) + content(2) + item(8 + 2)
    // response: flat "done"
    assert_eq!(ex.estimated_chars(), 16 + 6 + 2 + 8 + 2 + 4);
}

#[test]
fn test_size_counts_every_payload_kind() {
    let ex = Exchange::from_value(json!({
        "request_nodes": [
            { "type": 0, "content": "ab", "text_node": { "content": "cde" } },
            { "type": 2, "image_node": { "image_data": "12345" } },
            { "type": 4, "ide_state_node": { "k": 1 } }
        ],
        "response_nodes": [
            {
                "type": 5,
                "tool_use": { "tool_use_id": "u", "tool_name": "nm", "input_json": "{}" }
            },
            { "type": 8, "thinking": { "summary": "hmm" } }
        ]
    }));
    let ide_len = r#"{"k":1}"#.len();
    let expected = (16 + 2 + 3) + (16 + 5) + (16 + ide_len) + (16 + 1 + 2 + 2) + (16 + 3);
    assert_eq!(ex.estimated_chars(), expected);
}

#[test]
fn test_history_size_is_sum_of_exchanges() {
    let history = vec![
        Exchange::plain("a", "12", "34"),
        Exchange::plain("b", "5", ""),
        tool_result_exchange("c"),
    ];
    let expected: usize = history.iter().map(|h| h.estimated_chars()).sum();
    assert_eq!(history.estimated_chars(), expected);
}

#[test]
fn test_history_summary_detection() {
    let summary = Exchange::history_summary(json!({ "summary_text": "s" }));
    assert!(summary.has_history_summary());
    assert!(history_contains_summary(&[Exchange::plain("a", "x", "y"), summary]));
    assert!(!history_contains_summary(&[Exchange::plain("a", "x", "y")]));

    // camelCase summary payloads count too
    let camel = Exchange::from_value(json!({
        "requestNodes": [{ "type": 10, "historySummaryNode": { "summary_text": "s" } }]
    }));
    assert!(camel.has_history_summary());
}

#[test]
fn test_raw_json_is_preserved() {
    let raw = json!({
        "request_id": "r9",
        "request_message": "m",
        "extra_field": { "keep": true }
    });
    let ex = Exchange::from_value(raw.clone());
    assert_eq!(ex.raw(), &raw);
    assert_eq!(ex.into_raw(), raw);
}

#[test]
fn test_previous_summary_exchange_shape() {
    let ex = Exchange::previous_summary("  earlier work  ");
    assert_eq!(ex.request_id, crate::constants::PREVIOUS_SUMMARY_REQUEST_ID);
    assert_eq!(
        ex.request_message,
        "[PREVIOUS_SUMMARY]\nearlier work\n[/PREVIOUS_SUMMARY]"
    );
    assert!(ex.request_nodes.is_empty());
}
