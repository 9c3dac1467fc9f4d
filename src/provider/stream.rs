//! NDJSON chat-stream parsing.

use serde_json::Value;

/// Concatenates the `text` deltas of an NDJSON chat-stream body.
///
/// Blank lines, lines that are not JSON objects and objects without a
/// string `text` are skipped. The result is trimmed.
pub fn collect_text_deltas(body: &str) -> String {
    let mut out = String::new();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        if let Some(delta) = obj.get("text").and_then(Value::as_str) {
            out.push_str(delta);
        }
    }
    out.trim().to_string()
}
