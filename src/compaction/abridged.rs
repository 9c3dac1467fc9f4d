//! Short verbatim transcript of the most recent dropped exchanges.

use crate::constants::{ABRIDGED_ASSISTANT_CHARS, ABRIDGED_USER_CHARS, ABRIDGED_WINDOW_EXCHANGES};
use crate::exchange::Exchange;

const ELLIPSIS: &str = "...";

/// Trims `text` and cuts it to `max_chars` characters, ending in `...` when
/// anything was cut. Lengths count Unicode scalar values.
pub fn truncate_inline(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if max_chars == 0 || text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= ELLIPSIS.len() {
        return ELLIPSIS[..max_chars].to_string();
    }
    let mut out: String = text.chars().take(max_chars - ELLIPSIS.len()).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Renders the last few exchanges of `head` as `<user>`/`<assistant>` blocks.
///
/// Stops after the block that pushes the text past `max_chars`, then cuts
/// the whole text to `max_chars`. Returns an empty string when `max_chars`
/// is zero.
pub fn build_abridged_text(head: &[Exchange], max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }

    let start = head.len().saturating_sub(ABRIDGED_WINDOW_EXCHANGES);
    let mut pieces: Vec<String> = Vec::new();
    // Character length of pieces.join("\n")
    let mut joined_len = 0usize;

    for exchange in &head[start..] {
        let user = truncate_inline(&exchange.request_message, ABRIDGED_USER_CHARS);
        let assistant = truncate_inline(&exchange.response_text, ABRIDGED_ASSISTANT_CHARS);
        if !user.is_empty() {
            push_piece(&mut pieces, &mut joined_len, format!("<user>\n{user}\n</user>"));
        }
        if !assistant.is_empty() {
            push_piece(
                &mut pieces,
                &mut joined_len,
                format!("<assistant>\n{assistant}\n</assistant>"),
            );
        }
        if joined_len > max_chars {
            break;
        }
    }

    truncate_inline(&pieces.join("\n"), max_chars)
}

fn push_piece(pieces: &mut Vec<String>, joined_len: &mut usize, piece: String) {
    if !pieces.is_empty() {
        *joined_len += 1;
    }
    *joined_len += piece.chars().count();
    pieces.push(piece);
}
