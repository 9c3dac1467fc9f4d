//! Splits a history into a droppable head and a verbatim tail.

use crate::exchange::{EstimateSize, Exchange};

/// A history cut at `boundary`: `head = history[..boundary]`,
/// `tail = history[boundary..]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistorySplit<'a> {
    pub head: &'a [Exchange],
    pub tail: &'a [Exchange],
}

impl HistorySplit<'_> {
    /// Index of the first tail exchange.
    pub fn boundary(&self) -> usize {
        self.head.len()
    }
}

/// Splits `history`, newest exchanges going to the tail first.
///
/// An exchange joins the tail while the running size (including it) stays
/// under `tail_budget_chars`, or while the tail is shorter than
/// `min_tail_exchanges`. The first exchange that fails both goes to the head
/// along with everything older. When the whole history is smaller than
/// `trigger_chars` the head is empty.
pub fn split_history(
    history: &[Exchange],
    tail_budget_chars: usize,
    trigger_chars: usize,
    min_tail_exchanges: usize,
) -> HistorySplit<'_> {
    let mut seen = 0usize;
    let mut tail_len = 0usize;
    let mut boundary = 0usize;

    for (i, exchange) in history.iter().enumerate().rev() {
        let size = exchange.estimated_chars();
        if seen.saturating_add(size) < tail_budget_chars || tail_len < min_tail_exchanges {
            tail_len += 1;
            seen = seen.saturating_add(size);
        } else {
            boundary = i + 1;
            break;
        }
    }

    // Re-check against the whole history before committing to a cut.
    if boundary > 0 && history.estimated_chars() < trigger_chars {
        boundary = 0;
    }

    let (head, tail) = history.split_at(boundary);
    HistorySplit { head, tail }
}

/// Moves the boundary back so the tail never starts with a tool result
/// whose call would be left in the head. Never moves past index 0.
pub fn adjust_boundary_for_tool_results(history: &[Exchange], boundary: usize) -> usize {
    let mut i = boundary;
    while i > 0 && history.get(i).is_some_and(Exchange::has_tool_results) {
        i -= 1;
    }
    i
}
