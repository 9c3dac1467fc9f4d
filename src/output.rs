//! Terminal rendering of compaction results.
//!
//! Status lines go to stderr so the request body can be piped through stdout.

use colored::Colorize;

use crate::compaction::{CompactionOutcome, CompactionSkip};
use crate::tokens::format_number;

/// One-line description of an applied rewrite.
pub fn format_outcome(outcome: &CompactionOutcome) -> String {
    let source = if outcome.cache_hit {
        "cached summary"
    } else {
        "new summary"
    };
    format!(
        "dropped {} exchanges, kept {} from {} ({} -> {} chars, {})",
        outcome.dropped_exchanges,
        outcome.kept_exchanges,
        outcome.boundary_request_id,
        format_number(outcome.before_chars),
        format_number(outcome.after_chars),
        source
    )
}

/// Whether a skip points at a problem rather than a request that simply
/// did not need compaction.
pub fn is_failure(skip: &CompactionSkip) -> bool {
    matches!(
        skip,
        CompactionSkip::PolicyUnavailable(_)
            | CompactionSkip::MalformedPayload(_)
            | CompactionSkip::StructuralConflict
            | CompactionSkip::MissingBoundaryId
            | CompactionSkip::MissingTemplate
            | CompactionSkip::SummaryModelUnset
            | CompactionSkip::SummarizationFailed(_)
    )
}

/// Prints the result of one engine attempt to stderr.
pub fn print_status(result: &Result<CompactionOutcome, CompactionSkip>) {
    match result {
        Ok(outcome) => eprintln!("{} {}", "compacted:".green().bold(), format_outcome(outcome)),
        Err(skip) if is_failure(skip) => {
            eprintln!("{} request sent unchanged: {}", "warning:".yellow().bold(), skip)
        }
        Err(skip) => eprintln!("{} {}", "unchanged:".dimmed(), skip),
    }
}
