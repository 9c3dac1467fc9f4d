//! byok-compact: client-side chat history compaction for BYOK model proxies.
//!
//! The [`compaction::CompactionEngine`] looks at each outgoing chat-stream
//! request and, once the conversation outgrows the policy's budget, replaces
//! the oldest exchanges with a single summary exchange. Any failure leaves
//! the request exactly as it was.

pub mod clock;
pub mod compaction;
pub mod config;
pub mod constants;
pub mod exchange;
pub mod output;
pub mod provider;
pub mod tokens;
