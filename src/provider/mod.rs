//! Model backend access for byok-compact.
//!
//! Wraps the proxy's chat endpoint behind the [`ModelTransport`] trait,
//! keeping HTTP details out of the compaction engine, and resolves the model
//! ids the proxy routes on.

mod client;
mod resolve;
mod stream;

pub use client::{
    HttpTransport, ModelTransport, TransportError, TransportRequest, TransportResponse,
};
pub use resolve::{byok_model_id, normalize_model_for_match};
pub use stream::collect_text_deltas;
