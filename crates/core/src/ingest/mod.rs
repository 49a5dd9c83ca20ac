//! Ingestion: decoding the trace API response and mapping its columnar
//! documents onto typed waterfall items.

pub mod normalize;

use thiserror::Error;
use trace_waterfall_protocol::TraceResponse;

pub use normalize::{normalize_error_doc, normalize_trace_doc, normalize_trace_docs};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a JSON object at the top level")]
    NotAnObject,
}

/// Decode a trace API response from JSON bytes.
///
/// Only the envelope is validated here; individual documents that cannot be
/// turned into waterfall items are skipped later, during normalization.
pub fn parse_trace_response(data: &[u8]) -> Result<TraceResponse, ParseError> {
    let value: serde_json::Value = serde_json::from_slice(data)?;
    if !value.is_object() {
        return Err(ParseError::NotAnObject);
    }
    let response: TraceResponse = serde_json::from_value(value)?;
    tracing::trace!(
        trace_docs = response.trace_items.trace_docs.len(),
        error_docs = response.trace_items.error_docs.len(),
        has_entry = response.entry_transaction.is_some(),
        "parsed trace response"
    );
    Ok(response)
}
