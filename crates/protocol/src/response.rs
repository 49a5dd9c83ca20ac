use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::FieldDoc;

/// Response of the trace endpoint: the entry transaction the user navigated
/// to, plus every document of the trace that the backend returned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceResponse {
    #[serde(default)]
    pub entry_transaction: Option<EntryTransaction>,
    #[serde(default)]
    pub trace_items: TraceItems,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceItems {
    /// Transactions and spans, in backend order.
    #[serde(default)]
    pub trace_docs: Vec<FieldDoc>,
    #[serde(default)]
    pub error_docs: Vec<FieldDoc>,
    /// Number of documents linking to a given span/transaction id.
    #[serde(default)]
    pub span_links_count_by_id: HashMap<String, usize>,
    /// Set when the backend truncated the trace at `max_trace_items`.
    #[serde(default)]
    pub exceeds_max: bool,
    #[serde(default)]
    pub trace_docs_total: u64,
    #[serde(default)]
    pub max_trace_items: u64,
}

/// The entry transaction as a nested document. Only `transaction.id` is
/// read; everything else is kept verbatim for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryTransaction {
    pub transaction: TransactionRef,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRef {
    pub id: String,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl EntryTransaction {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            transaction: TransactionRef {
                id: id.into(),
                other: Map::new(),
            },
            other: Map::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.transaction.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;

    #[test]
    fn deserializes_camel_case_response() {
        let json = r#"{
            "entryTransaction": {
                "transaction": {"id": "t0", "name": "GET /"},
                "service": {"name": "frontend"}
            },
            "traceItems": {
                "traceDocs": [{"processor.event": ["transaction"], "transaction.id": ["t0"]}],
                "errorDocs": [],
                "spanLinksCountById": {"t0": 2},
                "exceedsMax": true,
                "traceDocsTotal": 12000,
                "maxTraceItems": 5000
            }
        }"#;
        let response: TraceResponse = serde_json::from_str(json).unwrap();
        let entry = response.entry_transaction.unwrap();
        assert_eq!(entry.id(), "t0");
        assert!(entry.other.contains_key("service"));
        assert_eq!(entry.transaction.other["name"], "GET /");

        let items = response.trace_items;
        assert_eq!(items.trace_docs.len(), 1);
        assert_eq!(items.trace_docs[0].str(fields::TRANSACTION_ID), Some("t0"));
        assert_eq!(items.span_links_count_by_id["t0"], 2);
        assert!(items.exceeds_max);
        assert_eq!(items.trace_docs_total, 12000);
        assert_eq!(items.max_trace_items, 5000);
    }

    #[test]
    fn missing_sections_default() {
        let response: TraceResponse = serde_json::from_str("{}").unwrap();
        assert!(response.entry_transaction.is_none());
        assert!(response.trace_items.trace_docs.is_empty());
        assert!(!response.trace_items.exceeds_max);
    }
}
