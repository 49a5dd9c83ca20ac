use std::collections::HashMap;

use trace_waterfall_protocol::{FieldDoc, ItemId, ProcessorEvent, fields};

use crate::model::{DocType, LegendValues, SpanLinksCount, WaterfallError, WaterfallItem};

/// Field names that differ between transactions and spans.
struct DocFields {
    doc_type: DocType,
    id: &'static str,
    name: &'static str,
    duration: &'static str,
}

const TRANSACTION_FIELDS: DocFields = DocFields {
    doc_type: DocType::Transaction,
    id: fields::TRANSACTION_ID,
    name: fields::TRANSACTION_NAME,
    duration: fields::TRANSACTION_DURATION,
};

const SPAN_FIELDS: DocFields = DocFields {
    doc_type: DocType::Span,
    id: fields::SPAN_ID,
    name: fields::SPAN_NAME,
    duration: fields::SPAN_DURATION,
};

/// Convert every transaction and span document into a waterfall item,
/// keeping input order. Documents of any other kind are dropped.
pub fn normalize_trace_docs(
    docs: &[FieldDoc],
    span_links_count_by_id: &HashMap<String, usize>,
) -> Vec<WaterfallItem> {
    docs.iter()
        .filter_map(|doc| normalize_trace_doc(doc, span_links_count_by_id))
        .collect()
}

/// Convert one document. Returns `None` for unknown `processor.event`
/// values and for documents without an id.
pub fn normalize_trace_doc(
    doc: &FieldDoc,
    span_links_count_by_id: &HashMap<String, usize>,
) -> Option<WaterfallItem> {
    let doc_fields = match doc.processor_event() {
        Some(ProcessorEvent::Transaction) => &TRANSACTION_FIELDS,
        Some(ProcessorEvent::Span) => &SPAN_FIELDS,
        _ => {
            tracing::debug!(
                processor_event = doc.str(fields::PROCESSOR_EVENT),
                "skipping trace document with unsupported processor.event"
            );
            return None;
        }
    };

    let Some(id) = doc.non_empty_str(doc_fields.id) else {
        tracing::debug!(field = doc_fields.id, "skipping trace document without id");
        return None;
    };

    Some(WaterfallItem {
        doc_type: doc_fields.doc_type,
        id: ItemId::from(id),
        parent_id: doc.non_empty_str(fields::PARENT_ID).map(ItemId::from),
        parent: None,
        name: doc.str(doc_fields.name).map(String::from),
        timestamp: doc.f64(fields::TIMESTAMP).unwrap_or(0.0),
        offset: 0.0,
        skew: 0.0,
        duration: doc.f64(doc_fields.duration).unwrap_or(0.0),
        legend_values: legend_values(doc, doc_fields.doc_type),
        color: String::new(),
        span_links_count: SpanLinksCount {
            linked_parents: doc.count(fields::SPAN_LINKS),
            linked_children: span_links_count_by_id.get(id).copied().unwrap_or(0),
        },
        doc: doc.clone(),
    })
}

fn legend_values(doc: &FieldDoc, doc_type: DocType) -> LegendValues {
    let span_type = match doc_type {
        DocType::Span => doc
            .non_empty_str(fields::SPAN_SUBTYPE)
            .or_else(|| doc.str(fields::SPAN_TYPE))
            .map(String::from),
        // Empty, so transactions never share a legend with untyped spans.
        DocType::Transaction => Some(String::new()),
    };
    LegendValues {
        service_name: doc.str(fields::SERVICE_NAME).map(String::from),
        span_type,
    }
}

/// An error document with the parent id it declares. The parent is only
/// linked once attribution finds it among the ordered items.
#[derive(Debug, Clone)]
pub struct NormalizedError {
    pub error: WaterfallError,
    pub declared_parent_id: Option<ItemId>,
}

pub fn normalize_error_doc(doc: &FieldDoc) -> Option<NormalizedError> {
    let Some(id) = doc.non_empty_str(fields::ERROR_ID) else {
        tracing::debug!("skipping error document without error.id");
        return None;
    };
    let message = doc
        .non_empty_str(fields::ERROR_MESSAGE)
        .or_else(|| doc.non_empty_str(fields::ERROR_LOG_MESSAGE))
        .map(String::from);

    Some(NormalizedError {
        error: WaterfallError {
            id: ItemId::from(id),
            parent_id: None,
            parent: None,
            message,
            timestamp: doc.f64(fields::TIMESTAMP).unwrap_or(0.0),
            offset: 0.0,
            skew: 0.0,
            doc: doc.clone(),
        },
        declared_parent_id: doc.non_empty_str(fields::PARENT_ID).map(ItemId::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links() -> HashMap<String, usize> {
        HashMap::from([("s1".to_string(), 4)])
    }

    #[test]
    fn normalizes_transaction() {
        let doc = FieldDoc::new()
            .with(fields::PROCESSOR_EVENT, ["transaction"])
            .with(fields::TRANSACTION_ID, ["t1"])
            .with(fields::TRANSACTION_NAME, ["GET /api"])
            .with(fields::PARENT_ID, ["s0"])
            .with(fields::TIMESTAMP, [1000])
            .with(fields::TRANSACTION_DURATION, [250])
            .with(fields::SERVICE_NAME, ["backend"])
            .with(fields::SPAN_LINKS, ["l1", "l2"]);
        let item = normalize_trace_doc(&doc, &links()).unwrap();
        assert_eq!(item.doc_type, DocType::Transaction);
        assert_eq!(item.id, "t1");
        assert_eq!(item.parent_id.as_deref(), Some("s0"));
        assert_eq!(item.name.as_deref(), Some("GET /api"));
        assert_eq!(item.timestamp, 1000.0);
        assert_eq!(item.duration, 250.0);
        assert_eq!(item.offset, 0.0);
        assert_eq!(item.skew, 0.0);
        assert!(item.color.is_empty());
        assert_eq!(item.legend_values.service_name.as_deref(), Some("backend"));
        assert_eq!(item.legend_values.span_type.as_deref(), Some(""));
        assert_eq!(item.span_links_count.linked_parents, 2);
        assert_eq!(item.span_links_count.linked_children, 0);
    }

    #[test]
    fn span_type_prefers_subtype() {
        let doc = FieldDoc::new()
            .with(fields::PROCESSOR_EVENT, ["span"])
            .with(fields::SPAN_ID, ["s1"])
            .with(fields::SPAN_DURATION, [10])
            .with(fields::SPAN_TYPE, ["db"])
            .with(fields::SPAN_SUBTYPE, ["postgresql"]);
        let item = normalize_trace_doc(&doc, &links()).unwrap();
        assert_eq!(item.doc_type, DocType::Span);
        assert_eq!(item.legend_values.span_type.as_deref(), Some("postgresql"));
        assert_eq!(item.span_links_count.linked_children, 4);

        let without_subtype = FieldDoc::new()
            .with(fields::PROCESSOR_EVENT, ["span"])
            .with(fields::SPAN_ID, ["s2"])
            .with(fields::SPAN_TYPE, ["external"])
            .with(fields::SPAN_SUBTYPE, [""]);
        let item = normalize_trace_doc(&without_subtype, &links()).unwrap();
        assert_eq!(item.legend_values.span_type.as_deref(), Some("external"));
    }

    #[test]
    fn unknown_processor_event_is_skipped() {
        let docs = vec![
            FieldDoc::new()
                .with(fields::PROCESSOR_EVENT, ["metric"])
                .with(fields::TRANSACTION_ID, ["m1"]),
            FieldDoc::new()
                .with(fields::PROCESSOR_EVENT, ["span"])
                .with(fields::SPAN_ID, ["s1"]),
            FieldDoc::new().with(fields::SPAN_ID, ["no-event"]),
        ];
        let items = normalize_trace_docs(&docs, &HashMap::new());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "s1");
    }

    #[test]
    fn document_without_id_is_skipped() {
        let doc = FieldDoc::new().with(fields::PROCESSOR_EVENT, ["transaction"]);
        assert!(normalize_trace_doc(&doc, &HashMap::new()).is_none());
    }

    #[test]
    fn normalizes_error() {
        let doc = FieldDoc::new()
            .with(fields::ERROR_ID, ["e1"])
            .with(fields::PARENT_ID, ["s1"])
            .with(fields::TIMESTAMP, [1200])
            .with(fields::ERROR_LOG_MESSAGE, ["boom"]);
        let normalized = normalize_error_doc(&doc).unwrap();
        assert_eq!(normalized.error.id, "e1");
        assert_eq!(normalized.error.parent_id, None);
        assert_eq!(normalized.error.message.as_deref(), Some("boom"));
        assert_eq!(normalized.declared_parent_id.as_deref(), Some("s1"));
        assert!(normalize_error_doc(&FieldDoc::new()).is_none());
    }
}
