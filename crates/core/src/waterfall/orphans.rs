use std::collections::HashSet;

use trace_waterfall_protocol::{FieldDoc, ProcessorEvent, fields};

/// Number of documents whose declared parent is not among the fetched
/// documents. Reachability from the entry transaction plays no role here.
pub fn orphan_trace_items_count(trace_docs: &[FieldDoc]) -> usize {
    let ids: HashSet<&str> = trace_docs.iter().filter_map(doc_id).collect();
    trace_docs
        .iter()
        .filter_map(|doc| doc.non_empty_str(fields::PARENT_ID))
        .filter(|parent_id| !ids.contains(parent_id))
        .count()
}

fn doc_id(doc: &FieldDoc) -> Option<&str> {
    match doc.processor_event() {
        Some(ProcessorEvent::Span) => doc.str(fields::SPAN_ID),
        _ => doc.str(fields::TRANSACTION_ID),
    }
}
