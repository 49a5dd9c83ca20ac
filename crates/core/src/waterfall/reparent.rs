use std::collections::HashMap;

use trace_waterfall_protocol::{ItemId, fields};

use crate::model::{DocType, WaterfallItem};

/// Apply the child links that spans declare through `child.id`.
///
/// Every item named in some span's `child.id` list gets that span as its
/// parent. When several spans claim the same child, the span that comes
/// last in input order wins.
pub fn reparent_spans(items: &mut [WaterfallItem]) {
    let mut parent_by_child_id: HashMap<ItemId, ItemId> = HashMap::new();
    for item in items.iter().filter(|item| item.doc_type == DocType::Span) {
        for child_id in item.doc.strs(fields::CHILD_ID) {
            parent_by_child_id.insert(ItemId::from(child_id), item.id.clone());
        }
    }
    if parent_by_child_id.is_empty() {
        return;
    }

    for item in items.iter_mut() {
        if let Some(parent_id) = parent_by_child_id.get(item.id.as_str()) {
            tracing::trace!(
                item = %item.id,
                from = ?item.parent_id.as_deref(),
                to = %parent_id,
                "re-parenting item declared as child"
            );
            item.parent_id = Some(parent_id.clone());
        }
    }
}
