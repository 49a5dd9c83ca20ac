use std::collections::{HashMap, HashSet};

use trace_waterfall_protocol::{FieldDoc, ItemId, fields};

use super::skew::{SkewSubject, clock_skew};
use crate::ingest::normalize_error_doc;
use crate::model::{WaterfallError, WaterfallItem};

/// Count raw error documents per declared `parent.id`.
///
/// This runs over every error document, including the ones that are later
/// dropped because they sit outside the entry transaction.
pub fn count_by_parent_id(error_docs: &[FieldDoc]) -> HashMap<ItemId, usize> {
    let mut counts = HashMap::new();
    for parent_id in error_docs
        .iter()
        .filter_map(|doc| doc.non_empty_str(fields::PARENT_ID))
    {
        *counts.entry(ItemId::from(parent_id)).or_insert(0) += 1;
    }
    counts
}

/// Attach error documents to the ordered items.
///
/// Each error is linked to the first item carrying its declared parent id
/// and inherits that item's skew. With an entry transaction, only errors
/// whose parent chain leads back to it are kept.
pub fn waterfall_errors(
    error_docs: &[FieldDoc],
    items: &[WaterfallItem],
    entry: Option<&WaterfallItem>,
) -> Vec<WaterfallError> {
    let entry_timestamp = entry.map_or(0.0, |entry| entry.timestamp);
    let errors: Vec<WaterfallError> = error_docs
        .iter()
        .filter_map(normalize_error_doc)
        .map(|normalized| {
            let mut error = normalized.error;
            let parent = normalized
                .declared_parent_id
                .as_deref()
                .and_then(|parent_id| items.iter().position(|item| item.id == parent_id));
            let parent_item = parent.map(|pos| &items[pos]);

            error.parent = parent;
            error.parent_id = parent_item.map(|item| item.id.clone());
            error.offset = error.timestamp - entry_timestamp;
            error.skew = clock_skew(SkewSubject::from(&error), parent_item);
            error
        })
        .collect();

    let Some(entry) = entry else {
        return errors;
    };

    let mut parent_lookup: HashMap<&str, &str> = HashMap::new();
    for item in items {
        parent_lookup.insert(&item.id, item.parent_id.as_deref().unwrap_or(ItemId::ROOT));
    }
    for error in &errors {
        parent_lookup.insert(&error.id, error.parent_id.as_deref().unwrap_or(ItemId::ROOT));
    }

    let kept: Vec<bool> = errors
        .iter()
        .map(|error| is_in_entry_transaction(&parent_lookup, &entry.id, &error.id))
        .collect();
    let total = errors.len();
    let errors: Vec<WaterfallError> = errors
        .into_iter()
        .zip(kept)
        .filter_map(|(error, keep)| keep.then_some(error))
        .collect();

    if errors.len() < total {
        tracing::debug!(
            dropped = total - errors.len(),
            entry = %entry.id,
            "dropped errors outside the entry transaction"
        );
    }
    errors
}

/// Follow parent links from `id` until the entry transaction is reached,
/// the chain ends, or it loops.
fn is_in_entry_transaction(parent_lookup: &HashMap<&str, &str>, entry_id: &str, id: &str) -> bool {
    let mut seen = HashSet::new();
    let mut current = id;
    loop {
        if current == entry_id {
            return true;
        }
        if !seen.insert(current) {
            return false;
        }
        match parent_lookup.get(current) {
            Some(&parent_id) => current = parent_id,
            None => return false,
        }
    }
}
