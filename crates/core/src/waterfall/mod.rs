//! Waterfall construction: from the raw trace response to an ordered,
//! skew-corrected [`Waterfall`].

pub mod errors;
pub mod legends;
pub mod order;
pub mod orphans;
pub mod reparent;
pub mod skew;

use trace_waterfall_protocol::{ItemId, TraceResponse};

use crate::ingest::normalize_trace_docs;
use crate::model::{DocType, Waterfall, WaterfallItem};

pub use orphans::orphan_trace_items_count;
pub use skew::{SkewSubject, clock_skew};

/// Build the waterfall for a trace response.
///
/// Without trace documents or without an entry transaction the result is an
/// empty waterfall with every count at zero. This function is pure: the
/// same response always yields the same waterfall.
pub fn build_waterfall(response: &TraceResponse) -> Waterfall {
    let trace_items = &response.trace_items;
    let entry_transaction = match &response.entry_transaction {
        Some(entry) if !trace_items.trace_docs.is_empty() => entry,
        _ => return Waterfall::default(),
    };

    let error_count_by_parent_id = errors::count_by_parent_id(&trace_items.error_docs);

    let mut items = normalize_trace_docs(&trace_items.trace_docs, &trace_items.span_links_count_by_id);
    reparent::reparent_spans(&mut items);
    let children_by_parent_id = order::group_by_parent_id(&items);

    let entry = items
        .iter()
        .position(|item| item.doc_type == DocType::Transaction && item.id == entry_transaction.id());
    let root = children_by_parent_id
        .get(ItemId::ROOT)
        .and_then(|roots| roots.first().copied())
        .filter(|&pos| items[pos].doc_type == DocType::Transaction);
    let root_snapshot = root.map(|pos| items[pos].clone());

    let ordered = match entry {
        Some(entry) => order::order_items(items, &children_by_parent_id, entry),
        None => {
            tracing::debug!(
                entry = entry_transaction.id(),
                "entry transaction not found among trace documents"
            );
            order::OrderedItems {
                positions: vec![None; items.len()],
                items: Vec::new(),
            }
        }
    };
    let mut items = ordered.items;

    // The root keeps its computed timing when it was part of the walk.
    let root_waterfall_transaction = root.and_then(|source| {
        match ordered.positions.get(source).copied().flatten() {
            Some(pos) => items.get(pos).cloned(),
            None => root_snapshot,
        }
    });

    let entry_waterfall_transaction = entry.map(|_| 0).filter(|_| !items.is_empty());
    let error_items = errors::waterfall_errors(
        &trace_items.error_docs,
        &items,
        entry_waterfall_transaction.and_then(|pos| items.get(pos)),
    );

    let legends = legends::legends(&items);
    let color_by = legends::color_by(&legends);
    legends::assign_colors(&mut items, &legends, color_by);
    let root_waterfall_transaction = root_waterfall_transaction.map(|mut root| {
        legends::assign_colors(std::slice::from_mut(&mut root), &legends, color_by);
        root
    });

    let waterfall = Waterfall {
        entry_transaction: Some(entry_transaction.clone()),
        entry_waterfall_transaction,
        root_waterfall_transaction,
        duration: waterfall_duration(&items),
        children_by_parent_id: order::group_by_parent_id(&items),
        legends,
        color_by,
        error_items,
        exceeds_max: trace_items.exceeds_max,
        total_errors_count: trace_items.error_docs.len(),
        trace_docs_total: trace_items.trace_docs_total,
        max_trace_items: trace_items.max_trace_items,
        orphan_trace_items_count: orphan_trace_items_count(&trace_items.trace_docs),
        error_count_by_parent_id,
        items,
    };

    tracing::debug!(
        items = waterfall.items.len(),
        errors = waterfall.error_items.len(),
        orphans = waterfall.orphan_trace_items_count,
        exceeds_max = waterfall.exceeds_max,
        duration_us = waterfall.duration,
        "built waterfall"
    );
    waterfall
}

/// Latest skew-corrected end over all items, never below zero.
fn waterfall_duration(items: &[WaterfallItem]) -> f64 {
    items.iter().map(WaterfallItem::end).fold(0.0, f64::max)
}
