use std::collections::HashMap;

use serde::Serialize;
use trace_waterfall_protocol::{EntryTransaction, ItemId};

use super::item::{WaterfallError, WaterfallItem};
use super::legend::{Legend, LegendType};

/// A fully ordered, skew-corrected trace, ready for rendering.
///
/// `items` is a pre-order walk of the entry transaction's subtree, siblings
/// ascending by raw timestamp. Everything else indexes into it.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Waterfall {
    /// The entry transaction as returned by the API.
    pub entry_transaction: Option<EntryTransaction>,
    /// Position of the entry transaction in `items` (always the first one).
    pub entry_waterfall_transaction: Option<usize>,
    /// First parentless transaction of the trace. May lie outside the entry
    /// transaction's subtree, so it is kept by value.
    pub root_waterfall_transaction: Option<WaterfallItem>,
    /// Latest skew-corrected end over all items, in µs.
    pub duration: f64,
    pub items: Vec<WaterfallItem>,
    /// Parent id (or [`ItemId::ROOT`]) to positions of its children in `items`.
    pub children_by_parent_id: HashMap<ItemId, Vec<usize>>,
    pub legends: Vec<Legend>,
    /// Legend whose colors are applied to `items`.
    pub color_by: LegendType,
    pub error_items: Vec<WaterfallError>,
    pub exceeds_max: bool,
    pub total_errors_count: usize,
    pub trace_docs_total: u64,
    pub max_trace_items: u64,
    pub orphan_trace_items_count: usize,
    pub(crate) error_count_by_parent_id: HashMap<ItemId, usize>,
}

impl Waterfall {
    pub fn entry_waterfall_transaction(&self) -> Option<&WaterfallItem> {
        self.entry_waterfall_transaction
            .and_then(|pos| self.items.get(pos))
    }

    pub fn item(&self, pos: usize) -> Option<&WaterfallItem> {
        self.items.get(pos)
    }

    /// Positions of the direct children of `parent_id`.
    pub fn children(&self, parent_id: &str) -> &[usize] {
        self.children_by_parent_id
            .get(parent_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn parent_of(&self, item: &WaterfallItem) -> Option<&WaterfallItem> {
        item.parent.and_then(|pos| self.items.get(pos))
    }

    /// Number of error documents whose `parent.id` is `parent_id`.
    pub fn get_error_count(&self, parent_id: &str) -> usize {
        self.error_count_by_parent_id
            .get(parent_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn legend_color(&self, legend_type: LegendType, value: Option<&str>) -> Option<&str> {
        self.legends
            .iter()
            .find(|l| l.legend_type == legend_type && l.value.as_deref() == value)
            .map(|l| l.color.as_str())
    }
}
