use serde::{Deserialize, Serialize};
use trace_waterfall_protocol::{FieldDoc, ItemId};

use super::legend::LegendType;

/// Which kind of timed document a waterfall item was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Transaction,
    Span,
}

/// Span-link counts shown as badges next to an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanLinksCount {
    /// Links declared by the item itself (`span.links`).
    pub linked_parents: usize,
    /// Links from other documents pointing at this item.
    pub linked_children: usize,
}

/// Values an item contributes to each legend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendValues {
    pub service_name: Option<String>,
    /// Span subtype, falling back to span type. Always `None` for transactions.
    pub span_type: Option<String>,
}

impl LegendValues {
    pub fn get(&self, legend_type: LegendType) -> Option<&str> {
        match legend_type {
            LegendType::ServiceName => self.service_name.as_deref(),
            LegendType::SpanType => self.span_type.as_deref(),
        }
    }
}

/// A transaction or span placed on the waterfall.
///
/// All times are in microseconds. `offset` and `skew` are zero until the
/// item has been ordered; after that the item is never mutated again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterfallItem {
    pub doc_type: DocType,
    pub id: ItemId,
    pub parent_id: Option<ItemId>,
    /// Position of the parent in [`Waterfall::items`](super::Waterfall::items).
    pub parent: Option<usize>,
    pub name: Option<String>,
    /// Raw `timestamp.us` of the document.
    pub timestamp: f64,
    /// Distance from the entry transaction's timestamp.
    pub offset: f64,
    /// Clock correction applied on top of `offset`.
    pub skew: f64,
    pub duration: f64,
    pub legend_values: LegendValues,
    pub color: String,
    pub span_links_count: SpanLinksCount,
    pub doc: FieldDoc,
}

impl WaterfallItem {
    /// Skew-corrected start relative to the entry transaction.
    pub fn start(&self) -> f64 {
        self.offset + self.skew
    }

    /// Skew-corrected end relative to the entry transaction.
    pub fn end(&self) -> f64 {
        self.start() + self.duration
    }

    pub fn is_transaction(&self) -> bool {
        self.doc_type == DocType::Transaction
    }
}

/// An error document attached to the waterfall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterfallError {
    pub id: ItemId,
    /// Only set when the parent was found among the waterfall items.
    pub parent_id: Option<ItemId>,
    pub parent: Option<usize>,
    pub message: Option<String>,
    pub timestamp: f64,
    pub offset: f64,
    pub skew: f64,
    pub doc: FieldDoc,
}

impl WaterfallError {
    pub fn start(&self) -> f64 {
        self.offset + self.skew
    }
}
