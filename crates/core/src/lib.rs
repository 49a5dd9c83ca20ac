//! Builds the trace waterfall shown by the APM console: a skew-corrected,
//! time-ordered tree of transactions and spans, with errors attached and a
//! lazily materialized node tree for virtualized rendering.
//!
//! ```text
//!   TraceResponse ──▶ ingest ──▶ waterfall::build_waterfall ──▶ Waterfall
//!                                                                 │
//!                    views::trace_tree (build / update / flatten) ◀┘
//! ```

pub mod ingest;
pub mod model;
pub mod views;
pub mod waterfall;

pub use model::{
    DocType, FlatWaterfallNode, Legend, LegendType, LegendValues, SpanLinksCount, TreeOptions,
    Waterfall, WaterfallError, WaterfallItem, WaterfallNode,
};
pub use views::critical_path::{CriticalPath, CriticalPathSegment, get_critical_path};
pub use views::trace_tree::{
    CriticalPathFilter, build_trace_tree, flatten_tree, update_trace_tree_node,
};
pub use waterfall::build_waterfall;
