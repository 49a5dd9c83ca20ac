pub mod item;
pub mod legend;
pub mod node;
pub mod waterfall;

pub use item::{DocType, LegendValues, SpanLinksCount, WaterfallError, WaterfallItem};
pub use legend::{Legend, LegendType};
pub use node::{FlatWaterfallNode, TreeOptions, WaterfallNode};
pub use waterfall::Waterfall;
