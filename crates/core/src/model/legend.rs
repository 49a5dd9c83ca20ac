use serde::{Deserialize, Serialize};

/// Dimension used to color waterfall bars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LegendType {
    #[default]
    ServiceName,
    SpanType,
}

impl LegendType {
    pub const ALL: [LegendType; 2] = [LegendType::ServiceName, LegendType::SpanType];
}

/// One colored legend entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Legend {
    #[serde(rename = "type")]
    pub legend_type: LegendType,
    pub value: Option<String>,
    /// Hex color, e.g. `#54B399`.
    pub color: String,
}
