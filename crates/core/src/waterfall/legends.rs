use crate::model::{Legend, LegendType, WaterfallItem};

/// Color-blind safe base palette.
pub const COLOR_BLIND_PALETTE: [&str; 10] = [
    "#54B399", "#6092C0", "#D36086", "#9170B8", "#CA8EAE", "#D6BF57", "#B9A888", "#DA8B45",
    "#AA6556", "#E7664C",
];

/// The base palette repeated `rotations` times. Every rotation after the
/// first is shaded, alternating darker and lighter, so colors stay distinct.
pub fn color_blind_palette(rotations: usize) -> Vec<String> {
    let mut colors = Vec::with_capacity(COLOR_BLIND_PALETTE.len() * rotations);
    for rotation in 0..rotations {
        let factor = rotation_shade(rotation);
        colors.extend(COLOR_BLIND_PALETTE.iter().map(|hex| shade(hex, factor)));
    }
    colors
}

/// 0 for the first rotation, then -0.2, +0.2, -0.4, +0.4, ... capped at 0.8.
fn rotation_shade(rotation: usize) -> f64 {
    if rotation == 0 {
        return 0.0;
    }
    let step = ((rotation + 1) / 2) as f64 * 0.2;
    let step = step.min(0.8);
    if rotation % 2 == 1 { -step } else { step }
}

/// Mix a `#RRGGBB` color towards white (positive factor) or black (negative).
fn shade(hex: &str, factor: f64) -> String {
    if factor == 0.0 {
        return hex.to_string();
    }
    let Some(rgb) = parse_hex(hex) else {
        return hex.to_string();
    };
    let [r, g, b] = rgb.map(|channel| {
        let channel = f64::from(channel);
        let mixed = if factor > 0.0 {
            channel + (255.0 - channel) * factor
        } else {
            channel * (1.0 + factor)
        };
        mixed.round().clamp(0.0, 255.0) as u8
    });
    format!("#{r:02X}{g:02X}{b:02X}")
}

fn parse_hex(hex: &str) -> Option<[u8; 3]> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// Unique legend values per legend type, in item order, each with its own
/// color. Service-name legends come first.
pub fn legends(items: &[WaterfallItem]) -> Vec<Legend> {
    LegendType::ALL
        .iter()
        .flat_map(|&legend_type| {
            let mut values: Vec<Option<&str>> = Vec::new();
            for item in items {
                let value = item.legend_values.get(legend_type);
                if !values.contains(&value) {
                    values.push(value);
                }
            }
            let palette = color_blind_palette(values.len().div_ceil(COLOR_BLIND_PALETTE.len()));
            values
                .into_iter()
                .zip(palette)
                .map(move |(value, color)| Legend {
                    legend_type,
                    value: value.map(String::from),
                    color,
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Traces spanning several services are colored by service, the rest by
/// span type.
pub fn color_by(legends: &[Legend]) -> LegendType {
    let services = legends
        .iter()
        .filter(|legend| legend.legend_type == LegendType::ServiceName)
        .count();
    if services > 1 {
        LegendType::ServiceName
    } else {
        LegendType::SpanType
    }
}

/// Give every item the color of its legend value under `color_by`.
pub fn assign_colors(items: &mut [WaterfallItem], legends: &[Legend], color_by: LegendType) {
    for item in items {
        let value = item.legend_values.get(color_by);
        if let Some(legend) = legends
            .iter()
            .find(|legend| legend.legend_type == color_by && legend.value.as_deref() == value)
        {
            item.color.clone_from(&legend.color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DocType, LegendValues, SpanLinksCount};
    use trace_waterfall_protocol::{FieldDoc, ItemId};

    fn item(service: &str, span_type: Option<&str>) -> WaterfallItem {
        WaterfallItem {
            doc_type: if span_type.is_some() {
                DocType::Span
            } else {
                DocType::Transaction
            },
            id: ItemId::from("x"),
            parent_id: None,
            parent: None,
            name: None,
            timestamp: 0.0,
            offset: 0.0,
            skew: 0.0,
            duration: 0.0,
            legend_values: LegendValues {
                service_name: Some(service.to_string()),
                span_type: span_type.map(String::from),
            },
            color: String::new(),
            span_links_count: SpanLinksCount::default(),
            doc: FieldDoc::new(),
        }
    }

    #[test]
    fn palette_rotations() {
        assert_eq!(color_blind_palette(1).len(), 10);
        assert_eq!(color_blind_palette(1)[0], "#54B399");
        let two = color_blind_palette(2);
        assert_eq!(two.len(), 20);
        assert_ne!(two[10], two[0]);
        assert!(color_blind_palette(0).is_empty());
    }

    #[test]
    fn shading_darkens_and_lightens() {
        assert_eq!(shade("#646464", -0.5), "#323232");
        assert_eq!(shade("#000000", 0.5), "#808080");
        assert_eq!(shade("not-a-color", 0.5), "not-a-color");
    }

    #[test]
    fn legend_values_are_unique_per_type() {
        let items = vec![
            item("frontend", None),
            item("frontend", Some("http")),
            item("backend", Some("db")),
            item("backend", Some("http")),
        ];
        let legends = legends(&items);
        let services: Vec<_> = legends
            .iter()
            .filter(|l| l.legend_type == LegendType::ServiceName)
            .map(|l| l.value.as_deref())
            .collect();
        assert_eq!(services, vec![Some("frontend"), Some("backend")]);
        let span_types: Vec<_> = legends
            .iter()
            .filter(|l| l.legend_type == LegendType::SpanType)
            .map(|l| l.value.as_deref())
            .collect();
        assert_eq!(span_types, vec![None, Some("http"), Some("db")]);
        assert_eq!(legends[0].color, COLOR_BLIND_PALETTE[0]);
        assert_eq!(legends[1].color, COLOR_BLIND_PALETTE[1]);
    }

    #[test]
    fn colors_by_service_when_several_services() {
        let mut items = vec![item("frontend", None), item("backend", Some("db"))];
        let legends = legends(&items);
        let by = color_by(&legends);
        assert_eq!(by, LegendType::ServiceName);
        assert_colors(&mut items, &legends, by);
        assert_eq!(items[0].color, COLOR_BLIND_PALETTE[0]);
        assert_eq!(items[1].color, COLOR_BLIND_PALETTE[1]);
    }

    #[test]
    fn colors_by_span_type_for_single_service() {
        let mut items = vec![item("frontend", None), item("frontend", Some("db"))];
        let legends = legends(&items);
        let by = color_by(&legends);
        assert_eq!(by, LegendType::SpanType);
        assert_colors(&mut items, &legends, by);
        assert_eq!(items[1].color, COLOR_BLIND_PALETTE[1]);
    }

    #[test]
    fn transactions_and_untyped_spans_get_separate_colors() {
        let transaction = item("frontend", Some(""));
        let mut untyped_span = item("frontend", None);
        untyped_span.doc_type = DocType::Span;
        let mut items = vec![transaction, untyped_span];
        items[0].doc_type = DocType::Transaction;

        let legends = legends(&items);
        let span_types: Vec<_> = legends
            .iter()
            .filter(|l| l.legend_type == LegendType::SpanType)
            .map(|l| l.value.as_deref())
            .collect();
        assert_eq!(span_types, vec![Some(""), None]);

        assign_colors(&mut items, &legends, LegendType::SpanType);
        assert_ne!(items[0].color, items[1].color);
    }

    fn assert_colors(items: &mut [WaterfallItem], legends: &[Legend], by: LegendType) {
        assign_colors(items, legends, by);
        assert!(items.iter().all(|item| !item.color.is_empty()));
    }
}
