use crate::model::{DocType, WaterfallError, WaterfallItem};

/// What the skew of an item depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SkewSubject {
    /// Transactions start a new service, so their skew is estimated.
    Transaction { timestamp: f64, duration: f64 },
    /// Spans and errors share the clock of their parent.
    Inherited,
}

impl From<&WaterfallItem> for SkewSubject {
    fn from(item: &WaterfallItem) -> Self {
        match item.doc_type {
            DocType::Transaction => SkewSubject::Transaction {
                timestamp: item.timestamp,
                duration: item.duration,
            },
            DocType::Span => SkewSubject::Inherited,
        }
    }
}

impl From<&WaterfallError> for SkewSubject {
    fn from(_: &WaterfallError) -> Self {
        SkewSubject::Inherited
    }
}

/// Clock correction for an item, given its already-corrected parent.
///
/// A child transaction can't start before the parent that called it. If its
/// raw timestamp says otherwise, the gap is attributed to clock drift and
/// the child is pushed right by the gap plus half of the parent's spare time
/// (an estimate of the network latency on the way in).
pub fn clock_skew(subject: SkewSubject, parent: Option<&WaterfallItem>) -> f64 {
    let Some(parent) = parent else {
        return 0.0;
    };
    match subject {
        SkewSubject::Inherited => parent.skew,
        SkewSubject::Transaction {
            timestamp,
            duration,
        } => {
            let parent_start = parent.timestamp + parent.skew;
            let offset_start = parent_start - timestamp;
            if offset_start > 0.0 {
                let latency = (parent.duration - duration).max(0.0) / 2.0;
                offset_start + latency
            } else {
                0.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LegendValues, SpanLinksCount};
    use trace_waterfall_protocol::{FieldDoc, ItemId};

    fn item(doc_type: DocType, timestamp: f64, duration: f64, skew: f64) -> WaterfallItem {
        WaterfallItem {
            doc_type,
            id: ItemId::from("x"),
            parent_id: None,
            parent: None,
            name: None,
            timestamp,
            offset: 0.0,
            skew,
            duration,
            legend_values: LegendValues::default(),
            color: String::new(),
            span_links_count: SpanLinksCount::default(),
            doc: FieldDoc::new(),
        }
    }

    #[test]
    fn no_parent_means_no_skew() {
        let tx = item(DocType::Transaction, 950.0, 50.0, 0.0);
        assert_eq!(clock_skew((&tx).into(), None), 0.0);
    }

    #[test]
    fn spans_inherit_parent_skew() {
        let parent = item(DocType::Transaction, 1000.0, 100.0, 37.0);
        let span = item(DocType::Span, 900.0, 50.0, 0.0);
        assert_eq!(clock_skew((&span).into(), Some(&parent)), 37.0);
    }

    #[test]
    fn errors_inherit_parent_skew() {
        let parent = item(DocType::Span, 1000.0, 100.0, 12.0);
        assert_eq!(clock_skew(SkewSubject::Inherited, Some(&parent)), 12.0);
    }

    #[test]
    fn transaction_starting_before_parent_is_shifted() {
        let parent = item(DocType::Transaction, 1000.0, 200.0, 0.0);
        let child = item(DocType::Transaction, 950.0, 50.0, 0.0);
        // 50 of apparent lead plus half of the 150 the parent has to spare.
        assert_eq!(clock_skew((&child).into(), Some(&parent)), 125.0);
    }

    #[test]
    fn longer_child_gets_no_latency_share() {
        let parent = item(DocType::Transaction, 1000.0, 20.0, 0.0);
        let child = item(DocType::Transaction, 990.0, 50.0, 0.0);
        assert_eq!(clock_skew((&child).into(), Some(&parent)), 10.0);
    }

    #[test]
    fn transaction_starting_after_parent_is_not_shifted() {
        let parent = item(DocType::Transaction, 1000.0, 200.0, 0.0);
        let child = item(DocType::Transaction, 1000.0, 50.0, 0.0);
        assert_eq!(clock_skew((&child).into(), Some(&parent)), 0.0);
        let later = item(DocType::Transaction, 1100.0, 50.0, 0.0);
        assert_eq!(clock_skew((&later).into(), Some(&parent)), 0.0);
    }

    #[test]
    fn parent_skew_moves_parent_start() {
        let parent = item(DocType::Span, 1000.0, 100.0, 30.0);
        let child = item(DocType::Transaction, 1020.0, 100.0, 0.0);
        assert_eq!(clock_skew((&child).into(), Some(&parent)), 10.0);
    }
}
