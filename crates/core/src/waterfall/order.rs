use std::collections::HashMap;

use trace_waterfall_protocol::ItemId;

use super::skew::{SkewSubject, clock_skew};
use crate::model::WaterfallItem;

/// Parent id (or [`ItemId::ROOT`]) to positions of its children.
pub type ChildrenByParentId = HashMap<ItemId, Vec<usize>>;

/// Group item positions by parent id, keeping input order inside a group.
pub fn group_by_parent_id(items: &[WaterfallItem]) -> ChildrenByParentId {
    let root = ItemId::from(ItemId::ROOT);
    let mut groups = ChildrenByParentId::new();
    for (pos, item) in items.iter().enumerate() {
        let key = item.parent_id.clone().unwrap_or_else(|| root.clone());
        groups.entry(key).or_default().push(pos);
    }
    groups
}

/// Result of [`order_items`].
#[derive(Debug)]
pub struct OrderedItems {
    /// Pre-order walk from the entry transaction.
    pub items: Vec<WaterfallItem>,
    /// For every input position, where the item ended up (if reachable).
    pub positions: Vec<Option<usize>>,
}

/// Walk the entry transaction's subtree in pre-order and finalize every
/// reachable item: parent link, offset from the entry timestamp, and skew.
///
/// Children are visited in ascending raw timestamp order (stable for ties).
/// The walk uses an explicit stack so deep traces can't overflow the call
/// stack, and each input item is placed at most once, which also breaks
/// parent cycles. Items outside the subtree are dropped.
pub fn order_items(
    items: Vec<WaterfallItem>,
    children_by_parent_id: &ChildrenByParentId,
    entry: usize,
) -> OrderedItems {
    let Some(entry_timestamp) = items.get(entry).map(|item| item.timestamp) else {
        return OrderedItems {
            items: Vec::new(),
            positions: vec![None; items.len()],
        };
    };

    let timestamps: Vec<f64> = items.iter().map(|item| item.timestamp).collect();
    let mut positions = vec![None; items.len()];
    let mut pending: Vec<Option<WaterfallItem>> = items.into_iter().map(Some).collect();
    let mut ordered: Vec<WaterfallItem> = Vec::with_capacity(pending.len());

    // (input position, position of the parent in `ordered`)
    let mut stack: Vec<(usize, Option<usize>)> = vec![(entry, None)];
    while let Some((source, parent)) = stack.pop() {
        let Some(mut item) = pending.get_mut(source).and_then(Option::take) else {
            tracing::debug!(source, "item reached twice, not descending again");
            continue;
        };

        item.parent = parent;
        item.offset = item.timestamp - entry_timestamp;
        item.skew = clock_skew(SkewSubject::from(&item), parent.map(|p| &ordered[p]));

        let pos = ordered.len();
        positions[source] = Some(pos);

        let mut children = children_by_parent_id
            .get(item.id.as_str())
            .cloned()
            .unwrap_or_default();
        children.sort_by(|a, b| timestamps[*a].total_cmp(&timestamps[*b]));
        stack.extend(children.into_iter().rev().map(|child| (child, Some(pos))));

        ordered.push(item);
    }

    tracing::trace!(
        reachable = ordered.len(),
        total = positions.len(),
        "ordered waterfall items"
    );

    OrderedItems {
        items: ordered,
        positions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::normalize_trace_docs;
    use trace_waterfall_protocol::{FieldDoc, fields};

    fn doc(event: &str, id: &str, parent: Option<&str>, timestamp: f64, duration: f64) -> FieldDoc {
        let (id_field, duration_field) = if event == "span" {
            (fields::SPAN_ID, fields::SPAN_DURATION)
        } else {
            (fields::TRANSACTION_ID, fields::TRANSACTION_DURATION)
        };
        let doc = FieldDoc::new()
            .with(fields::PROCESSOR_EVENT, [event])
            .with(id_field, [id])
            .with(fields::TIMESTAMP, [timestamp])
            .with(duration_field, [duration]);
        match parent {
            Some(parent) => doc.with(fields::PARENT_ID, [parent]),
            None => doc,
        }
    }

    fn order(docs: &[FieldDoc], entry: &str) -> OrderedItems {
        let items = normalize_trace_docs(docs, &HashMap::new());
        let groups = group_by_parent_id(&items);
        let entry = items.iter().position(|item| item.id == entry).unwrap();
        order_items(items, &groups, entry)
    }

    fn ids(ordered: &OrderedItems) -> Vec<&str> {
        ordered.items.iter().map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn groups_parentless_items_under_root() {
        let docs = vec![
            doc("transaction", "t0", None, 0.0, 10.0),
            doc("span", "s1", Some("t0"), 1.0, 1.0),
            doc("transaction", "t9", None, 5.0, 1.0),
        ];
        let items = normalize_trace_docs(&docs, &HashMap::new());
        let groups = group_by_parent_id(&items);
        assert_eq!(groups[ItemId::ROOT], vec![0, 2]);
        assert_eq!(groups["t0"], vec![1]);
    }

    #[test]
    fn pre_order_with_siblings_by_timestamp() {
        let docs = vec![
            doc("transaction", "t0", None, 1000.0, 500.0),
            doc("span", "late", Some("t0"), 1300.0, 10.0),
            doc("span", "early", Some("t0"), 1100.0, 100.0),
            doc("span", "early-child", Some("early"), 1150.0, 10.0),
        ];
        let ordered = order(&docs, "t0");
        assert_eq!(ids(&ordered), vec!["t0", "early", "early-child", "late"]);
        assert_eq!(ordered.items[2].parent, Some(1));
        assert_eq!(ordered.items[3].parent, Some(0));
        assert_eq!(ordered.positions, vec![Some(0), Some(3), Some(1), Some(2)]);
    }

    #[test]
    fn equal_timestamps_keep_input_order() {
        let docs = vec![
            doc("transaction", "t0", None, 0.0, 10.0),
            doc("span", "b", Some("t0"), 5.0, 1.0),
            doc("span", "a", Some("t0"), 5.0, 1.0),
        ];
        assert_eq!(ids(&order(&docs, "t0")), vec!["t0", "b", "a"]);
    }

    #[test]
    fn span_before_entry_has_negative_offset() {
        let docs = vec![
            doc("transaction", "t0", None, 1000.0, 100.0),
            doc("span", "s1", Some("t0"), 900.0, 50.0),
        ];
        let ordered = order(&docs, "t0");
        assert_eq!(ordered.items[1].offset, -100.0);
        assert_eq!(ordered.items[1].skew, 0.0);
        assert_eq!(ordered.items[0].skew, 0.0);
    }

    #[test]
    fn skew_propagates_through_spans() {
        let docs = vec![
            doc("transaction", "t0", None, 1000.0, 200.0),
            doc("transaction", "t1", Some("t0"), 950.0, 50.0),
            doc("span", "s2", Some("t1"), 960.0, 10.0),
        ];
        let ordered = order(&docs, "t0");
        assert_eq!(ordered.items[1].skew, 125.0);
        assert_eq!(ordered.items[2].skew, 125.0);
    }

    #[test]
    fn unreachable_items_are_dropped() {
        let docs = vec![
            doc("transaction", "t0", None, 0.0, 10.0),
            doc("span", "orphan", Some("missing"), 1.0, 1.0),
            doc("transaction", "other-root", None, 2.0, 1.0),
        ];
        let ordered = order(&docs, "t0");
        assert_eq!(ids(&ordered), vec!["t0"]);
        assert_eq!(ordered.positions, vec![Some(0), None, None]);
    }

    #[test]
    fn entry_below_trace_root_only_walks_its_subtree() {
        let docs = vec![
            doc("transaction", "root", None, 0.0, 100.0),
            doc("span", "s1", Some("root"), 10.0, 50.0),
            doc("transaction", "t1", Some("s1"), 20.0, 20.0),
            doc("span", "s2", Some("t1"), 25.0, 5.0),
        ];
        let ordered = order(&docs, "t1");
        assert_eq!(ids(&ordered), vec!["t1", "s2"]);
        assert_eq!(ordered.items[0].offset, 0.0);
        assert_eq!(ordered.items[0].parent, None);
        assert_eq!(ordered.items[1].offset, 5.0);
    }

    #[test]
    fn parent_cycle_terminates() {
        let docs = vec![
            doc("transaction", "a", Some("b"), 0.0, 10.0),
            doc("span", "b", Some("a"), 1.0, 5.0),
        ];
        let ordered = order(&docs, "a");
        assert_eq!(ids(&ordered), vec!["a", "b"]);
    }

    #[test]
    fn deep_chain_does_not_recurse() {
        let depth = 50_000;
        let mut docs = vec![doc("transaction", "n0", None, 0.0, 1.0)];
        for i in 1..depth {
            let parent = format!("n{}", i - 1);
            docs.push(doc("span", &format!("n{i}"), Some(&parent), i as f64, 1.0));
        }
        let ordered = order(&docs, "n0");
        assert_eq!(ordered.items.len(), depth);
        assert_eq!(ordered.items[depth - 1].parent, Some(depth - 2));
    }
}
