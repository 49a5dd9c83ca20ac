use std::collections::{HashMap, VecDeque};

use trace_waterfall_protocol::ItemId;

use super::critical_path::CriticalPath;
use crate::model::{FlatWaterfallNode, TreeOptions, Waterfall, WaterfallNode};

/// Restricts the tree to items on the critical path when enabled.
#[derive(Debug, Clone, Default)]
pub struct CriticalPathFilter {
    pub show_critical_path: bool,
    /// Critical-path segment count per item id.
    pub segments_by_id: HashMap<ItemId, usize>,
}

impl CriticalPathFilter {
    /// A filter that lets every child through.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn new(path: &CriticalPath, waterfall: &Waterfall, show_critical_path: bool) -> Self {
        Self {
            show_critical_path,
            segments_by_id: path.segment_counts_by_id(waterfall),
        }
    }

    /// Positions of the children of `item_id` that pass the filter.
    fn children(&self, waterfall: &Waterfall, item_id: &str) -> Vec<usize> {
        let children = waterfall.children(item_id);
        if !self.show_critical_path {
            return children.to_vec();
        }
        children
            .iter()
            .copied()
            .filter(|&pos| {
                waterfall
                    .item(pos)
                    .and_then(|child| self.segments_by_id.get(child.id.as_str()))
                    .is_some_and(|&count| count > 0)
            })
            .collect()
    }
}

/// Build the initial trace tree, rooted at the entry transaction.
///
/// Nodes on levels below `max_level_open` get their children instantiated;
/// the children are expanded while their level is still below
/// `max_level_open`. Every visited node records how many children it has,
/// whether or not they were instantiated.
pub fn build_trace_tree(
    waterfall: &Waterfall,
    options: &TreeOptions,
    filter: &CriticalPathFilter,
) -> Option<WaterfallNode> {
    let entry_pos = waterfall.entry_waterfall_transaction?;
    let entry = waterfall.item(entry_pos)?;

    let mut root = WaterfallNode {
        id: entry.id.to_string(),
        item: entry_pos,
        children: Vec::new(),
        children_to_load: 0,
        expanded: options.is_open,
        level: 0,
        has_initialized_children: false,
    };
    materialize(&mut root, waterfall, options.max_level_open, filter);
    Some(root)
}

/// Breadth-first materialization below `root`, down to `max_level_open`.
fn materialize(
    root: &mut WaterfallNode,
    waterfall: &Waterfall,
    max_level_open: u32,
    filter: &CriticalPathFilter,
) {
    let mut queue: VecDeque<&mut WaterfallNode> = VecDeque::from([root]);

    while let Some(node) = queue.pop_front() {
        let Some(item) = waterfall.item(node.item) else {
            continue;
        };
        let children = filter.children(waterfall, &item.id);
        node.children_to_load = children.len();

        if max_level_open > node.level {
            let level = node.level + 1;
            node.children
                .extend(children.iter().enumerate().map(|(index, &child)| {
                    WaterfallNode::child(
                        level,
                        child,
                        &waterfall.items[child].id,
                        index,
                        level < max_level_open,
                    )
                }));
            node.has_initialized_children = true;
        }

        queue.extend(node.children.iter_mut());
    }
}

/// Apply `updated` to the node with the same id and return the tree.
///
/// When the update expands a node whose children were never initialized,
/// exactly one more level is materialized below it. Already-loaded parts of
/// the tree are left untouched. An unknown id leaves the tree unchanged.
pub fn update_trace_tree_node(
    mut root: WaterfallNode,
    updated: &FlatWaterfallNode,
    waterfall: &Waterfall,
    filter: &CriticalPathFilter,
) -> WaterfallNode {
    let Some(node) = find_node_mut(&mut root, &updated.id) else {
        tracing::debug!(node = %updated.id, "update for a node that is not in the tree");
        return root;
    };

    node.apply(updated);
    if updated.expanded && !updated.has_initialized_children {
        node.children.clear();
        let max_level_open = node.level + 1;
        materialize(node, waterfall, max_level_open, filter);
    }
    root
}

/// Depth-first search by node id with an explicit stack.
fn find_node_mut<'a>(root: &'a mut WaterfallNode, id: &str) -> Option<&'a mut WaterfallNode> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.id == id {
            return Some(node);
        }
        stack.extend(node.children.iter_mut().rev());
    }
    None
}

/// The rows a list view should render: a pre-order walk that descends only
/// into expanded nodes.
pub fn flatten_tree(root: Option<&WaterfallNode>) -> Vec<FlatWaterfallNode> {
    let Some(root) = root else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        rows.push(node.flat());
        if node.expanded {
            stack.extend(node.children.iter().rev());
        }
    }
    rows
}
