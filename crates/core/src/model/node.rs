use serde::{Deserialize, Serialize};

/// A node of the lazily materialized trace tree.
///
/// Nodes reference items by position in `Waterfall::items`, so the same item
/// may be shown by several nodes; `id` stays unique because it encodes the
/// level and the sibling index.
///
/// A fully opened tree is as deep as the trace, so `Drop`, `Clone`,
/// `PartialEq` and `Debug` are written with explicit stacks or shallowly
/// instead of recursing through `children`.
pub struct WaterfallNode {
    pub id: String,
    pub item: usize,
    /// Materialized children. Empty until `has_initialized_children`.
    pub children: Vec<WaterfallNode>,
    /// Number of children the item has, materialized or not.
    pub children_to_load: usize,
    pub expanded: bool,
    pub level: u32,
    pub has_initialized_children: bool,
}

impl WaterfallNode {
    /// A not-yet-initialized child node for `item` at `level`.
    pub(crate) fn child(level: u32, item: usize, item_id: &str, index: usize, expanded: bool) -> Self {
        Self {
            id: format!("{level}-{item_id}-{index}"),
            item,
            children: Vec::new(),
            children_to_load: 0,
            expanded,
            level,
            has_initialized_children: false,
        }
    }

    fn without_children(&self) -> Self {
        Self {
            id: self.id.clone(),
            item: self.item,
            children: Vec::new(),
            children_to_load: self.children_to_load,
            expanded: self.expanded,
            level: self.level,
            has_initialized_children: self.has_initialized_children,
        }
    }

    fn same_fields(&self, other: &Self) -> bool {
        self.id == other.id
            && self.item == other.item
            && self.children_to_load == other.children_to_load
            && self.expanded == other.expanded
            && self.level == other.level
            && self.has_initialized_children == other.has_initialized_children
            && self.children.len() == other.children.len()
    }

    /// This node without its children.
    pub fn flat(&self) -> FlatWaterfallNode {
        FlatWaterfallNode {
            id: self.id.clone(),
            item: self.item,
            children_to_load: self.children_to_load,
            expanded: self.expanded,
            level: self.level,
            has_initialized_children: self.has_initialized_children,
        }
    }

    /// Overwrite every field except `children` with `update`.
    pub(crate) fn apply(&mut self, update: &FlatWaterfallNode) {
        self.id.clone_from(&update.id);
        self.item = update.item;
        self.children_to_load = update.children_to_load;
        self.expanded = update.expanded;
        self.level = update.level;
        self.has_initialized_children = update.has_initialized_children;
    }
}

impl Drop for WaterfallNode {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

impl Clone for WaterfallNode {
    fn clone(&self) -> Self {
        // Childless copies in pre-order, each with the index of its parent's
        // copy (`None` for children of the root).
        let mut copies: Vec<(Option<usize>, WaterfallNode)> = Vec::new();
        let mut stack: Vec<(Option<usize>, &WaterfallNode)> =
            self.children.iter().rev().map(|child| (None, child)).collect();
        while let Some((parent, node)) = stack.pop() {
            let index = copies.len();
            copies.push((parent, node.without_children()));
            stack.extend(node.children.iter().rev().map(|child| (Some(index), child)));
        }

        // Reverse pre-order completes every node before its parent.
        let mut root = self.without_children();
        while let Some((parent, mut node)) = copies.pop() {
            node.children.reverse();
            match parent {
                Some(parent) => copies[parent].1.children.push(node),
                None => root.children.push(node),
            }
        }
        root.children.reverse();
        root
    }
}

impl PartialEq for WaterfallNode {
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self, other)];
        while let Some((a, b)) = stack.pop() {
            if !a.same_fields(b) {
                return false;
            }
            stack.extend(a.children.iter().zip(&b.children));
        }
        true
    }
}

impl std::fmt::Debug for WaterfallNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaterfallNode")
            .field("id", &self.id)
            .field("item", &self.item)
            .field("children", &self.children.len())
            .field("children_to_load", &self.children_to_load)
            .field("expanded", &self.expanded)
            .field("level", &self.level)
            .field("has_initialized_children", &self.has_initialized_children)
            .finish()
    }
}

/// A [`WaterfallNode`] without children: one row of the rendered list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatWaterfallNode {
    pub id: String,
    pub item: usize,
    pub children_to_load: usize,
    pub expanded: bool,
    pub level: u32,
    pub has_initialized_children: bool,
}

impl FlatWaterfallNode {
    /// The same row, toggled open or closed.
    pub fn with_expanded(&self, expanded: bool) -> Self {
        Self {
            expanded,
            ..self.clone()
        }
    }
}

/// How much of the trace tree to materialize up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TreeOptions {
    /// Levels below the root whose nodes are instantiated and, except the
    /// deepest one, expanded.
    pub max_level_open: u32,
    /// Whether the root node starts expanded.
    pub is_open: bool,
}

impl TreeOptions {
    /// Large traces only open two levels; small ones open everything.
    pub const LARGE_TRACE_THRESHOLD: u64 = 500;

    pub fn for_trace_docs_total(trace_docs_total: u64) -> Self {
        let max_level_open = if trace_docs_total > Self::LARGE_TRACE_THRESHOLD {
            2
        } else {
            u32::try_from(trace_docs_total).unwrap_or(u32::MAX)
        };
        Self {
            max_level_open,
            is_open: true,
        }
    }
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            max_level_open: 2,
            is_open: true,
        }
    }
}
