use std::collections::{HashMap, HashSet};

use serde::Serialize;
use trace_waterfall_protocol::ItemId;

use crate::model::Waterfall;

/// Gaps shorter than this (µs) between a child's end and the scan time are
/// attributed to clock skew rather than to the parent.
const SELF_TIME_TOLERANCE_US: f64 = 1000.0;

/// A stretch of time that one item contributed to the critical path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalPathSegment {
    /// Position in `Waterfall::items`.
    pub item: usize,
    pub offset: f64,
    pub duration: f64,
    /// Time spent in the item itself rather than in one of its children.
    pub self_time: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CriticalPath {
    pub segments: Vec<CriticalPathSegment>,
}

impl CriticalPath {
    /// Number of segments per item id.
    pub fn segment_counts_by_id(&self, waterfall: &Waterfall) -> HashMap<ItemId, usize> {
        let mut counts = HashMap::new();
        for segment in &self.segments {
            if let Some(item) = waterfall.item(segment.item) {
                *counts.entry(item.id.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

struct Scan {
    item: usize,
    start: f64,
    end: f64,
}

/// Determine which items bound the entry transaction's latency.
///
/// Scanning starts at the end of an item's window and walks backwards
/// through its children, latest end first. The child covering the current
/// scan time is on the path and is scanned in turn; time not covered by any
/// child is the parent's own.
pub fn get_critical_path(waterfall: &Waterfall) -> CriticalPath {
    let Some((entry_pos, entry)) = waterfall
        .entry_waterfall_transaction
        .and_then(|pos| waterfall.item(pos).map(|item| (pos, item)))
    else {
        return CriticalPath::default();
    };

    let mut segments = Vec::new();
    let mut scanned = HashSet::new();
    let mut stack = vec![Scan {
        item: entry_pos,
        start: entry.start(),
        end: entry.end(),
    }];

    while let Some(Scan { item, start, end }) = stack.pop() {
        if !scanned.insert(item) {
            continue;
        }
        segments.push(CriticalPathSegment {
            item,
            offset: start,
            duration: end - start,
            self_time: false,
        });

        let mut children: Vec<usize> = waterfall.children(&waterfall.items[item].id).to_vec();
        if children.is_empty() {
            segments.push(CriticalPathSegment {
                item,
                offset: start,
                duration: end - start,
                self_time: true,
            });
            continue;
        }

        children.sort_by(|a, b| {
            let a = waterfall.items[*a].end();
            let b = waterfall.items[*b].end();
            b.total_cmp(&a)
        });

        let mut scan_time = end;
        for child in children {
            let child_item = &waterfall.items[child];
            let child_start = child_item.start().max(start);
            let child_end = child_item.end();
            let clamped_end = child_end.min(scan_time);

            let on_path =
                !(child_start >= scan_time || clamped_end < start || child_end > scan_time);
            if !on_path {
                continue;
            }

            if clamped_end < scan_time - SELF_TIME_TOLERANCE_US {
                segments.push(CriticalPathSegment {
                    item,
                    offset: clamped_end,
                    duration: scan_time - clamped_end,
                    self_time: true,
                });
            }

            stack.push(Scan {
                item: child,
                start: child_start,
                end: child_end,
            });
            scan_time = child_start;
        }

        if start < scan_time {
            segments.push(CriticalPathSegment {
                item,
                offset: start,
                duration: scan_time - start,
                self_time: true,
            });
        }
    }

    CriticalPath { segments }
}
