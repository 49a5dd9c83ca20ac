use std::sync::Mutex;

use thiserror::Error;
use trace_waterfall_core::ingest::{ParseError, parse_trace_response};
use trace_waterfall_core::{
    CriticalPathFilter, FlatWaterfallNode, TreeOptions, Waterfall, WaterfallNode, build_trace_tree,
    build_waterfall, flatten_tree, get_critical_path, update_trace_tree_node,
};
use wasm_bindgen::prelude::*;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("invalid JSON argument: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid waterfall handle {0}")]
    InvalidHandle(usize),
    #[error("waterfall store is poisoned")]
    Poisoned,
}

/// A built waterfall and the tree currently shown for it.
struct Session {
    waterfall: Waterfall,
    tree: Option<WaterfallNode>,
    filter: CriticalPathFilter,
}

impl Session {
    fn new(data: &[u8]) -> Result<Self, BridgeError> {
        let response = parse_trace_response(data)?;
        Ok(Self {
            waterfall: build_waterfall(&response),
            tree: None,
            filter: CriticalPathFilter::disabled(),
        })
    }

    fn build_tree(&mut self, options: &TreeOptions, show_critical_path: bool) -> Vec<FlatWaterfallNode> {
        self.filter = if show_critical_path {
            CriticalPathFilter::new(&get_critical_path(&self.waterfall), &self.waterfall, true)
        } else {
            CriticalPathFilter::disabled()
        };
        self.tree = build_trace_tree(&self.waterfall, options, &self.filter);
        flatten_tree(self.tree.as_ref())
    }

    fn update_node(&mut self, updated: &FlatWaterfallNode) -> Vec<FlatWaterfallNode> {
        self.tree = self
            .tree
            .take()
            .map(|tree| update_trace_tree_node(tree, updated, &self.waterfall, &self.filter));
        flatten_tree(self.tree.as_ref())
    }
}

static SESSIONS: Mutex<Vec<Option<Session>>> = Mutex::new(Vec::new());

fn with_session<T>(
    handle: usize,
    f: impl FnOnce(&mut Session) -> Result<T, BridgeError>,
) -> Result<T, BridgeError> {
    let mut sessions = SESSIONS.lock().map_err(|_| BridgeError::Poisoned)?;
    let session = sessions
        .get_mut(handle)
        .and_then(Option::as_mut)
        .ok_or(BridgeError::InvalidHandle(handle))?;
    f(session)
}

fn open(data: &[u8]) -> Result<usize, BridgeError> {
    let session = Session::new(data)?;
    let mut sessions = SESSIONS.lock().map_err(|_| BridgeError::Poisoned)?;
    if let Some(free) = sessions.iter().position(Option::is_none) {
        sessions[free] = Some(session);
        return Ok(free);
    }
    sessions.push(Some(session));
    Ok(sessions.len() - 1)
}

/// Parse a trace response (JSON bytes) and build its waterfall. Returns a
/// handle for the other calls.
#[wasm_bindgen]
pub fn load_trace(data: &[u8]) -> Result<usize, JsError> {
    Ok(open(data)?)
}

/// Drop a waterfall. Its handle may be handed out again by `load_trace`.
#[wasm_bindgen]
pub fn release(handle: usize) -> Result<(), JsError> {
    let mut sessions = SESSIONS.lock().map_err(|_| BridgeError::Poisoned)?;
    if let Some(slot) = sessions.get_mut(handle) {
        *slot = None;
    }
    Ok(())
}

/// The whole waterfall as JSON.
#[wasm_bindgen]
pub fn get_waterfall(handle: usize) -> Result<String, JsError> {
    Ok(with_session(handle, |s| Ok(serde_json::to_string(&s.waterfall)?))?)
}

/// Build the tree from `TreeOptions` JSON (`{}` for the defaults; `null`
/// sizes the tree from the trace) and return the visible rows as JSON.
#[wasm_bindgen]
pub fn build_tree(handle: usize, options: &str, show_critical_path: bool) -> Result<String, JsError> {
    Ok(with_session(handle, |s| {
        let options: Option<TreeOptions> = serde_json::from_str(options)?;
        let options = options
            .unwrap_or_else(|| TreeOptions::for_trace_docs_total(s.waterfall.trace_docs_total));
        Ok(serde_json::to_string(&s.build_tree(&options, show_critical_path))?)
    })?)
}

/// Apply an updated row (JSON) to the tree and return the visible rows.
#[wasm_bindgen]
pub fn update_node(handle: usize, node: &str) -> Result<String, JsError> {
    Ok(with_session(handle, |s| {
        let node: FlatWaterfallNode = serde_json::from_str(node)?;
        Ok(serde_json::to_string(&s.update_node(&node))?)
    })?)
}

#[wasm_bindgen]
pub fn get_error_count(handle: usize, parent_id: &str) -> Result<usize, JsError> {
    Ok(with_session(handle, |s| Ok(s.waterfall.get_error_count(parent_id)))?)
}

#[wasm_bindgen]
pub fn get_critical_path_json(handle: usize) -> Result<String, JsError> {
    Ok(with_session(handle, |s| {
        Ok(serde_json::to_string(&get_critical_path(&s.waterfall))?)
    })?)
}
