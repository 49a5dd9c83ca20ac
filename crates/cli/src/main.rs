//! trace-waterfall: inspect the waterfall of a recorded trace response.

mod renderer;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use trace_waterfall_core::ingest::parse_trace_response;
use trace_waterfall_core::{
    CriticalPathFilter, FlatWaterfallNode, TreeOptions, Waterfall, WaterfallNode, build_trace_tree,
    build_waterfall, flatten_tree, get_critical_path, update_trace_tree_node,
};

#[derive(Parser)]
#[command(name = "trace-waterfall")]
#[command(about = "Build and browse the waterfall of a trace response")]
#[command(version)]
struct Cli {
    /// Trace response JSON (`entryTransaction` + `traceItems`)
    path: PathBuf,

    /// Levels to open up front (defaults to the whole trace for small
    /// traces, two levels for large ones)
    #[arg(long)]
    max_level_open: Option<u32>,

    /// Start with the entry transaction collapsed
    #[arg(long)]
    collapsed: bool,

    /// Only show items on the critical path
    #[arg(long)]
    critical_path: bool,

    /// Expand a node by id (e.g. `2-span-id-0`) before rendering; repeatable
    #[arg(long = "expand", value_name = "NODE_ID")]
    expand: Vec<String>,

    /// Write the waterfall and the visible rows as JSON and exit
    #[arg(long, conflicts_with = "print")]
    json: bool,

    /// Print the visible rows as text instead of starting the viewer
    #[arg(long)]
    print: bool,

    /// Raise log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    waterfall: &'a Waterfall,
    rows: Vec<FlatWaterfallNode>,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Apply `--expand` in order, so a node revealed by an earlier expansion
/// can be expanded by a later one.
fn expand_nodes(
    mut tree: WaterfallNode,
    ids: &[String],
    waterfall: &Waterfall,
    filter: &CriticalPathFilter,
) -> WaterfallNode {
    for id in ids {
        let row = flatten_tree(Some(&tree)).into_iter().find(|row| &row.id == id);
        match row {
            Some(row) => {
                tree = update_trace_tree_node(tree, &row.with_expanded(true), waterfall, filter);
            }
            None => tracing::warn!(node = %id, "no visible node with this id"),
        }
    }
    tree
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let data = std::fs::read(&cli.path)
        .with_context(|| format!("failed to read {}", cli.path.display()))?;
    let response = parse_trace_response(&data)
        .with_context(|| format!("failed to parse {}", cli.path.display()))?;
    let waterfall = build_waterfall(&response);

    let mut options = TreeOptions::for_trace_docs_total(waterfall.trace_docs_total);
    if let Some(max_level_open) = cli.max_level_open {
        options.max_level_open = max_level_open;
    }
    options.is_open = !cli.collapsed;

    let filter = if cli.critical_path {
        CriticalPathFilter::new(&get_critical_path(&waterfall), &waterfall, true)
    } else {
        CriticalPathFilter::disabled()
    };

    let tree = build_trace_tree(&waterfall, &options, &filter)
        .map(|tree| expand_nodes(tree, &cli.expand, &waterfall, &filter));

    if cli.json {
        let output = JsonOutput {
            waterfall: &waterfall,
            rows: flatten_tree(tree.as_ref()),
        };
        let mut stdout = std::io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &output)?;
        writeln!(stdout)?;
        return Ok(());
    }

    match tree {
        Some(tree) if !cli.print => renderer::render_tui(&waterfall, tree, &filter),
        tree => {
            let rows = flatten_tree(tree.as_ref());
            renderer::render_text(&mut std::io::stdout().lock(), &waterfall, &rows)
        }
    }
}
