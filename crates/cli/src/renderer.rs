use std::io::{Write, stdout};

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use trace_waterfall_core::{
    CriticalPathFilter, FlatWaterfallNode, Waterfall, WaterfallItem, WaterfallNode, flatten_tree,
    update_trace_tree_node,
};

/// Timeline width used by the text output.
const TEXT_BAR_WIDTH: usize = 40;

/// `#RRGGBB` legend colors to terminal colors.
fn legend_color(hex: &str) -> Color {
    let channel = |i: usize| {
        hex.strip_prefix('#')
            .and_then(|digits| digits.get(i..i + 2))
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
    };
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => Color::Gray,
    }
}

fn item_name(item: &WaterfallItem) -> &str {
    item.name.as_deref().unwrap_or(item.id.as_str())
}

fn millis(us: f64) -> String {
    format!("{:.1} ms", us / 1000.0)
}

/// A bar of `width` cells marking where `item` sits within `total`.
fn timeline_bar(item: &WaterfallItem, total: f64, width: usize) -> String {
    if total <= 0.0 || width == 0 {
        return " ".repeat(width);
    }
    let scale = width as f64 / total;
    let start = ((item.start().max(0.0) * scale).floor() as usize).min(width - 1);
    let len = ((item.duration * scale).round() as usize).clamp(1, width - start);
    format!(
        "{}{}{}",
        " ".repeat(start),
        "█".repeat(len),
        " ".repeat(width - start - len)
    )
}

fn toggle_marker(row: &FlatWaterfallNode) -> &'static str {
    match (row.children_to_load, row.expanded) {
        (0, _) => " ",
        (_, true) => "▾",
        (_, false) => "▸",
    }
}

/// Label of one row: indentation, toggle, name, service, duration, errors.
fn row_label(waterfall: &Waterfall, row: &FlatWaterfallNode, item: &WaterfallItem) -> String {
    let mut label = format!(
        "{}{} {}",
        "  ".repeat(row.level as usize),
        toggle_marker(row),
        item_name(item)
    );
    if let Some(service) = &item.legend_values.service_name {
        label.push_str(&format!(" [{service}]"));
    }
    label.push_str(&format!("  {}", millis(item.duration)));
    let errors = waterfall.get_error_count(&item.id);
    if errors > 0 {
        label.push_str(&format!("  {errors} error{}", if errors == 1 { "" } else { "s" }));
    }
    label
}

fn summary(waterfall: &Waterfall) -> String {
    let mut summary = format!(
        "{} items | {} errors ({} total) | {}",
        waterfall.items.len(),
        waterfall.error_items.len(),
        waterfall.total_errors_count,
        millis(waterfall.duration)
    );
    if waterfall.orphan_trace_items_count > 0 {
        summary.push_str(&format!(
            " | {} orphaned",
            waterfall.orphan_trace_items_count
        ));
    }
    if waterfall.exceeds_max {
        summary.push_str(&format!(
            " | truncated at {} of {} items",
            waterfall.max_trace_items, waterfall.trace_docs_total
        ));
    }
    summary
}

pub fn render_text<W: Write>(
    out: &mut W,
    waterfall: &Waterfall,
    rows: &[FlatWaterfallNode],
) -> Result<()> {
    if rows.is_empty() {
        writeln!(out, "no entry transaction in trace")?;
        return Ok(());
    }
    writeln!(out, "{}", summary(waterfall))?;
    for row in rows {
        let Some(item) = waterfall.item(row.item) else {
            continue;
        };
        writeln!(
            out,
            "|{}| {}",
            timeline_bar(item, waterfall.duration, TEXT_BAR_WIDTH),
            row_label(waterfall, row, item)
        )?;
    }
    Ok(())
}

fn list_item<'a>(waterfall: &Waterfall, row: &FlatWaterfallNode, bar_width: usize) -> ListItem<'a> {
    let Some(item) = waterfall.item(row.item) else {
        return ListItem::new("");
    };
    let color = legend_color(&item.color);
    ListItem::new(Line::from(vec![
        Span::styled(
            timeline_bar(item, waterfall.duration, bar_width),
            Style::default().fg(color),
        ),
        Span::raw(" "),
        Span::raw(row_label(waterfall, row, item)),
    ]))
}

/// Interactive viewer. Expanding a row loads one more level of the tree.
pub fn render_tui(
    waterfall: &Waterfall,
    mut tree: WaterfallNode,
    filter: &CriticalPathFilter,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut rows = flatten_tree(Some(&tree));
    let mut state = ListState::default().with_selected(Some(0));
    let header_text = format!(
        " trace-waterfall | {} | ↑↓ move | enter toggle | q quit ",
        summary(waterfall)
    );

    loop {
        terminal.draw(|frame| {
            let [header_area, list_area] =
                Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(frame.area());

            let header = Paragraph::new(header_text.as_str())
                .style(Style::default().fg(Color::White).bg(Color::DarkGray));
            frame.render_widget(header, header_area);

            let bar_width = usize::from(list_area.width / 3);
            let items: Vec<ListItem> = rows
                .iter()
                .map(|row| list_item(waterfall, row, bar_width))
                .collect();
            let list = List::new(items)
                .block(Block::default().borders(Borders::NONE))
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
                .highlight_symbol("> ");
            frame.render_stateful_widget(list, list_area, &mut state);
        })?;

        if !event::poll(std::time::Duration::from_millis(100))? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Up | KeyCode::Char('k') => state.select_previous(),
                KeyCode::Down | KeyCode::Char('j') => state.select_next(),
                KeyCode::Home => state.select_first(),
                KeyCode::End => state.select_last(),
                KeyCode::Enter | KeyCode::Char(' ') => {
                    if let Some(row) = state.selected().and_then(|i| rows.get(i)) {
                        let update = row.with_expanded(!row.expanded);
                        tree = update_trace_tree_node(tree, &update, waterfall, filter);
                        rows = flatten_tree(Some(&tree));
                    }
                }
                _ => {}
            },
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollDown => state.select_next(),
                MouseEventKind::ScrollUp => state.select_previous(),
                _ => {}
            },
            _ => {}
        }
    }

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    Ok(())
}
