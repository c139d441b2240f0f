// Pick history widget for the selected draft.
//
// One row per pick coordinate in pick order: decided rows show the player
// and rationale, the pick on the clock is highlighted, the rest are dim.

use ratatui::layout::{Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, List, ListItem, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState,
};
use ratatui::Frame;

use crate::draft::model::{PickCoord, PickRecord};
use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let Some(draft) = state.detail.as_ref() else {
        let text = if state.selected_summary().is_some() {
            "  Loading draft..."
        } else {
            "  No draft selected."
        };
        let paragraph = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title("Picks"));
        frame.render_widget(paragraph, area);
        return;
    };

    let on_clock = state
        .progress
        .as_ref()
        .filter(|_| state.running_draft.as_deref() == Some(draft.draft_id.as_str()))
        .map(|p| p.at);

    // Visible row count: subtract 2 for borders
    let visible_rows = (area.height as usize).saturating_sub(2);
    let total = draft.draft_history.len();
    let scroll_offset = state.history_scroll.min(total.saturating_sub(visible_rows));

    let items: Vec<ListItem> = draft
        .draft_history
        .iter()
        .skip(scroll_offset)
        .take(visible_rows.max(1))
        .map(|record| ListItem::new(pick_line(record, on_clock)))
        .collect();

    let title = format!(
        "{}: {}/{} picks{}",
        draft.name,
        draft.completed_picks(),
        draft.total_picks(),
        if draft.is_complete { " (complete)" } else { "" }
    );
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(list, area);

    if total > visible_rows {
        let mut scrollbar_state =
            ScrollbarState::new(total.saturating_sub(visible_rows)).position(scroll_offset);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area.inner(Margin { vertical: 1, horizontal: 0 }),
            &mut scrollbar_state,
        );
    }
}

/// Format a single history row for display.
pub fn format_pick(record: &PickRecord) -> String {
    let selection = record.selection.as_deref().unwrap_or("...");
    format!("#{} R{} {}: {}", record.pick, record.round, record.team, selection)
}

fn pick_line(record: &PickRecord, on_clock: Option<PickCoord>) -> Line<'static> {
    let style = if on_clock == Some(record.coord()) {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else if record.is_decided() {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let mut spans = vec![Span::styled(format_pick(record), style)];
    if let Some(rationale) = &record.rationale {
        spans.push(Span::styled(
            format!("  {rationale}"),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ));
    }
    Line::from(spans)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
