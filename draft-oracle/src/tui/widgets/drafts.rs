// Drafts widget: every known draft, with the selection highlighted.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

use crate::draft::model::DraftSummary;
use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Drafts ({})", state.drafts.len()));

    if state.drafts.is_empty() {
        let paragraph = Paragraph::new("  No drafts yet. Press n to create one.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = state
        .drafts
        .iter()
        .map(|d| {
            let running = state.running_draft.as_deref() == Some(d.draft_id.as_str());
            let (marker, color) = draft_marker(d, running);
            ListItem::new(Line::from(vec![
                Span::styled(format!("{marker} "), Style::default().fg(color)),
                Span::raw(format_draft(d)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    let mut list_state = ListState::default().with_selected(state.selected);
    frame.render_stateful_widget(list, area, &mut list_state);
}

pub fn format_draft(draft: &DraftSummary) -> String {
    format!("{} ({} rounds)", draft.name, draft.num_rounds)
}

/// Running beats complete beats open.
pub fn draft_marker(draft: &DraftSummary, running: bool) -> (&'static str, Color) {
    if running {
        ("▶", Color::Yellow)
    } else if draft.is_complete {
        ("✓", Color::Green)
    } else {
        ("○", Color::White)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
