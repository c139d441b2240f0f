// Status bar widget: run indicator and the pick on the clock.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::tui::ViewState;

/// Render the status bar into the given area.
///
/// Layout: [run indicator] [running draft] | [round/pick/team]
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let (dot, dot_color) = run_indicator(state.running_draft.is_some());
    let mut spans = vec![Span::styled(format!(" {dot} "), Style::default().fg(dot_color))];

    match &state.running_draft {
        Some(id) => spans.push(Span::styled(
            format!("Running {id}"),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        None => spans.push(Span::styled("Idle", Style::default().fg(Color::Gray))),
    }

    if let Some(text) = progress_text(state) {
        spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
        spans.push(Span::styled(text, Style::default().fg(Color::Yellow)));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

pub fn run_indicator(running: bool) -> (&'static str, Color) {
    if running {
        ("●", Color::Green)
    } else {
        ("●", Color::DarkGray)
    }
}

/// "Round r, Pick p/total: Team on the clock", when a pick is in flight.
pub fn progress_text(state: &ViewState) -> Option<String> {
    let progress = state.progress.as_ref()?;
    let total = state
        .detail
        .as_ref()
        .filter(|d| state.running_draft.as_deref() == Some(d.draft_id.as_str()))
        .map(|d| format!("/{}", d.total_picks()))
        .unwrap_or_default();
    Some(format!(
        "Round {}, Pick {}{}: {} on the clock",
        progress.at.round, progress.at.pick, total, progress.team
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
