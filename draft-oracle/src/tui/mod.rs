// TUI dashboard: layout, input handling, and widget rendering.
//
// The TUI owns a `ViewState` that mirrors what the app orchestrator pushes
// over the `UiUpdate` channel, and re-renders it at ~30 fps.

pub mod input;
pub mod layout;
pub mod widgets;

use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;
use tokio::sync::mpsc;

use crate::draft::model::{Draft, DraftSummary};
use crate::draft::run::PickProgress;
use crate::protocol::{UiUpdate, UserCommand};

use layout::{build_layout, AppLayout};

/// How long a completion line stays up.
pub const COMPLETE_STATUS_TTL: Duration = Duration::from_secs(20);
/// How long an error line stays up.
pub const ERROR_STATUS_TTL: Duration = Duration::from_secs(40);

// ---------------------------------------------------------------------------
// StatusLine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StatusLine {
    pub text: String,
    pub received_at: DateTime<Local>,
    shown_at: Instant,
}

impl StatusLine {
    pub fn new(text: String, shown_at: Instant) -> Self {
        StatusLine {
            text,
            received_at: Local::now(),
            shown_at,
        }
    }

    /// Completion and error lines clear on their own; others stay until
    /// replaced.
    pub fn ttl(&self) -> Option<Duration> {
        if self.text.contains("Error:") {
            Some(ERROR_STATUS_TTL)
        } else if self.text.contains("is complete") {
            Some(COMPLETE_STATUS_TTL)
        } else {
            None
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.ttl()
            .is_some_and(|ttl| now.saturating_duration_since(self.shown_at) >= ttl)
    }
}

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// TUI-local state that mirrors the application state for rendering.
#[derive(Debug, Default)]
pub struct ViewState {
    pub status: Option<StatusLine>,
    /// Draft with an active run.
    pub running_draft: Option<String>,
    /// The pick on the clock.
    pub progress: Option<PickProgress>,
    pub drafts: Vec<DraftSummary>,
    pub selected: Option<usize>,
    /// Detail of the selected draft.
    pub detail: Option<Draft>,
    /// Scroll offset of the pick history panel.
    pub history_scroll: usize,
    /// Whether the quit confirmation overlay is showing.
    pub confirm_quit: bool,
}

impl ViewState {
    pub fn selected_summary(&self) -> Option<&DraftSummary> {
        self.selected.and_then(|i| self.drafts.get(i))
    }

    /// Drop the status line once its display time has passed.
    pub fn expire_status(&mut self, now: Instant) {
        if self.status.as_ref().is_some_and(|s| s.is_expired(now)) {
            self.status = None;
        }
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState.
fn apply_ui_update(state: &mut ViewState, update: UiUpdate, now: Instant) {
    match update {
        UiUpdate::Status(text) => {
            state.status = Some(StatusLine::new(text, now));
        }
        UiUpdate::Progress(progress) => {
            state.progress = progress;
        }
        UiUpdate::RunningDraft(draft_id) => {
            state.running_draft = draft_id;
        }
        UiUpdate::DraftList { drafts, selected } => {
            let previous = state.selected_summary().map(|d| d.draft_id.clone());
            state.drafts = drafts;
            state.selected = selected;
            let current = state.selected_summary().map(|d| d.draft_id.clone());
            if previous != current {
                state.history_scroll = 0;
            }
            // Drop detail that no longer belongs to the selection.
            if state.detail.as_ref().map(|d| &d.draft_id) != current.as_ref() {
                state.detail = None;
            }
        }
        UiUpdate::DraftDetail(draft) => {
            state.detail = Some(*draft);
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());

    widgets::status_bar::render(frame, layout.status_bar, state);
    render_status_line(frame, &layout, state);
    widgets::drafts::render(frame, layout.drafts, state);
    widgets::draft_log::render(frame, layout.history, state);
    render_help_bar(frame, &layout);

    if state.confirm_quit {
        widgets::quit_confirm::render(frame, frame.area());
    }
}

fn render_status_line(frame: &mut Frame, layout: &AppLayout, state: &ViewState) {
    let line = match &state.status {
        Some(status) => {
            let color = if status.text.contains("Error:") {
                Color::Red
            } else if status.text.contains("is complete") {
                Color::Green
            } else {
                Color::White
            };
            Line::from(vec![
                Span::styled(
                    format!("[{}] ", status.received_at.format("%H:%M:%S")),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(status.text.clone(), Style::default().fg(color)),
            ])
        }
        None => Line::from(Span::styled("Ready", Style::default().fg(Color::DarkGray))),
    };

    let paragraph = Paragraph::new(line)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Status"));
    frame.render_widget(paragraph, layout.status_line);
}

fn render_help_bar(frame: &mut Frame, layout: &AppLayout) {
    let text = " n:New | r:Resume | s:Stop | p:Load pool | f:Refresh | j/k:Select | PgUp/PgDn:Scroll | q:Quit";
    let paragraph = Paragraph::new(Line::from(vec![Span::styled(
        text,
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::DIM),
    )]))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, layout.help_bar);
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop.
///
/// 1. Initializes the terminal (raw mode, alternate screen).
/// 2. Installs a panic hook that restores the terminal.
/// 3. Selects over UI updates, keyboard input, and render ticks.
/// 4. Restores the terminal on exit.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();

    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => apply_ui_update(&mut view_state, ui_update, Instant::now()),
                    // App is shutting down
                    None => break,
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            let _ = cmd_tx.send(cmd).await;
                            if quit {
                                break;
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }

            _ = render_tick.tick() => {
                view_state.expire_status(Instant::now());
                terminal.draw(|frame| render_frame(frame, &view_state))?;
            }
        }
    }

    ratatui::restore();
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::model::PickCoord;

    fn summary(id: &str) -> DraftSummary {
        DraftSummary {
            draft_id: id.to_string(),
            name: format!("Draft {id}"),
            num_rounds: 4,
            is_complete: false,
        }
    }

    #[test]
    fn view_state_default_is_empty() {
        let state = ViewState::default();
        assert!(state.status.is_none());
        assert!(state.running_draft.is_none());
        assert!(state.progress.is_none());
        assert!(state.drafts.is_empty());
        assert!(state.detail.is_none());
        assert!(!state.confirm_quit);
    }

    #[test]
    fn complete_status_clears_after_twenty_seconds() {
        let start = Instant::now();
        let mut state = ViewState::default();
        apply_ui_update(&mut state, UiUpdate::Status("Draft Spring is complete".into()), start);

        state.expire_status(start + Duration::from_secs(19));
        assert!(state.status.is_some());
        state.expire_status(start + Duration::from_secs(20));
        assert!(state.status.is_none());
    }

    #[test]
    fn error_status_clears_after_forty_seconds() {
        let start = Instant::now();
        let mut state = ViewState::default();
        apply_ui_update(&mut state, UiUpdate::Status("Error: boom".into()), start);

        state.expire_status(start + Duration::from_secs(39));
        assert!(state.status.is_some());
        state.expire_status(start + Duration::from_secs(40));
        assert!(state.status.is_none());
    }

    #[test]
    fn progress_status_persists() {
        let start = Instant::now();
        let mut state = ViewState::default();
        apply_ui_update(
            &mut state,
            UiUpdate::Status("Round 1, Pick 1: TeamA is drafting ...".into()),
            start,
        );
        state.expire_status(start + Duration::from_secs(3600));
        assert!(state.status.is_some());
    }

    #[test]
    fn changing_selection_drops_stale_detail() {
        let now = Instant::now();
        let mut state = ViewState::default();
        apply_ui_update(
            &mut state,
            UiUpdate::DraftList {
                drafts: vec![summary("a"), summary("b")],
                selected: Some(0),
            },
            now,
        );
        state.detail = Some(Draft {
            draft_id: "a".into(),
            name: "Draft a".into(),
            num_rounds: 4,
            draft_order: vec![],
            is_complete: false,
            draft_history: vec![],
        });
        state.history_scroll = 3;

        apply_ui_update(
            &mut state,
            UiUpdate::DraftList {
                drafts: vec![summary("a"), summary("b")],
                selected: Some(1),
            },
            now,
        );
        assert!(state.detail.is_none());
        assert_eq!(state.history_scroll, 0);
    }

    #[test]
    fn progress_updates_apply() {
        let mut state = ViewState::default();
        let progress = PickProgress {
            at: PickCoord::new(2, 3),
            team: "TeamB".into(),
        };
        apply_ui_update(&mut state, UiUpdate::Progress(Some(progress.clone())), Instant::now());
        assert_eq!(state.progress, Some(progress));
        apply_ui_update(&mut state, UiUpdate::Progress(None), Instant::now());
        assert!(state.progress.is_none());
    }

    #[test]
    fn render_frame_does_not_panic() {
        let backend = ratatui::backend::TestBackend::new(100, 30);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let mut state = ViewState::default();
        state.drafts = vec![summary("a")];
        state.selected = Some(0);
        state.status = Some(StatusLine::new("Error: boom".into(), Instant::now()));
        state.confirm_quit = true;
        terminal.draw(|frame| render_frame(frame, &state)).unwrap();
    }
}
