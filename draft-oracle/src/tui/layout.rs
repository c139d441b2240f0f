// Screen layout: panel arrangement and sizing.
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +--------------------------------------------------+
// | Status Line (3 rows)                              |
// +-----------------+--------------------------------+
// | Drafts (35%)    | Pick History (65%)             |
// +-----------------+--------------------------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Resolved screen areas for each dashboard zone.
#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Running draft and the pick on the clock.
    pub status_bar: Rect,
    /// Latest status message.
    pub status_line: Rect,
    pub drafts: Rect,
    /// History of the selected draft.
    pub history: Rect,
    /// Keyboard shortcut hints.
    pub help_bar: Rect,
}

pub fn build_layout(area: Rect) -> AppLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Length(3), // status line
            Constraint::Min(6),    // drafts + history
            Constraint::Length(1), // help bar
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(vertical[2]);

    AppLayout {
        status_bar: vertical[0],
        status_line: vertical[1],
        drafts: horizontal[0],
        history: horizontal[1],
        help_bar: vertical[3],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
