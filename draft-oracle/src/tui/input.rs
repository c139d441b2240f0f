// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages for the app
// orchestrator, or into local ViewState changes (scrolling, quit prompt).

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::ViewState;
use crate::protocol::UserCommand;

/// Rows moved by PageUp/PageDown in the history panel.
const PAGE_SIZE: usize = 10;

/// Handle a keyboard event.
///
/// Returns the command to forward to the app orchestrator, or `None` when
/// the key was handled locally.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // Ignore release/repeat events so a key press is not handled twice.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    if key_event.modifiers.contains(KeyModifiers::CONTROL) && key_event.code == KeyCode::Char('c') {
        return Some(UserCommand::Quit);
    }

    if view_state.confirm_quit {
        return handle_confirm_quit(key_event, view_state);
    }

    match key_event.code {
        KeyCode::Char('n') => Some(UserCommand::NewDraft),
        KeyCode::Char('r') => Some(UserCommand::ResumeSelected),
        KeyCode::Char('s') => Some(UserCommand::StopDraft),
        KeyCode::Char('p') => Some(UserCommand::LoadPlayerPool),
        KeyCode::Char('f') => Some(UserCommand::RefreshDrafts),
        KeyCode::Down | KeyCode::Char('j') => Some(UserCommand::SelectNext),
        KeyCode::Up | KeyCode::Char('k') => Some(UserCommand::SelectPrev),
        KeyCode::PageDown => {
            view_state.history_scroll = view_state.history_scroll.saturating_add(PAGE_SIZE);
            None
        }
        KeyCode::PageUp => {
            view_state.history_scroll = view_state.history_scroll.saturating_sub(PAGE_SIZE);
            None
        }
        KeyCode::Char('q') => {
            // Quitting mid-run asks first.
            if view_state.running_draft.is_some() {
                view_state.confirm_quit = true;
                None
            } else {
                Some(UserCommand::Quit)
            }
        }
        _ => None,
    }
}

/// While the quit prompt is up: `y`/`q` quit, `n`/Esc cancel, everything
/// else is blocked.
fn handle_confirm_quit(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Char('q') | KeyCode::Char('Q') => {
            Some(UserCommand::Quit)
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            view_state.confirm_quit = false;
            None
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn ctrl_key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn command_keys_map_to_commands() {
        let mut state = ViewState::default();
        let cases = [
            ('n', UserCommand::NewDraft),
            ('r', UserCommand::ResumeSelected),
            ('s', UserCommand::StopDraft),
            ('p', UserCommand::LoadPlayerPool),
            ('f', UserCommand::RefreshDrafts),
            ('j', UserCommand::SelectNext),
            ('k', UserCommand::SelectPrev),
        ];
        for (c, expected) in cases {
            assert_eq!(handle_key(key(KeyCode::Char(c)), &mut state), Some(expected));
        }
    }

    #[test]
    fn arrows_move_selection() {
        let mut state = ViewState::default();
        assert_eq!(handle_key(key(KeyCode::Down), &mut state), Some(UserCommand::SelectNext));
        assert_eq!(handle_key(key(KeyCode::Up), &mut state), Some(UserCommand::SelectPrev));
    }

    #[test]
    fn page_keys_scroll_history_locally() {
        let mut state = ViewState::default();
        assert_eq!(handle_key(key(KeyCode::PageDown), &mut state), None);
        assert_eq!(state.history_scroll, PAGE_SIZE);
        handle_key(key(KeyCode::PageUp), &mut state);
        handle_key(key(KeyCode::PageUp), &mut state);
        assert_eq!(state.history_scroll, 0);
    }

    #[test]
    fn q_quits_when_idle() {
        let mut state = ViewState::default();
        assert_eq!(handle_key(key(KeyCode::Char('q')), &mut state), Some(UserCommand::Quit));
    }

    #[test]
    fn q_during_run_asks_for_confirmation() {
        let mut state = ViewState {
            running_draft: Some("draft-1".into()),
            ..ViewState::default()
        };
        assert_eq!(handle_key(key(KeyCode::Char('q')), &mut state), None);
        assert!(state.confirm_quit);

        assert_eq!(handle_key(key(KeyCode::Char('r')), &mut state), None);
        assert!(state.confirm_quit);
        assert_eq!(handle_key(key(KeyCode::Char('n')), &mut state), None);
        assert!(!state.confirm_quit);

        handle_key(key(KeyCode::Char('q')), &mut state);
        assert_eq!(handle_key(key(KeyCode::Char('y')), &mut state), Some(UserCommand::Quit));
    }

    #[test]
    fn ctrl_c_always_quits() {
        let mut state = ViewState {
            confirm_quit: true,
            ..ViewState::default()
        };
        assert_eq!(handle_key(ctrl_key(KeyCode::Char('c')), &mut state), Some(UserCommand::Quit));
    }

    #[test]
    fn release_events_are_ignored() {
        let mut state = ViewState::default();
        let mut event = key(KeyCode::Char('n'));
        event.kind = KeyEventKind::Release;
        assert_eq!(handle_key(event, &mut state), None);
    }
}
