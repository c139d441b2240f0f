// Human-readable status lines surfaced to the front end.
//
// The wording of `Drafting`, `Stopped`, `Complete` and `Error` is matched
// by UI code (e.g. "is complete", "Error:"), so it must stay stable.

use std::fmt;

use crate::draft::model::PickCoord;
use crate::error::DraftError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    CreatingDraft,
    DraftCreated { name: String },
    Resuming { name: String, at: PickCoord },
    Drafting { at: PickCoord, team: String },
    Stopped { at: PickCoord },
    Complete { name: String },
    PlayerPoolLoaded { players: usize },
    Error { message: String },
}

impl StatusMessage {
    pub fn error(err: &DraftError) -> Self {
        StatusMessage::Error {
            message: err.to_string(),
        }
    }

    /// Complete, stopped, and errored lines end a run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StatusMessage::Stopped { .. } | StatusMessage::Complete { .. } | StatusMessage::Error { .. }
        )
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusMessage::CreatingDraft => write!(f, "Creating draft and pulling player pool..."),
            StatusMessage::DraftCreated { name } => write!(f, "Draft {name} created ..."),
            StatusMessage::Resuming { name, at } => write!(f, "Resuming {name} at {at}"),
            StatusMessage::Drafting { at, team } => write!(f, "{at}: {team} is drafting ..."),
            StatusMessage::Stopped { at } => write!(f, "Draft stopped at {at}"),
            StatusMessage::Complete { name } => write!(f, "Draft {name} is complete"),
            StatusMessage::PlayerPoolLoaded { players } => {
                write!(f, "Player pool loaded ({players} players)")
            }
            StatusMessage::Error { message } => write!(f, "Error: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_strings_are_stable() {
        let at = PickCoord::new(3, 6);
        assert_eq!(
            StatusMessage::Drafting { at, team: "TeamB".into() }.to_string(),
            "Round 3, Pick 6: TeamB is drafting ..."
        );
        assert_eq!(
            StatusMessage::Stopped { at }.to_string(),
            "Draft stopped at Round 3, Pick 6"
        );
        assert_eq!(
            StatusMessage::Complete { name: "Spring".into() }.to_string(),
            "Draft Spring is complete"
        );
        assert_eq!(
            StatusMessage::error(&DraftError::Precondition("No draft selected".into())).to_string(),
            "Error: No draft selected"
        );
    }

    #[test]
    fn terminal_lines() {
        assert!(StatusMessage::Stopped { at: PickCoord::new(1, 1) }.is_terminal());
        assert!(StatusMessage::Complete { name: "x".into() }.is_terminal());
        assert!(StatusMessage::Error { message: "x".into() }.is_terminal());
        assert!(!StatusMessage::CreatingDraft.is_terminal());
        assert!(!StatusMessage::Drafting { at: PickCoord::new(1, 1), team: "A".into() }.is_terminal());
    }
}
