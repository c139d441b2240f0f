// Error taxonomy for draft runs and lifecycle operations.

use std::time::Duration;

use thiserror::Error;

use crate::backend::BackendError;
use crate::draft::model::PickCoord;

#[derive(Debug, Error)]
pub enum DraftError {
    /// Rejected before any network call. The message is shown verbatim.
    #[error("{0}")]
    Precondition(String),

    /// Another run holds the single run slot.
    #[error("Draft {running} is already running")]
    AlreadyRunning { running: String },

    #[error("Draft {name} is already complete")]
    AlreadyComplete { name: String },

    #[error("Pick {pick} is outside Round {round} (picks {first}-{last})")]
    PickOutOfRound {
        round: u32,
        pick: u32,
        first: u32,
        last: u32,
    },

    #[error(
        "Invalid draft order: {team} cannot draft at Round {round}, Pick {pick}. Expected: {expected}"
    )]
    TeamMismatch {
        round: u32,
        pick: u32,
        team: String,
        expected: String,
    },

    /// The backend reported an error for this pick.
    #[error("Pick failed at Round {round}, Pick {pick}: {reason}")]
    PickFailed { round: u32, pick: u32, reason: String },

    #[error(
        "Timed out waiting for Round {round}, Pick {pick} after {}s ({attempts} polls)",
        elapsed.as_secs()
    )]
    PickTimeout {
        round: u32,
        pick: u32,
        attempts: u32,
        elapsed: Duration,
    },

    /// A transport failure while driving a specific pick.
    #[error("Round {round}, Pick {pick}: {source}")]
    Transport {
        round: u32,
        pick: u32,
        #[source]
        source: BackendError,
    },

    /// A transport failure outside any pick (create, fetch, resume info).
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl DraftError {
    /// The coordinate a run failed at, so a later resume can be checked
    /// against it.
    pub fn coordinate(&self) -> Option<PickCoord> {
        match self {
            DraftError::PickOutOfRound { round, pick, .. }
            | DraftError::TeamMismatch { round, pick, .. }
            | DraftError::PickFailed { round, pick, .. }
            | DraftError::PickTimeout { round, pick, .. }
            | DraftError::Transport { round, pick, .. } => Some(PickCoord::new(*round, *pick)),
            _ => None,
        }
    }

    pub(crate) fn transport(coord: PickCoord, source: BackendError) -> Self {
        DraftError::Transport {
            round: coord.round,
            pick: coord.pick,
            source,
        }
    }
}
