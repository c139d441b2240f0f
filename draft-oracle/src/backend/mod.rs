// Draft backend contract.
//
// The backend owns draft persistence and the player-selection decision.
// This crate only starts picks, polls their status, and reads drafts back.

pub mod http;
pub mod simulated;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::draft::model::{Draft, DraftSummary, PlayerPool, PlayerPoolCheck, ResumeInfo};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Failed to {op}: {source}")]
    Transport {
        op: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to {op}: HTTP {status}: {detail}")]
    Status {
        op: &'static str,
        status: u16,
        detail: String,
    },

    #[error("Failed to {op}: invalid response: {message}")]
    Decode { op: &'static str, message: String },

    /// The backend refused a request it understood.
    #[error("{0}")]
    Rejected(String),

    /// The backend could not be reached (simulated outages use this too).
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Acknowledgement of an asynchronous pick start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickAccepted {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Status of one pick's decision process, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PickStatus {
    Processing,
    Completed {
        #[serde(default)]
        player_name: Option<String>,
        #[serde(default, alias = "rationale")]
        reason: Option<String>,
    },
    Error {
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    /// The pick row is not visible yet.
    NotFound,
    #[serde(other)]
    Unknown,
}

impl PickStatus {
    /// Human-readable reason for an `Error` status.
    pub fn error_reason(&self) -> Option<String> {
        match self {
            PickStatus::Error { error, message } => Some(
                error
                    .clone()
                    .or_else(|| message.clone())
                    .unwrap_or_else(|| "unknown error".to_string()),
            ),
            _ => None,
        }
    }
}

/// The operations the orchestration engine consumes.
#[async_trait]
pub trait DraftBackend: Send + Sync {
    async fn check_player_pool(&self) -> Result<PlayerPoolCheck, BackendError>;

    async fn load_player_pool(&self) -> Result<PlayerPool, BackendError>;

    /// Allocate a new draft. Requires a player pool.
    async fn create_draft(&self) -> Result<Draft, BackendError>;

    async fn get_draft(&self, draft_id: &str) -> Result<Draft, BackendError>;

    async fn list_drafts(&self) -> Result<Vec<DraftSummary>, BackendError>;

    /// Start the decision process for one coordinate and return without
    /// waiting for it.
    async fn start_pick(
        &self,
        draft_id: &str,
        team_name: &str,
        round: u32,
        pick: u32,
    ) -> Result<PickAccepted, BackendError>;

    async fn pick_status(
        &self,
        draft_id: &str,
        round: u32,
        pick: u32,
    ) -> Result<PickStatus, BackendError>;

    /// Next undecided coordinate, derived by the backend from history.
    async fn resume_info(&self, draft_id: &str) -> Result<ResumeInfo, BackendError>;
}
