// Draft data model as exchanged with the draft backend.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// A (round, pick) pair identifying one turn in a draft.
///
/// `pick` is the overall pick number (1-based, across all rounds), not the
/// index within the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PickCoord {
    pub round: u32,
    pub pick: u32,
}

impl PickCoord {
    pub fn new(round: u32, pick: u32) -> Self {
        PickCoord { round, pick }
    }
}

impl fmt::Display for PickCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Round {}, Pick {}", self.round, self.pick)
    }
}

/// One row of a draft's pick history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickRecord {
    pub round: u32,
    pub pick: u32,
    /// Team that drafts at this coordinate.
    pub team: String,
    /// Selected player. The backend pre-populates undecided rows with an
    /// empty string, which is read as `None`.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub selection: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub rationale: Option<String>,
}

impl PickRecord {
    pub fn coord(&self) -> PickCoord {
        PickCoord::new(self.round, self.pick)
    }

    pub fn is_decided(&self) -> bool {
        self.selection.is_some()
    }
}

/// Full draft detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub draft_id: String,
    #[serde(default)]
    pub name: String,
    pub num_rounds: u32,
    /// Round-1 turn order. Fixed for the lifetime of the draft.
    #[serde(default)]
    pub draft_order: Vec<String>,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub draft_history: Vec<PickRecord>,
}

impl Draft {
    pub fn num_teams(&self) -> u32 {
        self.draft_order.len() as u32
    }

    /// Total possible picks: `num_rounds × N`.
    pub fn total_picks(&self) -> u32 {
        self.num_rounds * self.num_teams()
    }

    /// Number of history rows that carry a selection.
    pub fn completed_picks(&self) -> u32 {
        self.draft_history.iter().filter(|r| r.is_decided()).count() as u32
    }

    /// History rows that have been decided, in pick order.
    pub fn decided_picks(&self) -> impl Iterator<Item = &PickRecord> {
        self.draft_history.iter().filter(|r| r.is_decided())
    }

    /// The resume point computed from local history, or `None` once every
    /// pick is decided. The backend's `resumeInfo` remains authoritative.
    pub fn next_undecided(&self) -> Option<PickCoord> {
        let next_pick = self.completed_picks() + 1;
        if self.num_teams() == 0 || next_pick > self.total_picks() {
            return None;
        }
        Some(PickCoord::new(
            super::order::round_from_pick(next_pick, self.num_teams()),
            next_pick,
        ))
    }

    pub fn summary(&self) -> DraftSummary {
        DraftSummary {
            draft_id: self.draft_id.clone(),
            name: self.name.clone(),
            num_rounds: self.num_rounds,
            is_complete: self.is_complete,
        }
    }
}

/// Draft list entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSummary {
    pub draft_id: String,
    #[serde(default)]
    pub name: String,
    pub num_rounds: u32,
    #[serde(default)]
    pub is_complete: bool,
}

/// Server-computed resume point for an incomplete draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeInfo {
    pub current_round: u32,
    pub current_pick: u32,
}

impl ResumeInfo {
    pub fn coord(&self) -> PickCoord {
        PickCoord::new(self.current_round, self.current_pick)
    }
}

/// Whether a player pool exists on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPoolCheck {
    pub exists: bool,
    #[serde(default)]
    pub pool_id: Option<String>,
}

/// A loaded player pool. Only the identity and size matter here; player
/// details stay with the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerPool {
    pub id: String,
    #[serde(default)]
    pub players: Vec<PoolPlayer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolPlayer {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub is_drafted: bool,
}

/// Accept `null`, a missing field, or `""` as `None`.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
