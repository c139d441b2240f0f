// In-process draft backend.
//
// Implements the same contract as the REST backend: drafts live in memory,
// a started pick is decided after a configurable number of status polls,
// and resume info is derived from the count of decided history rows. Used
// for the offline mode and throughout the tests, which is why it can also
// inject failures and report how it was called.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, info};

use super::{BackendError, DraftBackend, PickAccepted, PickStatus};
use crate::config::SimulationConfig;
use crate::draft::model::{
    Draft, DraftSummary, PickCoord, PickRecord, PlayerPool, PlayerPoolCheck, PoolPlayer,
    ResumeInfo,
};
use crate::draft::order;

const POOL_ID: &str = "simulated-pool";
const POSITIONS: [&str; 4] = ["1B", "C", "OF", "P"];

pub struct SimulatedBackend {
    draft_order: Vec<String>,
    num_rounds: u32,
    decision_polls: u32,
    /// Whether a draft is flagged complete once every pick is decided.
    marks_complete: bool,
    state: Mutex<SimState>,
}

#[derive(Default)]
struct SimState {
    pool_loaded: bool,
    next_draft: u32,
    drafts: Vec<Draft>,
    /// Processing polls left before a started pick is decided.
    in_flight: HashMap<(String, PickCoord), u32>,
    /// Coordinates that report `error` until healed.
    failing: HashMap<PickCoord, String>,
    /// Coordinates whose start request fails at transport level.
    failing_starts: HashSet<PickCoord>,
    /// Status queries that should fail before answering normally again.
    status_outage: u32,
    /// Fail every status query from this 1-based global query number on.
    status_outage_from: Option<u32>,
    status_queries_total: u32,
    status_queries: HashMap<PickCoord, u32>,
    starts: Vec<(PickCoord, String)>,
    /// Answer every resume request with this coordinate.
    resume_override: Option<PickCoord>,
}

impl SimulatedBackend {
    pub fn new(config: &SimulationConfig) -> Self {
        let backend = Self::with_teams(&config.draft_order, config.num_rounds)
            .with_decision_polls(config.decision_polls);
        backend.lock().pool_loaded = config.player_pool_loaded;
        backend
    }

    /// A backend with a loaded player pool and picks decided on the first
    /// status poll.
    pub fn with_teams<S: AsRef<str>>(draft_order: &[S], num_rounds: u32) -> Self {
        SimulatedBackend {
            draft_order: draft_order.iter().map(|s| s.as_ref().to_string()).collect(),
            num_rounds,
            decision_polls: 0,
            marks_complete: true,
            state: Mutex::new(SimState {
                pool_loaded: true,
                ..SimState::default()
            }),
        }
    }

    pub fn with_decision_polls(mut self, polls: u32) -> Self {
        self.decision_polls = polls;
        self
    }

    /// Never flag drafts complete, like a backend that lags behind its own
    /// history.
    pub fn leave_incomplete(mut self) -> Self {
        self.marks_complete = false;
        self
    }

    /// Report `coord` from `resume_info` instead of deriving it.
    pub fn override_resume_point(&self, coord: PickCoord) {
        self.lock().resume_override = Some(coord);
    }

    pub fn without_player_pool(self) -> Self {
        self.lock().pool_loaded = false;
        self
    }

    /// Make `coord` report `error` with `reason` until `heal_pick`.
    pub fn fail_pick(&self, coord: PickCoord, reason: &str) {
        self.lock().failing.insert(coord, reason.to_string());
    }

    pub fn heal_pick(&self, coord: PickCoord) {
        self.lock().failing.remove(&coord);
    }

    /// Make the start request for `coord` fail at transport level.
    pub fn fail_start(&self, coord: PickCoord) {
        self.lock().failing_starts.insert(coord);
    }

    /// Fail the next `n` status queries at transport level.
    pub fn fail_next_status_queries(&self, n: u32) {
        self.lock().status_outage = n;
    }

    /// Fail every status query from the `nth` (counted across the backend's
    /// lifetime, 1-based) onward.
    pub fn fail_status_queries_from(&self, nth: u32) {
        self.lock().status_outage_from = Some(nth);
    }

    /// Status queries made for `coord`, including failed ones.
    pub fn status_queries(&self, coord: PickCoord) -> u32 {
        self.lock().status_queries.get(&coord).copied().unwrap_or(0)
    }

    /// Every accepted start request, in the order received.
    pub fn start_log(&self) -> Vec<(PickCoord, String)> {
        self.lock().starts.clone()
    }

    /// Decide the first `count` picks of `draft_id` directly, as if an
    /// earlier session had run them.
    pub fn prefill_picks(&self, draft_id: &str, count: u32) -> Result<(), BackendError> {
        let mut state = self.lock();
        let start = state.player_cursor(draft_id);
        let draft = state.draft_mut(draft_id)?;
        for (offset, record) in draft.draft_history.iter_mut().take(count as usize).enumerate() {
            let n = start + offset as u32 + 1;
            record.selection = Some(player_name(n));
            record.rationale = Some("prefilled".to_string());
        }
        draft.is_complete = self.marks_complete && draft.completed_picks() == draft.total_picks();
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().expect("simulated backend mutex poisoned")
    }

    fn pool_size(&self) -> u32 {
        (self.num_rounds * self.draft_order.len() as u32) * 2
    }

    fn build_draft(&self, id: u32) -> Result<Draft, BackendError> {
        let num_teams = self.draft_order.len() as u32;
        let mut history = Vec::new();
        for round in 1..=self.num_rounds {
            for pick in order::pick_range(round, num_teams) {
                let team = order::team_for_pick(round, pick, &self.draft_order)
                    .map_err(|e| BackendError::Rejected(e.to_string()))?;
                history.push(PickRecord {
                    round,
                    pick,
                    team: team.to_string(),
                    selection: None,
                    rationale: None,
                });
            }
        }
        Ok(Draft {
            draft_id: format!("draft-{id}"),
            name: format!("Simulated Draft {id}"),
            num_rounds: self.num_rounds,
            draft_order: self.draft_order.clone(),
            is_complete: false,
            draft_history: history,
        })
    }
}

impl SimState {
    fn draft(&self, draft_id: &str) -> Result<&Draft, BackendError> {
        self.drafts
            .iter()
            .find(|d| d.draft_id == draft_id)
            .ok_or_else(|| not_found(draft_id))
    }

    fn draft_mut(&mut self, draft_id: &str) -> Result<&mut Draft, BackendError> {
        self.drafts
            .iter_mut()
            .find(|d| d.draft_id == draft_id)
            .ok_or_else(|| not_found(draft_id))
    }

    /// Players already handed out in `draft_id`.
    fn player_cursor(&self, draft_id: &str) -> u32 {
        self.draft(draft_id).map(|d| d.completed_picks()).unwrap_or(0)
    }

    fn take_status_outage(&mut self) -> bool {
        if self
            .status_outage_from
            .is_some_and(|from| self.status_queries_total >= from)
        {
            return true;
        }
        if self.status_outage > 0 {
            self.status_outage -= 1;
            return true;
        }
        false
    }
}

#[async_trait]
impl DraftBackend for SimulatedBackend {
    async fn check_player_pool(&self) -> Result<PlayerPoolCheck, BackendError> {
        let state = self.lock();
        Ok(PlayerPoolCheck {
            exists: state.pool_loaded,
            pool_id: state.pool_loaded.then(|| POOL_ID.to_string()),
        })
    }

    async fn load_player_pool(&self) -> Result<PlayerPool, BackendError> {
        self.lock().pool_loaded = true;
        let players = (1..=self.pool_size())
            .map(|n| PoolPlayer {
                id: n as u64,
                name: player_name(n),
                position: POSITIONS[(n as usize - 1) % POSITIONS.len()].to_string(),
                is_drafted: false,
            })
            .collect();
        Ok(PlayerPool {
            id: POOL_ID.to_string(),
            players,
        })
    }

    async fn create_draft(&self) -> Result<Draft, BackendError> {
        let mut state = self.lock();
        if !state.pool_loaded {
            return Err(BackendError::Rejected("Player pool not found".to_string()));
        }
        state.next_draft += 1;
        let draft = self.build_draft(state.next_draft)?;
        info!(draft_id = %draft.draft_id, "simulated draft created");
        state.drafts.push(draft.clone());
        Ok(draft)
    }

    async fn get_draft(&self, draft_id: &str) -> Result<Draft, BackendError> {
        self.lock().draft(draft_id).cloned()
    }

    async fn list_drafts(&self) -> Result<Vec<DraftSummary>, BackendError> {
        Ok(self.lock().drafts.iter().map(Draft::summary).collect())
    }

    async fn start_pick(
        &self,
        draft_id: &str,
        team_name: &str,
        round: u32,
        pick: u32,
    ) -> Result<PickAccepted, BackendError> {
        let coord = PickCoord::new(round, pick);
        let mut state = self.lock();
        if state.failing_starts.contains(&coord) {
            return Err(BackendError::Unavailable(format!("start request for {coord} dropped")));
        }

        let draft = state.draft(draft_id)?;
        if draft.is_complete {
            return Err(BackendError::Rejected("Draft is complete".to_string()));
        }
        let expected = order::team_for_pick(round, pick, &draft.draft_order)
            .map_err(|e| BackendError::Rejected(e.to_string()))?;
        if !expected.eq_ignore_ascii_case(team_name) {
            return Err(BackendError::Rejected(format!(
                "Invalid draft order: {team_name} cannot draft at Round {round}, Pick {pick}. Expected: {expected}"
            )));
        }

        state
            .in_flight
            .insert((draft_id.to_string(), coord), self.decision_polls);
        state.starts.push((coord, team_name.to_string()));
        debug!(%coord, team = team_name, "simulated pick started");
        Ok(PickAccepted {
            status: "accepted".to_string(),
            message: Some(format!("Draft selection started for {team_name}")),
        })
    }

    async fn pick_status(
        &self,
        draft_id: &str,
        round: u32,
        pick: u32,
    ) -> Result<PickStatus, BackendError> {
        let coord = PickCoord::new(round, pick);
        let mut state = self.lock();
        state.status_queries_total += 1;
        *state.status_queries.entry(coord).or_insert(0) += 1;

        if state.take_status_outage() {
            return Err(BackendError::Unavailable("status endpoint unreachable".to_string()));
        }
        if let Some(reason) = state.failing.get(&coord) {
            return Ok(PickStatus::Error {
                error: Some(reason.clone()),
                message: Some("Draft pick failed".to_string()),
            });
        }

        let record = state
            .draft(draft_id)?
            .draft_history
            .iter()
            .find(|r| r.coord() == coord)
            .cloned();
        let Some(record) = record else {
            return Ok(PickStatus::NotFound);
        };
        if record.is_decided() {
            return Ok(PickStatus::Completed {
                player_name: record.selection,
                reason: record.rationale,
            });
        }

        let key = (draft_id.to_string(), coord);
        match state.in_flight.get(&key).copied() {
            Some(0) => {
                state.in_flight.remove(&key);
                let n = state.player_cursor(draft_id) + 1;
                let player = player_name(n);
                let rationale = format!("{} takes the best available player", record.team);
                let draft = state.draft_mut(draft_id)?;
                if let Some(row) = draft.draft_history.iter_mut().find(|r| r.coord() == coord) {
                    row.selection = Some(player.clone());
                    row.rationale = Some(rationale.clone());
                }
                draft.is_complete = self.marks_complete && draft.completed_picks() == draft.total_picks();
                Ok(PickStatus::Completed {
                    player_name: Some(player),
                    reason: Some(rationale),
                })
            }
            Some(left) => {
                state.in_flight.insert(key, left - 1);
                Ok(PickStatus::Processing)
            }
            None => Ok(PickStatus::Processing),
        }
    }

    async fn resume_info(&self, draft_id: &str) -> Result<ResumeInfo, BackendError> {
        let state = self.lock();
        let draft = state.draft(draft_id)?;
        if draft.is_complete {
            return Err(BackendError::Rejected("Draft is already complete".to_string()));
        }
        if let Some(coord) = state.resume_override {
            return Ok(ResumeInfo {
                current_round: coord.round,
                current_pick: coord.pick,
            });
        }
        let next_pick = draft.completed_picks() + 1;
        Ok(ResumeInfo {
            current_round: order::round_from_pick(next_pick, draft.num_teams()),
            current_pick: next_pick,
        })
    }
}

fn player_name(n: u32) -> String {
    format!("Player {n}")
}

fn not_found(draft_id: &str) -> BackendError {
    BackendError::Status {
        op: "fetch draft",
        status: 404,
        detail: format!("Draft {draft_id} not found"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> SimulatedBackend {
        SimulatedBackend::with_teams(&["TeamA", "TeamB"], 4)
    }

    #[tokio::test]
    async fn created_draft_has_prepopulated_snake_history() {
        let b = backend();
        let draft = b.create_draft().await.unwrap();
        assert_eq!(draft.draft_id, "draft-1");
        assert_eq!(draft.draft_history.len(), 8);
        let teams: Vec<&str> = draft.draft_history.iter().map(|r| r.team.as_str()).collect();
        assert_eq!(teams, vec!["TeamA", "TeamB", "TeamB", "TeamA", "TeamA", "TeamB", "TeamB", "TeamA"]);
        assert_eq!(draft.completed_picks(), 0);
    }

    #[tokio::test]
    async fn create_requires_player_pool() {
        let b = backend().without_player_pool();
        assert!(!b.check_player_pool().await.unwrap().exists);
        assert!(b.create_draft().await.is_err());

        let pool = b.load_player_pool().await.unwrap();
        assert_eq!(pool.players.len(), 16);
        assert!(b.check_player_pool().await.unwrap().exists);
        assert!(b.create_draft().await.is_ok());
    }

    #[tokio::test]
    async fn start_rejects_wrong_team() {
        let b = backend();
        let draft = b.create_draft().await.unwrap();
        let err = b.start_pick(&draft.draft_id, "TeamA", 2, 3).await.unwrap_err();
        assert!(err.to_string().contains("Expected: TeamB"));
        assert!(b.start_log().is_empty());
    }

    #[tokio::test]
    async fn pick_decided_after_configured_polls() {
        let b = backend().with_decision_polls(2);
        let draft = b.create_draft().await.unwrap();
        b.start_pick(&draft.draft_id, "TeamA", 1, 1).await.unwrap();

        assert_eq!(b.pick_status(&draft.draft_id, 1, 1).await.unwrap(), PickStatus::Processing);
        assert_eq!(b.pick_status(&draft.draft_id, 1, 1).await.unwrap(), PickStatus::Processing);
        let done = b.pick_status(&draft.draft_id, 1, 1).await.unwrap();
        assert!(matches!(done, PickStatus::Completed { player_name: Some(ref p), .. } if p == "Player 1"));

        let refreshed = b.get_draft(&draft.draft_id).await.unwrap();
        assert_eq!(refreshed.completed_picks(), 1);
    }

    #[tokio::test]
    async fn resume_info_uses_completed_count() {
        let b = backend();
        let draft = b.create_draft().await.unwrap();
        b.prefill_picks(&draft.draft_id, 5).unwrap();
        let info = b.resume_info(&draft.draft_id).await.unwrap();
        assert_eq!(info.coord(), PickCoord::new(3, 6));
    }

    #[tokio::test]
    async fn resume_info_rejects_complete_draft() {
        let b = backend();
        let draft = b.create_draft().await.unwrap();
        b.prefill_picks(&draft.draft_id, 8).unwrap();
        assert!(b.get_draft(&draft.draft_id).await.unwrap().is_complete);
        assert!(b.resume_info(&draft.draft_id).await.is_err());
    }

    #[tokio::test]
    async fn incomplete_backend_reports_past_last_pick() {
        let b = backend().leave_incomplete();
        let draft = b.create_draft().await.unwrap();
        b.prefill_picks(&draft.draft_id, 8).unwrap();
        assert!(!b.get_draft(&draft.draft_id).await.unwrap().is_complete);
        let info = b.resume_info(&draft.draft_id).await.unwrap();
        assert_eq!(info.coord(), PickCoord::new(5, 9));
    }

    #[tokio::test]
    async fn unknown_draft_is_404() {
        let b = backend();
        let err = b.get_draft("nope").await.unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 404, .. }));
    }
}
