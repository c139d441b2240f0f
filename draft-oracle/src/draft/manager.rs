// Draft lifecycle: create, resume and stop runs.
//
// `DraftManager` owns the process-wide `RunSlot`. Every run attempt,
// including one rejected before it starts, publishes exactly one
// `RunEvent::Finished` carrying its terminal status line.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::backend::DraftBackend;
use crate::draft::model::{Draft, DraftSummary, PickCoord, PlayerPool};
use crate::draft::order;
use crate::draft::poller::PollPolicy;
use crate::draft::run::{PickProgress, RunController, RunEvent, RunOutcome, RunSlot};
use crate::draft::status::StatusMessage;
use crate::error::DraftError;

pub struct DraftManager<B: DraftBackend + ?Sized> {
    backend: Arc<B>,
    policy: PollPolicy,
    slot: RunSlot,
}

impl<B: DraftBackend + ?Sized> DraftManager<B> {
    pub fn new(backend: Arc<B>, policy: PollPolicy) -> Self {
        Self {
            backend,
            policy,
            slot: RunSlot::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Id of the draft with an active run. Callers check this before
    /// starting or resuming; `None` while no run holds the slot or while a
    /// new draft is still being created.
    pub fn running_draft_id(&self) -> Option<String> {
        self.slot.running_draft_id()
    }

    pub fn is_running(&self) -> bool {
        self.slot.is_running()
    }

    pub fn current_progress(&self) -> Option<PickProgress> {
        self.slot.progress()
    }

    /// Signal the active run to stop at its next pick boundary. With a
    /// `draft_id`, only a run on that draft is signalled.
    pub fn stop_draft(&self, draft_id: Option<&str>) -> bool {
        let signalled = self.slot.request_stop(draft_id);
        if signalled {
            info!(draft_id = draft_id.unwrap_or("(active)"), "stop requested");
        } else {
            warn!(draft_id = draft_id.unwrap_or("(any)"), "stop requested but no matching run");
        }
        signalled
    }

    pub async fn list_drafts(&self) -> Result<Vec<DraftSummary>, DraftError> {
        Ok(self.backend.list_drafts().await?)
    }

    pub async fn get_draft(&self, draft_id: &str) -> Result<Draft, DraftError> {
        Ok(self.backend.get_draft(draft_id).await?)
    }

    pub async fn load_player_pool(&self) -> Result<PlayerPool, DraftError> {
        let pool = self.backend.load_player_pool().await?;
        info!(pool_id = %pool.id, players = pool.players.len(), "player pool loaded");
        Ok(pool)
    }

    /// Create a draft and run it from Round 1, Pick 1.
    pub async fn start_new_draft(
        &self,
        events: &mpsc::Sender<RunEvent>,
    ) -> Result<RunOutcome, DraftError> {
        let mut created_id = None;
        let result = self.new_draft_run(events, &mut created_id).await;
        self.finish(events, created_id, result).await
    }

    /// Continue `draft_id` from the resume point the backend derives from
    /// its decided picks.
    pub async fn resume_draft(
        &self,
        draft_id: &str,
        events: &mpsc::Sender<RunEvent>,
    ) -> Result<RunOutcome, DraftError> {
        let result = self.resume_run(draft_id, events).await;
        let known_id = (!draft_id.trim().is_empty()).then(|| draft_id.to_string());
        self.finish(events, known_id, result).await
    }

    async fn new_draft_run(
        &self,
        events: &mpsc::Sender<RunEvent>,
        created_id: &mut Option<String>,
    ) -> Result<RunOutcome, DraftError> {
        let pool = self.backend.check_player_pool().await?;
        if !pool.exists {
            return Err(DraftError::Precondition(
                "Player pool must be loaded before creating a draft".to_string(),
            ));
        }

        let run = self.slot.try_acquire(None)?;
        publish(events, RunEvent::Status(StatusMessage::CreatingDraft)).await;

        let created = self.backend.create_draft().await?;
        run.bind_draft(&created.draft_id);
        *created_id = Some(created.draft_id.clone());
        let draft = self.backend.get_draft(&created.draft_id).await?;
        info!(draft_id = %draft.draft_id, name = %draft.name, "draft created");
        publish(events, RunEvent::DraftUpdated(Box::new(draft.clone()))).await;
        publish(
            events,
            RunEvent::Status(StatusMessage::DraftCreated {
                name: draft.name.clone(),
            }),
        )
        .await;

        RunController::new(self.backend.as_ref(), self.policy, events)
            .run_draft_picks(draft, PickCoord::new(1, 1), &run)
            .await
    }

    async fn resume_run(
        &self,
        draft_id: &str,
        events: &mpsc::Sender<RunEvent>,
    ) -> Result<RunOutcome, DraftError> {
        if draft_id.trim().is_empty() {
            return Err(DraftError::Precondition("No draft selected".to_string()));
        }
        let run = self.slot.try_acquire(Some(draft_id))?;

        let draft = self.backend.get_draft(draft_id).await?;
        if draft.is_complete {
            return Err(DraftError::AlreadyComplete { name: draft.name });
        }

        let at = self.backend.resume_info(draft_id).await?.coord();
        if at.pick > draft.total_picks() {
            // Every pick is decided but the backend has not flagged the
            // draft complete; the controller finishes without issuing picks.
            info!(draft_id, %at, "resume point is past the last pick");
            return RunController::new(self.backend.as_ref(), self.policy, events)
                .run_draft_picks(draft, at, &run)
                .await;
        }
        order::check_coordinate(at, draft.num_rounds, draft.num_teams())?;
        let team = order::team_for_pick(at.round, at.pick, &draft.draft_order)?;
        // The history row the server pre-populated for this pick must agree
        // with the snake order.
        if let Some(row) = draft.draft_history.iter().find(|r| r.coord() == at) {
            if !order::validate_team_for_pick(at.round, at.pick, &row.team, &draft.draft_order) {
                return Err(DraftError::TeamMismatch {
                    round: at.round,
                    pick: at.pick,
                    team: row.team.clone(),
                    expected: team.to_string(),
                });
            }
        }
        if let Some(local) = draft.next_undecided() {
            if local != at {
                warn!(
                    draft_id,
                    server = %at,
                    local = %local,
                    "resume point differs from first undecided pick; using the server's"
                );
            }
        }

        info!(draft_id, %at, team, "resuming draft");
        publish(events, RunEvent::DraftUpdated(Box::new(draft.clone()))).await;
        publish(
            events,
            RunEvent::Status(StatusMessage::Resuming {
                name: draft.name.clone(),
                at,
            }),
        )
        .await;

        RunController::new(self.backend.as_ref(), self.policy, events)
            .run_draft_picks(draft, at, &run)
            .await
    }

    /// Refresh the draft list and publish the single terminal status line.
    ///
    /// `known_id` names the draft the attempt was for, when one is known,
    /// so a failure can be attributed.
    async fn finish(
        &self,
        events: &mpsc::Sender<RunEvent>,
        known_id: Option<String>,
        result: Result<RunOutcome, DraftError>,
    ) -> Result<RunOutcome, DraftError> {
        match self.backend.list_drafts().await {
            Ok(drafts) => publish(events, RunEvent::DraftsListed(drafts)).await,
            Err(e) => warn!("failed to refresh draft list after run: {e}"),
        }

        let (draft_id, status) = match &result {
            Ok(outcome) => (Some(outcome.draft_id().to_string()), outcome.status()),
            Err(err) => {
                error!(
                    draft_id = known_id.as_deref().unwrap_or("-"),
                    at = ?err.coordinate(),
                    "draft run failed: {err}"
                );
                (known_id, StatusMessage::error(err))
            }
        };
        publish(events, RunEvent::Finished { draft_id, status }).await;
        result
    }
}

async fn publish(events: &mpsc::Sender<RunEvent>, event: RunEvent) {
    let _ = events.send(event).await;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backend::simulated::SimulatedBackend;

    fn manager(backend: SimulatedBackend) -> DraftManager<SimulatedBackend> {
        DraftManager::new(Arc::new(backend), PollPolicy::new(10, Duration::from_millis(10)))
    }

    fn finished(rx: &mut mpsc::Receiver<RunEvent>) -> Vec<StatusMessage> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let RunEvent::Finished { status, .. } = event {
                out.push(status);
            }
        }
        out
    }

    #[tokio::test]
    async fn new_draft_requires_player_pool() {
        let m = manager(SimulatedBackend::with_teams(&["TeamA", "TeamB"], 2).without_player_pool());
        let (tx, mut rx) = mpsc::channel(64);

        let err = m.start_new_draft(&tx).await.unwrap_err();
        assert_eq!(err.to_string(), "Player pool must be loaded before creating a draft");
        assert!(m.backend().list_drafts().await.unwrap().is_empty());
        assert_eq!(
            finished(&mut rx),
            vec![StatusMessage::Error {
                message: "Player pool must be loaded before creating a draft".into()
            }]
        );
        assert!(!m.is_running());
    }

    #[tokio::test]
    async fn resume_without_selection_is_rejected() {
        let m = manager(SimulatedBackend::with_teams(&["TeamA", "TeamB"], 2));
        let (tx, mut rx) = mpsc::channel(64);
        let err = m.resume_draft("", &tx).await.unwrap_err();
        assert!(matches!(err, DraftError::Precondition(_)));
        assert_eq!(finished(&mut rx).len(), 1);
    }

    #[tokio::test]
    async fn new_draft_runs_to_completion_and_releases_slot() {
        tokio::time::pause();
        let m = manager(SimulatedBackend::with_teams(&["TeamA", "TeamB", "TeamC"], 2));
        let (tx, mut rx) = mpsc::channel(256);

        let outcome = m.start_new_draft(&tx).await.unwrap();
        assert_eq!(outcome.draft_id(), "draft-1");
        assert_eq!(m.backend().start_log().len(), 6);
        assert_eq!(m.running_draft_id(), None);
        assert_eq!(m.current_progress(), None);

        let statuses = finished(&mut rx);
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].to_string(), "Draft Simulated Draft 1 is complete");
    }

    #[tokio::test]
    async fn resume_of_complete_draft_is_rejected() {
        tokio::time::pause();
        let m = manager(SimulatedBackend::with_teams(&["TeamA", "TeamB"], 1));
        let (tx, _rx) = mpsc::channel(256);
        m.start_new_draft(&tx).await.unwrap();

        let err = m.resume_draft("draft-1", &tx).await.unwrap_err();
        assert!(matches!(err, DraftError::AlreadyComplete { .. }));
    }

    fn finished_ids(rx: &mut mpsc::Receiver<RunEvent>) -> Vec<Option<String>> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let RunEvent::Finished { draft_id, .. } = event {
                out.push(draft_id);
            }
        }
        out
    }

    #[tokio::test]
    async fn resume_past_last_pick_completes_without_picks() {
        tokio::time::pause();
        let m = manager(SimulatedBackend::with_teams(&["TeamA", "TeamB"], 4).leave_incomplete());
        let draft = m.backend().create_draft().await.unwrap();
        m.backend().prefill_picks(&draft.draft_id, 8).unwrap();
        let (tx, mut rx) = mpsc::channel(64);

        let outcome = m.resume_draft(&draft.draft_id, &tx).await.unwrap();
        assert!(matches!(outcome, RunOutcome::Completed { .. }));
        assert!(m.backend().start_log().is_empty());
        assert_eq!(
            finished(&mut rx),
            vec![StatusMessage::Complete {
                name: "Simulated Draft 1".into()
            }]
        );
        assert!(!m.is_running());
    }

    #[tokio::test]
    async fn resume_point_with_huge_round_fails_cleanly() {
        let m = manager(SimulatedBackend::with_teams(&["TeamA", "TeamB"], 4));
        let draft = m.backend().create_draft().await.unwrap();
        m.backend().override_resume_point(PickCoord::new(u32::MAX, 1));
        let (tx, mut rx) = mpsc::channel(64);

        let err = m.resume_draft(&draft.draft_id, &tx).await.unwrap_err();
        assert!(matches!(err, DraftError::PickOutOfRound { round: u32::MAX, .. }));
        assert_eq!(finished_ids(&mut rx), vec![Some("draft-1".to_string())]);
        assert!(m.backend().start_log().is_empty());
        assert!(!m.is_running());
    }

    #[tokio::test]
    async fn failed_new_draft_reports_its_id() {
        tokio::time::pause();
        let backend = SimulatedBackend::with_teams(&["TeamA", "TeamB"], 2);
        backend.fail_pick(PickCoord::new(1, 1), "no eligible players");
        let m = manager(backend);
        let (tx, mut rx) = mpsc::channel(64);

        m.start_new_draft(&tx).await.unwrap_err();
        assert_eq!(finished_ids(&mut rx), vec![Some("draft-1".to_string())]);
    }

    #[tokio::test]
    async fn precondition_failure_has_no_draft_id() {
        let m = manager(SimulatedBackend::with_teams(&["TeamA", "TeamB"], 2).without_player_pool());
        let (tx, mut rx) = mpsc::channel(64);
        m.start_new_draft(&tx).await.unwrap_err();
        m.resume_draft("", &tx).await.unwrap_err();
        assert_eq!(finished_ids(&mut rx), vec![None, None]);
    }

    #[tokio::test]
    async fn stop_without_run_reports_nothing_signalled() {
        let m = manager(SimulatedBackend::with_teams(&["TeamA", "TeamB"], 1));
        assert!(!m.stop_draft(None));
        assert!(!m.stop_draft(Some("draft-1")));
    }
}
