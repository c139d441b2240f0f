// Draft run controller and run-slot ownership.
//
// A run advances a draft one pick at a time from a start coordinate to the
// last pick. Only one run may exist per process: it must hold the
// `RunGuard` handed out by `RunSlot::try_acquire`, and dropping the guard
// releases the slot and clears every run marker, whatever the exit path.
//
// Stopping is cooperative. `StopToken` is checked at the top of each pick;
// an in-flight start request or status poll always runs to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::backend::DraftBackend;
use crate::draft::model::{Draft, DraftSummary, PickCoord};
use crate::draft::order;
use crate::draft::poller::{self, PickDecision, PollPolicy};
use crate::draft::status::StatusMessage;
use crate::error::DraftError;

// ---------------------------------------------------------------------------
// Events and outcomes
// ---------------------------------------------------------------------------

/// The pick currently on the clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickProgress {
    pub at: PickCoord,
    pub team: String,
}

/// Progress notifications published while drafts are created and run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Status(StatusMessage),
    /// Published before the pick request is issued.
    PickStarting(PickProgress),
    PickDecided(PickDecision),
    /// Fresh draft detail from the backend.
    DraftUpdated(Box<Draft>),
    DraftsListed(Vec<DraftSummary>),
    /// Exactly one per run attempt, carrying its terminal status line.
    Finished {
        draft_id: Option<String>,
        status: StatusMessage,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Every pick up to the last one is decided.
    Completed { draft: Draft },
    /// A stop was requested; `at` is the next pick that would have run.
    Stopped { draft_id: String, at: PickCoord },
}

impl RunOutcome {
    pub fn status(&self) -> StatusMessage {
        match self {
            RunOutcome::Completed { draft } => StatusMessage::Complete {
                name: draft.name.clone(),
            },
            RunOutcome::Stopped { at, .. } => StatusMessage::Stopped { at: *at },
        }
    }

    pub fn draft_id(&self) -> &str {
        match self {
            RunOutcome::Completed { draft } => &draft.draft_id,
            RunOutcome::Stopped { draft_id, .. } => draft_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Stop token and run slot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct ActiveRun {
    /// `None` while a new draft is still being created.
    draft_id: Option<String>,
    stop: StopToken,
    progress: Option<PickProgress>,
}

/// Process-wide slot of cardinality one for draft runs.
#[derive(Debug, Clone, Default)]
pub struct RunSlot {
    inner: Arc<Mutex<Option<ActiveRun>>>,
}

impl RunSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot, or fail with `AlreadyRunning` if a run holds it.
    pub fn try_acquire(&self, draft_id: Option<&str>) -> Result<RunGuard, DraftError> {
        let mut active = self.lock();
        if let Some(run) = active.as_ref() {
            return Err(DraftError::AlreadyRunning {
                running: run
                    .draft_id
                    .clone()
                    .unwrap_or_else(|| "(new draft)".to_string()),
            });
        }
        let stop = StopToken::default();
        *active = Some(ActiveRun {
            draft_id: draft_id.map(str::to_string),
            stop: stop.clone(),
            progress: None,
        });
        Ok(RunGuard {
            slot: self.clone(),
            stop,
        })
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_some()
    }

    /// Id of the draft the active run is advancing.
    pub fn running_draft_id(&self) -> Option<String> {
        self.lock().as_ref().and_then(|run| run.draft_id.clone())
    }

    pub fn progress(&self) -> Option<PickProgress> {
        self.lock().as_ref().and_then(|run| run.progress.clone())
    }

    /// Ask the active run to stop at its next pick boundary. With a
    /// `draft_id`, only a run on that draft is stopped. Returns whether a
    /// run was signalled.
    pub fn request_stop(&self, draft_id: Option<&str>) -> bool {
        let active = self.lock();
        match active.as_ref() {
            Some(run) if draft_id.is_none() || run.draft_id.as_deref() == draft_id => {
                run.stop.request_stop();
                true
            }
            _ => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveRun>> {
        self.inner.lock().expect("run slot mutex poisoned")
    }
}

/// Ownership of the run slot. Released on drop.
#[derive(Debug)]
pub struct RunGuard {
    slot: RunSlot,
    stop: StopToken,
}

impl RunGuard {
    pub fn stop_token(&self) -> &StopToken {
        &self.stop
    }

    /// Record which draft this run drives once it is known.
    pub fn bind_draft(&self, draft_id: &str) {
        if let Some(run) = self.slot.lock().as_mut() {
            run.draft_id = Some(draft_id.to_string());
        }
    }

    fn set_progress(&self, progress: PickProgress) {
        if let Some(run) = self.slot.lock().as_mut() {
            run.progress = Some(progress);
        }
    }

    fn clear_progress(&self) {
        if let Some(run) = self.slot.lock().as_mut() {
            run.progress = None;
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        // Never panic in drop, even if another holder poisoned the lock.
        let mut active = match self.slot.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *active = None;
    }
}

// ---------------------------------------------------------------------------
// Run controller
// ---------------------------------------------------------------------------

pub struct RunController<'a, B: DraftBackend + ?Sized> {
    backend: &'a B,
    policy: PollPolicy,
    events: &'a mpsc::Sender<RunEvent>,
}

impl<'a, B: DraftBackend + ?Sized> RunController<'a, B> {
    pub fn new(backend: &'a B, policy: PollPolicy, events: &'a mpsc::Sender<RunEvent>) -> Self {
        Self {
            backend,
            policy,
            events,
        }
    }

    /// Advance `draft` pick by pick from `start` through the last pick.
    ///
    /// Each pick is started and fully awaited before the next is issued.
    /// A failed pick ends the run with its error; nothing is retried here.
    /// The run's progress marker is cleared on every exit path.
    pub async fn run_draft_picks(
        &self,
        draft: Draft,
        start: PickCoord,
        run: &RunGuard,
    ) -> Result<RunOutcome, DraftError> {
        let result = self.advance(draft, start, run).await;
        run.clear_progress();
        result
    }

    async fn advance(
        &self,
        mut draft: Draft,
        start: PickCoord,
        run: &RunGuard,
    ) -> Result<RunOutcome, DraftError> {
        let num_teams = draft.num_teams();
        if num_teams == 0 || draft.num_rounds == 0 {
            return Err(DraftError::Precondition(format!(
                "Draft {} has no teams or rounds",
                draft.name
            )));
        }
        if start.pick > draft.total_picks() {
            return Ok(RunOutcome::Completed { draft });
        }
        order::check_coordinate(start, draft.num_rounds, num_teams)?;

        info!(
            draft_id = %draft.draft_id,
            round = start.round,
            pick = start.pick,
            "draft run starting"
        );

        let mut current_pick = start.pick;
        for round in start.round..=draft.num_rounds {
            let range = order::pick_range(round, num_teams);
            for pick in current_pick.max(*range.start())..=*range.end() {
                let at = PickCoord::new(round, pick);
                if run.stop_token().is_stop_requested() {
                    info!(draft_id = %draft.draft_id, %at, "draft run stopped");
                    return Ok(RunOutcome::Stopped {
                        draft_id: draft.draft_id,
                        at,
                    });
                }

                let team = order::team_for_pick(round, pick, &draft.draft_order)?.to_string();
                let progress = PickProgress {
                    at,
                    team: team.clone(),
                };
                run.set_progress(progress.clone());
                self.publish(RunEvent::PickStarting(progress)).await;
                self.publish(RunEvent::Status(StatusMessage::Drafting {
                    at,
                    team: team.clone(),
                }))
                .await;

                self.backend
                    .start_pick(&draft.draft_id, &team, round, pick)
                    .await
                    .map_err(|e| DraftError::transport(at, e))?;
                info!(draft_id = %draft.draft_id, %at, team = %team, "pick started");

                let decision =
                    poller::wait_for_pick_completion(self.backend, &draft.draft_id, at, self.policy)
                        .await?;
                self.publish(RunEvent::PickDecided(decision)).await;

                draft = self
                    .backend
                    .get_draft(&draft.draft_id)
                    .await
                    .map_err(|e| DraftError::transport(at, e))?;
                self.publish(RunEvent::DraftUpdated(Box::new(draft.clone())))
                    .await;

                current_pick = pick + 1;
            }
        }

        if !draft.is_complete {
            warn!(
                draft_id = %draft.draft_id,
                "all picks issued but backend does not report the draft complete"
            );
        }
        info!(draft_id = %draft.draft_id, "draft run complete");
        Ok(RunOutcome::Completed { draft })
    }

    async fn publish(&self, event: RunEvent) {
        // Observers are optional; a closed channel does not stop the run.
        let _ = self.events.send(event).await;
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backend::simulated::SimulatedBackend;

    fn policy() -> PollPolicy {
        PollPolicy::new(10, Duration::from_millis(50))
    }

    async fn new_draft(backend: &SimulatedBackend) -> Draft {
        backend.create_draft().await.unwrap()
    }

    fn drain(rx: &mut mpsc::Receiver<RunEvent>) -> Vec<RunEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn slot_admits_one_run_at_a_time() {
        let slot = RunSlot::new();
        let guard = slot.try_acquire(Some("d1")).unwrap();
        assert_eq!(slot.running_draft_id().as_deref(), Some("d1"));

        match slot.try_acquire(Some("d2")) {
            Err(DraftError::AlreadyRunning { running }) => assert_eq!(running, "d1"),
            other => panic!("expected AlreadyRunning, got {other:?}"),
        }

        drop(guard);
        assert!(!slot.is_running());
        assert!(slot.try_acquire(Some("d2")).is_ok());
    }

    #[test]
    fn unbound_run_reports_new_draft() {
        let slot = RunSlot::new();
        let guard = slot.try_acquire(None).unwrap();
        assert!(slot.is_running());
        assert_eq!(slot.running_draft_id(), None);
        let err = slot.try_acquire(None).unwrap_err();
        assert_eq!(err.to_string(), "Draft (new draft) is already running");

        guard.bind_draft("draft-9");
        assert_eq!(slot.running_draft_id().as_deref(), Some("draft-9"));
    }

    #[test]
    fn stop_only_signals_matching_draft() {
        let slot = RunSlot::new();
        let guard = slot.try_acquire(Some("d1")).unwrap();
        assert!(!slot.request_stop(Some("other")));
        assert!(!guard.stop_token().is_stop_requested());
        assert!(slot.request_stop(Some("d1")));
        assert!(guard.stop_token().is_stop_requested());
    }

    #[test]
    fn stop_without_run_is_a_no_op() {
        let slot = RunSlot::new();
        assert!(!slot.request_stop(None));
    }

    #[tokio::test]
    async fn full_run_issues_every_pick_in_order() {
        tokio::time::pause();
        let backend = SimulatedBackend::with_teams(&["TeamA", "TeamB"], 4).with_decision_polls(1);
        let draft = new_draft(&backend).await;
        let slot = RunSlot::new();
        let guard = slot.try_acquire(Some(&draft.draft_id)).unwrap();
        let (tx, mut rx) = mpsc::channel(256);

        let outcome = RunController::new(&backend, policy(), &tx)
            .run_draft_picks(draft, PickCoord::new(1, 1), &guard)
            .await
            .unwrap();

        let RunOutcome::Completed { draft } = outcome else {
            panic!("expected completion");
        };
        assert!(draft.is_complete);
        assert_eq!(draft.completed_picks(), 8);

        let starts: Vec<(u32, String)> = backend
            .start_log()
            .into_iter()
            .map(|(at, team)| (at.pick, team))
            .collect();
        let expected: Vec<(u32, String)> = ["TeamA", "TeamB", "TeamB", "TeamA", "TeamA", "TeamB", "TeamB", "TeamA"]
            .iter()
            .enumerate()
            .map(|(i, t)| (i as u32 + 1, t.to_string()))
            .collect();
        assert_eq!(starts, expected);

        // Progress is published before each request.
        let events = drain(&mut rx);
        let first = events.iter().position(|e| matches!(e, RunEvent::PickStarting(_))).unwrap();
        let decided = events.iter().position(|e| matches!(e, RunEvent::PickDecided(_))).unwrap();
        assert!(first < decided);
        assert!(events.contains(&RunEvent::Status(StatusMessage::Drafting {
            at: PickCoord::new(2, 3),
            team: "TeamB".into(),
        })));
        assert_eq!(slot.progress(), None);
    }

    #[tokio::test]
    async fn stop_before_start_issues_nothing() {
        tokio::time::pause();
        let backend = SimulatedBackend::with_teams(&["TeamA", "TeamB"], 4);
        let draft = new_draft(&backend).await;
        let slot = RunSlot::new();
        let guard = slot.try_acquire(Some(&draft.draft_id)).unwrap();
        guard.stop_token().request_stop();
        let (tx, _rx) = mpsc::channel(16);

        let outcome = RunController::new(&backend, policy(), &tx)
            .run_draft_picks(draft, PickCoord::new(3, 6), &guard)
            .await
            .unwrap();
        assert_eq!(outcome.status().to_string(), "Draft stopped at Round 3, Pick 6");
        assert!(backend.start_log().is_empty());
    }

    #[tokio::test]
    async fn failed_pick_ends_run_and_clears_progress() {
        tokio::time::pause();
        let backend = SimulatedBackend::with_teams(&["TeamA", "TeamB"], 4);
        backend.fail_pick(PickCoord::new(2, 3), "roster full");
        let draft = new_draft(&backend).await;
        let slot = RunSlot::new();
        let guard = slot.try_acquire(Some(&draft.draft_id)).unwrap();
        let (tx, _rx) = mpsc::channel(256);

        let err = RunController::new(&backend, policy(), &tx)
            .run_draft_picks(draft, PickCoord::new(1, 1), &guard)
            .await
            .unwrap_err();
        assert_eq!(err.coordinate(), Some(PickCoord::new(2, 3)));
        assert_eq!(backend.start_log().len(), 3);
        assert_eq!(slot.progress(), None);
        // The slot stays held until the guard is dropped.
        assert!(slot.is_running());
    }

    #[tokio::test]
    async fn start_request_failure_is_fatal() {
        tokio::time::pause();
        let backend = SimulatedBackend::with_teams(&["TeamA", "TeamB"], 4);
        backend.fail_start(PickCoord::new(1, 2));
        let draft = new_draft(&backend).await;
        let slot = RunSlot::new();
        let guard = slot.try_acquire(Some(&draft.draft_id)).unwrap();
        let (tx, _rx) = mpsc::channel(256);

        let err = RunController::new(&backend, policy(), &tx)
            .run_draft_picks(draft, PickCoord::new(1, 1), &guard)
            .await
            .unwrap_err();
        assert!(matches!(err, DraftError::Transport { round: 1, pick: 2, .. }));
        assert_eq!(backend.start_log().len(), 1);
    }

    #[tokio::test]
    async fn inconsistent_start_coordinate_is_rejected() {
        let backend = SimulatedBackend::with_teams(&["TeamA", "TeamB"], 4);
        let draft = new_draft(&backend).await;
        let slot = RunSlot::new();
        let guard = slot.try_acquire(Some(&draft.draft_id)).unwrap();
        let (tx, _rx) = mpsc::channel(16);

        let err = RunController::new(&backend, policy(), &tx)
            .run_draft_picks(draft, PickCoord::new(1, 5), &guard)
            .await
            .unwrap_err();
        assert!(matches!(err, DraftError::PickOutOfRound { round: 1, pick: 5, .. }));
        assert!(backend.start_log().is_empty());
    }

    #[tokio::test]
    async fn start_past_last_pick_is_already_complete() {
        let backend = SimulatedBackend::with_teams(&["TeamA", "TeamB"], 4);
        let draft = new_draft(&backend).await;
        let slot = RunSlot::new();
        let guard = slot.try_acquire(Some(&draft.draft_id)).unwrap();
        let (tx, _rx) = mpsc::channel(16);

        let outcome = RunController::new(&backend, policy(), &tx)
            .run_draft_picks(draft, PickCoord::new(5, 9), &guard)
            .await
            .unwrap();
        assert!(matches!(outcome, RunOutcome::Completed { .. }));
        assert!(backend.start_log().is_empty());
    }
}
