// Application state and orchestration logic.
//
// The event loop between the TUI and the draft manager. User commands come
// in from the TUI, run events come back from spawned draft tasks, and UI
// updates go out to the render loop. Long operations never run inline.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::backend::DraftBackend;
use crate::draft::manager::DraftManager;
use crate::draft::model::DraftSummary;
use crate::draft::run::RunEvent;
use crate::draft::status::StatusMessage;
use crate::error::DraftError;
use crate::protocol::{UiUpdate, UserCommand};

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState<B: DraftBackend + ?Sized> {
    manager: Arc<DraftManager<B>>,
    /// Cloned into every spawned task; the receiving end feeds `run`.
    run_tx: mpsc::Sender<RunEvent>,
    drafts: Vec<DraftSummary>,
    selected: Option<usize>,
}

impl<B: DraftBackend + ?Sized + 'static> AppState<B> {
    pub fn new(manager: Arc<DraftManager<B>>, run_tx: mpsc::Sender<RunEvent>) -> Self {
        AppState {
            manager,
            run_tx,
            drafts: Vec::new(),
            selected: None,
        }
    }

    pub fn drafts(&self) -> &[DraftSummary] {
        &self.drafts
    }

    pub fn selected_draft_id(&self) -> Option<&str> {
        self.selected
            .and_then(|i| self.drafts.get(i))
            .map(|d| d.draft_id.as_str())
    }

    /// Replace the list, keeping the selection on the same draft if it is
    /// still listed.
    fn set_drafts(&mut self, drafts: Vec<DraftSummary>) {
        let keep = self.selected_draft_id().map(str::to_string);
        self.drafts = drafts;
        self.selected = keep
            .and_then(|id| self.drafts.iter().position(|d| d.draft_id == id))
            .or_else(|| (!self.drafts.is_empty()).then_some(0));
    }

    fn upsert_summary(&mut self, summary: DraftSummary) {
        match self.drafts.iter_mut().find(|d| d.draft_id == summary.draft_id) {
            Some(existing) => *existing = summary,
            None => self.drafts.push(summary),
        }
        if self.selected.is_none() {
            self.selected = Some(0);
        }
    }

    fn select_draft(&mut self, draft_id: &str) {
        if let Some(i) = self.drafts.iter().position(|d| d.draft_id == draft_id) {
            self.selected = Some(i);
        }
    }

    /// Move the selection by `delta`, clamped to the list. Returns whether
    /// it changed.
    fn move_selection(&mut self, delta: isize) -> bool {
        if self.drafts.is_empty() {
            return false;
        }
        let last = self.drafts.len() - 1;
        let current = self.selected.unwrap_or(0);
        let next = current.saturating_add_signed(delta).min(last);
        let changed = self.selected != Some(next);
        self.selected = Some(next);
        changed
    }

    fn draft_list_update(&self) -> UiUpdate {
        UiUpdate::DraftList {
            drafts: self.drafts.clone(),
            selected: self.selected,
        }
    }

    /// Reject a run request while another run holds the slot.
    fn check_idle(&self) -> Result<(), DraftError> {
        if self.manager.is_running() {
            return Err(DraftError::AlreadyRunning {
                running: self
                    .manager
                    .running_draft_id()
                    .unwrap_or_else(|| "(new draft)".to_string()),
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Spawned operations
    // -----------------------------------------------------------------------

    fn spawn_new_draft(&self) {
        let manager = Arc::clone(&self.manager);
        let tx = self.run_tx.clone();
        tokio::spawn(async move {
            let _ = manager.start_new_draft(&tx).await;
        });
    }

    fn spawn_resume(&self, draft_id: String) {
        let manager = Arc::clone(&self.manager);
        let tx = self.run_tx.clone();
        tokio::spawn(async move {
            let _ = manager.resume_draft(&draft_id, &tx).await;
        });
    }

    fn spawn_load_player_pool(&self) {
        let manager = Arc::clone(&self.manager);
        let tx = self.run_tx.clone();
        tokio::spawn(async move {
            let status = match manager.load_player_pool().await {
                Ok(pool) => StatusMessage::PlayerPoolLoaded {
                    players: pool.players.len(),
                },
                Err(e) => StatusMessage::error(&e),
            };
            let _ = tx.send(RunEvent::Status(status)).await;
        });
    }

    fn spawn_refresh(&self) {
        let manager = Arc::clone(&self.manager);
        let tx = self.run_tx.clone();
        tokio::spawn(async move {
            let event = match manager.list_drafts().await {
                Ok(drafts) => RunEvent::DraftsListed(drafts),
                Err(e) => RunEvent::Status(StatusMessage::error(&e)),
            };
            let _ = tx.send(event).await;
        });
    }

    fn spawn_fetch_detail(&self, draft_id: String) {
        let manager = Arc::clone(&self.manager);
        let tx = self.run_tx.clone();
        tokio::spawn(async move {
            match manager.get_draft(&draft_id).await {
                Ok(draft) => {
                    let _ = tx.send(RunEvent::DraftUpdated(Box::new(draft))).await;
                }
                Err(e) => {
                    warn!(draft_id, "failed to fetch draft detail: {e}");
                    let _ = tx.send(RunEvent::Status(StatusMessage::error(&e))).await;
                }
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop.
///
/// Listens on two channels using `tokio::select!`:
/// 1. User commands from the TUI
/// 2. Run events from spawned draft tasks
///
/// Pushes UI updates through `ui_tx` for the TUI render loop.
pub async fn run<B: DraftBackend + ?Sized + 'static>(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    mut run_rx: mpsc::Receiver<RunEvent>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState<B>,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    match state
        .manager
        .list_drafts()
        .await
        .context("failed to load drafts")
    {
        Ok(drafts) => {
            info!("Loaded {} drafts", drafts.len());
            state.set_drafts(drafts);
            let _ = ui_tx.send(state.draft_list_update()).await;
            if let Some(id) = state.selected_draft_id() {
                state.spawn_fetch_detail(id.to_string());
            }
        }
        Err(e) => {
            warn!("{e:#}");
            let _ = ui_tx.send(UiUpdate::Status(format!("Error: {e:#}"))).await;
        }
    }

    loop {
        tokio::select! {
            // --- Run events ---
            event = run_rx.recv() => {
                match event {
                    Some(event) => handle_run_event(&mut state, event, &ui_tx).await,
                    None => {
                        info!("Run event channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => handle_user_command(&mut state, cmd, &ui_tx).await,
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }
        }
    }

    // A run in flight stops at its next pick boundary.
    if state.manager.is_running() {
        state.manager.stop_draft(None);
    }
    info!("Application event loop exiting");
    Ok(())
}

async fn handle_run_event<B: DraftBackend + ?Sized + 'static>(
    state: &mut AppState<B>,
    event: RunEvent,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match event {
        RunEvent::Status(status) => {
            let _ = ui_tx.send(UiUpdate::Status(status.to_string())).await;
        }
        RunEvent::PickStarting(progress) => {
            let _ = ui_tx
                .send(UiUpdate::RunningDraft(state.manager.running_draft_id()))
                .await;
            let _ = ui_tx.send(UiUpdate::Progress(Some(progress))).await;
        }
        RunEvent::PickDecided(decision) => {
            debug!(
                at = %decision.coord,
                player = decision.player_name.as_deref().unwrap_or("?"),
                "pick decided"
            );
        }
        RunEvent::DraftUpdated(draft) => {
            state.upsert_summary(draft.summary());
            // Follow the draft being run.
            if state.manager.running_draft_id().as_deref() == Some(draft.draft_id.as_str()) {
                state.select_draft(&draft.draft_id);
            }
            let _ = ui_tx.send(state.draft_list_update()).await;
            if state.selected_draft_id() == Some(draft.draft_id.as_str()) {
                let _ = ui_tx.send(UiUpdate::DraftDetail(draft)).await;
            }
        }
        RunEvent::DraftsListed(drafts) => {
            state.set_drafts(drafts);
            let _ = ui_tx.send(state.draft_list_update()).await;
        }
        RunEvent::Finished { draft_id, status } => {
            info!(
                draft_id = draft_id.as_deref().unwrap_or("-"),
                "run finished: {status}"
            );
            // A rejected attempt leaves another run's markers in place.
            let running = state.manager.running_draft_id();
            if running.is_none() {
                let _ = ui_tx.send(UiUpdate::Progress(None)).await;
            }
            let _ = ui_tx.send(UiUpdate::RunningDraft(running)).await;
            let _ = ui_tx.send(UiUpdate::Status(status.to_string())).await;
        }
    }
}

async fn handle_user_command<B: DraftBackend + ?Sized + 'static>(
    state: &mut AppState<B>,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match cmd {
        UserCommand::NewDraft => match state.check_idle() {
            Ok(()) => {
                info!("Starting a new draft");
                state.spawn_new_draft();
            }
            Err(e) => send_error(ui_tx, &e).await,
        },
        UserCommand::ResumeSelected => match state.check_idle() {
            Ok(()) => {
                // An empty id is rejected by the manager with its own status.
                let draft_id = state.selected_draft_id().unwrap_or_default().to_string();
                info!(draft_id, "Resuming draft");
                state.spawn_resume(draft_id);
            }
            Err(e) => send_error(ui_tx, &e).await,
        },
        UserCommand::StopDraft => {
            if !state.manager.stop_draft(None) {
                send_error(ui_tx, &DraftError::Precondition("No draft is running".into())).await;
            }
        }
        UserCommand::LoadPlayerPool => state.spawn_load_player_pool(),
        UserCommand::RefreshDrafts => state.spawn_refresh(),
        UserCommand::SelectNext | UserCommand::SelectPrev => {
            let delta = if cmd == UserCommand::SelectNext { 1 } else { -1 };
            if state.move_selection(delta) {
                let _ = ui_tx.send(state.draft_list_update()).await;
                if let Some(id) = state.selected_draft_id() {
                    state.spawn_fetch_detail(id.to_string());
                }
            }
        }
        UserCommand::Quit => {
            // Handled in the main loop
        }
    }
}

async fn send_error(ui_tx: &mpsc::Sender<UiUpdate>, err: &DraftError) {
    let _ = ui_tx
        .send(UiUpdate::Status(StatusMessage::error(err).to_string()))
        .await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
