// Interval polling and pick-completion waiting.
//
// `poll_until` is the reusable sleep-then-check loop; `wait_for_pick_completion`
// applies it to the backend's pick-status query.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::backend::{DraftBackend, PickStatus};
use crate::draft::model::PickCoord;
use crate::error::DraftError;

/// Default number of status checks before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 120;

/// Default delay before each status check.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Transport failures inside this many final attempts are propagated
/// instead of retried.
pub const FINAL_ATTEMPTS_WINDOW: u32 = 5;

/// Polling budget. `max_attempts × interval` bounds the total wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        PollPolicy {
            max_attempts,
            interval,
        }
    }

    /// Upper bound on time spent polling.
    pub fn ceiling(&self) -> Duration {
        self.interval * self.max_attempts
    }

    /// Whether 1-based `attempt` is one of the last `FINAL_ATTEMPTS_WINDOW`.
    pub fn in_final_window(&self, attempt: u32) -> bool {
        attempt + FINAL_ATTEMPTS_WINDOW > self.max_attempts
    }
}

/// Result of one check inside `poll_until`.
#[derive(Debug)]
pub enum PollStep<T, E> {
    Ready(T),
    Failed(E),
    Pending,
}

#[derive(Debug, PartialEq)]
pub enum PollError<E> {
    /// A check reported a terminal failure.
    Failed(E),
    /// Every attempt came back pending.
    Exhausted { attempts: u32, elapsed: Duration },
}

/// Sleep `policy.interval`, run `check(attempt)`, repeat until it is
/// terminal or `policy.max_attempts` checks have been made.
pub async fn poll_until<T, E, F, Fut>(policy: PollPolicy, mut check: F) -> Result<T, PollError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = PollStep<T, E>>,
{
    let started = Instant::now();
    for attempt in 1..=policy.max_attempts {
        tokio::time::sleep(policy.interval).await;
        match check(attempt).await {
            PollStep::Ready(value) => return Ok(value),
            PollStep::Failed(err) => return Err(PollError::Failed(err)),
            PollStep::Pending => {}
        }
    }
    Err(PollError::Exhausted {
        attempts: policy.max_attempts,
        elapsed: started.elapsed(),
    })
}

/// Decided selection for one pick.
#[derive(Debug, Clone, PartialEq)]
pub struct PickDecision {
    pub coord: PickCoord,
    pub player_name: Option<String>,
    pub rationale: Option<String>,
}

/// Poll the backend until the pick at `coord` completes.
///
/// A backend-reported error fails immediately. A transport failure is
/// retried like `processing` unless it happens within the final
/// `FINAL_ATTEMPTS_WINDOW` attempts, where it is returned. Running out of
/// attempts yields `PickTimeout`.
pub async fn wait_for_pick_completion<B>(
    backend: &B,
    draft_id: &str,
    coord: PickCoord,
    policy: PollPolicy,
) -> Result<PickDecision, DraftError>
where
    B: DraftBackend + ?Sized,
{
    let result = poll_until(policy, |attempt| async move {
        match backend.pick_status(draft_id, coord.round, coord.pick).await {
            Ok(PickStatus::Completed { player_name, reason }) => PollStep::Ready(PickDecision {
                coord,
                player_name,
                rationale: reason,
            }),
            Ok(status @ PickStatus::Error { .. }) => PollStep::Failed(DraftError::PickFailed {
                round: coord.round,
                pick: coord.pick,
                reason: status.error_reason().unwrap_or_default(),
            }),
            Ok(status) => {
                debug!(round = coord.round, pick = coord.pick, attempt, ?status, "pick pending");
                PollStep::Pending
            }
            Err(err) if policy.in_final_window(attempt) => {
                warn!(round = coord.round, pick = coord.pick, attempt, "status check failed near deadline: {err}");
                PollStep::Failed(DraftError::transport(coord, err))
            }
            Err(err) => {
                warn!(round = coord.round, pick = coord.pick, attempt, "status check failed, retrying: {err}");
                PollStep::Pending
            }
        }
    })
    .await;

    match result {
        Ok(decision) => {
            info!(
                round = coord.round,
                pick = coord.pick,
                player = decision.player_name.as_deref().unwrap_or("?"),
                "pick completed"
            );
            Ok(decision)
        }
        Err(PollError::Failed(err)) => Err(err),
        Err(PollError::Exhausted { attempts, elapsed }) => {
            warn!(round = coord.round, pick = coord.pick, attempts, ?elapsed, "pick timed out");
            Err(DraftError::PickTimeout {
                round: coord.round,
                pick: coord.pick,
                attempts,
                elapsed,
            })
        }
    }
}
