//! Live re-filter session controller.
//!
//! Responsibilities:
//! - Coordinate the UI producer (filter-text changes) with the single
//!   consumer execution loop.
//! - Keep only the most recently queued snapshot: edits arriving before
//!   the loop wakes silently replace older ones, so at most one
//!   execution ever runs per burst of typing.
//! - Cancel the in-flight run (killing its subprocess) whenever a newer
//!   snapshot is queued.
//!
//! Does NOT handle:
//! - Interpreting results (the app state machine does, via actions).
//! - Spawning the subprocess itself (see `jq_filter::executor`).
//!
//! Invariants:
//! - One mutex guards the pending state; wake-ups go through a
//!   `Notify`, whose stored permit makes signals race-free.
//! - The loop fully tears down a cancelled run (process reaped, writer
//!   joined) before starting the next one, keeping the pane
//!   single-writer.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tracing::debug;

use jq_filter::{CancellationToken, Destination, Document, FilterError, FilterExecutor};

use crate::action::Action;

/// Edits arriving within this window of each other collapse into one
/// execution.
const DEBOUNCE_WINDOW: Duration = Duration::from_millis(5);

/// Everything one execution needs, captured at queue time. The
/// document is a value snapshot; later edits never mutate it.
#[derive(Debug, Clone)]
pub struct FilterSnapshot {
    pub document: Document,
    pub filter: String,
}

#[derive(Default)]
struct PendingFilterState {
    /// Latest snapshot; replaces, never queues behind, older ones.
    snapshot: Option<FilterSnapshot>,
    pending: bool,
    /// Cancellation handle of the in-flight run, if any.
    inflight: Option<CancellationToken>,
    shutdown: bool,
}

struct Shared {
    state: Mutex<PendingFilterState>,
    wake: Notify,
}

/// Handle shared between the UI loop and the execution loop.
#[derive(Clone)]
pub struct SessionController {
    shared: Arc<Shared>,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionController {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(PendingFilterState::default()),
                wake: Notify::new(),
            }),
        }
    }

    /// Queue `snapshot` as the next (and only) pending work item,
    /// cancelling any run already in flight.
    pub fn queue(&self, snapshot: FilterSnapshot) {
        {
            let mut state = lock(&self.shared.state);
            if let Some(token) = state.inflight.take() {
                token.cancel();
            }
            state.snapshot = Some(snapshot);
            state.pending = true;
        }
        self.shared.wake.notify_one();
    }

    /// Stop the execution loop after any current run winds down.
    pub fn shutdown(&self) {
        {
            let mut state = lock(&self.shared.state);
            state.shutdown = true;
            if let Some(token) = state.inflight.take() {
                token.cancel();
            }
        }
        self.shared.wake.notify_one();
    }

    /// Spawn the long-lived execution loop writing into `destination`.
    ///
    /// Completions are reported as [`Action::FilterFinished`];
    /// cancelled (superseded) runs are discarded here and never reach
    /// the channel.
    pub fn spawn_loop<D>(
        &self,
        executor: Arc<FilterExecutor>,
        mut destination: D,
        tx: Sender<Action>,
    ) -> JoinHandle<()>
    where
        D: Destination + 'static,
    {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            loop {
                let (snapshot, token) = loop {
                    let has_pending = {
                        let state = lock(&shared.state);
                        if state.shutdown {
                            return;
                        }
                        state.pending
                    };
                    if !has_pending {
                        shared.wake.notified().await;
                        continue;
                    }

                    // Quiet window so a burst of keystrokes becomes a
                    // single subprocess spawn.
                    tokio::time::sleep(DEBOUNCE_WINDOW).await;

                    let mut state = lock(&shared.state);
                    if state.shutdown {
                        return;
                    }
                    if let Some(snapshot) = state.snapshot.take() {
                        state.pending = false;
                        let token = CancellationToken::new();
                        state.inflight = Some(token.clone());
                        break (snapshot, token);
                    }
                };

                // Best effort; a dropped start notification only costs
                // a cosmetic state label.
                let _ = tx.try_send(Action::FilterStarted);

                let result = run_snapshot(&executor, &snapshot, &mut destination, &token).await;

                lock(&shared.state).inflight = None;

                match result {
                    Err(FilterError::Cancelled) => {
                        debug!(filter = %snapshot.filter, "superseded run discarded");
                    }
                    other => {
                        if tx.send(Action::FilterFinished(other)).await.is_err() {
                            return;
                        }
                    }
                }
            }
        })
    }
}

async fn run_snapshot<D: Destination>(
    executor: &FilterExecutor,
    snapshot: &FilterSnapshot,
    destination: &mut D,
    token: &CancellationToken,
) -> Result<u64, FilterError> {
    executor
        .run(&snapshot.document, &snapshot.filter, destination, token)
        .await
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
