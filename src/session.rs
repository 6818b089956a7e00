//! Staleness control for in-flight loads.
//!
//! Every logical query (window, metric, overlay) owns one latest-wins
//! result slot. Each load starts by taking a generation token; a result may
//! only be committed while its token is still the newest one issued, so a
//! slow response for a superseded request can never overwrite current
//! state. There is no network-level cancellation; dropping the result on
//! arrival is sufficient.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::Result;

/// Token identifying one issued load attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

struct SlotState<T> {
    issued: u64,
    value: Option<T>,
}

/// Latest-wins result slot guarded by a generation counter
pub struct QuerySlot<T> {
    state: Mutex<SlotState<T>>,
}

impl<T> QuerySlot<T> {
    pub fn new() -> Self {
        QuerySlot {
            state: Mutex::new(SlotState {
                issued: 0,
                value: None,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SlotState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a new load attempt, superseding all earlier ones
    pub fn begin(&self) -> Generation {
        let mut state = self.lock();
        state.issued += 1;
        Generation(state.issued)
    }

    /// Commit a load result; returns false (and drops the value) when a
    /// newer attempt has been issued since `generation` was taken
    pub fn commit(&self, generation: Generation, value: T) -> bool {
        let mut state = self.lock();
        if generation.0 != state.issued {
            return false;
        }
        state.value = Some(value);
        true
    }

    /// Last committed value; failed or stale loads never clear it
    pub fn latest(&self) -> Option<T>
    where
        T: Clone,
    {
        self.lock().value.clone()
    }
}

impl<T> Default for QuerySlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodic re-load of one query with explicit stop-on-deactivation
pub struct Poller {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Poller {
    /// Run `load` on a fixed interval, committing each successful result
    /// into `slot` under the staleness-discard rule. The first tick fires
    /// immediately.
    pub fn spawn<T, F, Fut>(interval: Duration, slot: Arc<QuerySlot<T>>, load: F) -> Poller
    where
        T: Send + 'static,
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let generation = slot.begin();
                        match load().await {
                            Ok(value) => {
                                if !slot.commit(generation, value) {
                                    tracing::debug!("stale poll result dropped");
                                }
                            }
                            Err(err) => {
                                // Last-good value stays in place
                                tracing::warn!(error = %err, "poll tick failed");
                            }
                        }
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        Poller { stop_tx, handle }
    }

    /// Stop polling and wait for the task to wind down
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.handle.await;
    }
}
