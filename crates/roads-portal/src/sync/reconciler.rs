use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, info, warn};

use super::state::{SyncAction, SyncError, SyncState};
use crate::progress::TimerSlot;

/// How a failed sync is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Stay in `error` until someone calls `retry`.
    Manual,
    /// Retry automatically with exponential delay, then fall back to manual.
    Backoff {
        max_attempts: u32,
        base_delay: Duration,
    },
}

impl RetryPolicy {
    /// Delay before the automatic retry following `failed_attempts` consecutive failures.
    pub fn next_delay(&self, failed_attempts: u32) -> Option<Duration> {
        match *self {
            RetryPolicy::Manual => None,
            RetryPolicy::Backoff {
                max_attempts,
                base_delay,
            } => {
                if failed_attempts == 0 || failed_attempts > max_attempts {
                    return None;
                }
                let exponent = (failed_attempts - 1).min(16);
                Some(base_delay.saturating_mul(1u32 << exponent))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncSettings {
    /// Simulated round-trip of one sync episode.
    pub sync_delay: Duration,
    /// Probability in `0.0..=1.0` that a simulated episode fails.
    pub failure_rate: f64,
    pub retry: RetryPolicy,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            sync_delay: Duration::from_millis(1_500),
            failure_rate: 0.10,
            retry: RetryPolicy::Manual,
        }
    }
}

/// Remote side of a sync episode.
pub trait RemoteSink: Send + Sync + 'static {
    fn push(&self, changes: u32) -> Result<(), String>;
}

impl<T: RemoteSink + ?Sized> RemoteSink for Arc<T> {
    fn push(&self, changes: u32) -> Result<(), String> {
        (**self).push(changes)
    }
}

/// Stand-in remote that fails at a configured rate.
#[derive(Debug)]
pub struct SimulatedRemote {
    failure_rate: f64,
    rng: Mutex<StdRng>,
}

impl SimulatedRemote {
    pub fn new(failure_rate: f64, rng: StdRng) -> Self {
        Self {
            failure_rate: failure_rate.clamp(0.0, 1.0),
            rng: Mutex::new(rng),
        }
    }
}

impl RemoteSink for SimulatedRemote {
    fn push(&self, changes: u32) -> Result<(), String> {
        let mut rng = self.rng.lock().expect("remote rng mutex poisoned");
        if rng.gen_bool(self.failure_rate) {
            Err(format!("remote rejected batch of {changes} change(s)"))
        } else {
            Ok(())
        }
    }
}

struct Inner<R> {
    state: Mutex<SyncState>,
    timer: Mutex<TimerSlot>,
    disposed: AtomicBool,
    remote: R,
    settings: SyncSettings,
}

/// Drives a [`SyncState`] with a single cancellable sync task.
///
/// Event methods spawn onto the current tokio runtime. After `dispose` (or drop) every event is
/// ignored and no task mutates the state again.
pub struct SyncReconciler<R: RemoteSink> {
    inner: Arc<Inner<R>>,
}

impl<R: RemoteSink> SyncReconciler<R> {
    pub fn new(remote: R, settings: SyncSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SyncState::default()),
                timer: Mutex::new(TimerSlot::default()),
                disposed: AtomicBool::new(false),
                remote,
                settings,
            }),
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.inner.settings
    }

    pub fn snapshot(&self) -> SyncState {
        self.inner
            .state
            .lock()
            .expect("sync state mutex poisoned")
            .clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    pub fn record_change(&self) -> Result<SyncState, SyncError> {
        self.apply(|state| Ok(state.record_change()))
    }

    pub fn set_online(&self, online: bool) -> Result<SyncState, SyncError> {
        info!(online, "connectivity changed");
        self.apply(|state| Ok(state.set_online(online)))
    }

    pub fn retry(&self) -> Result<SyncState, SyncError> {
        self.apply(SyncState::retry)
    }

    /// Whether a sync or backoff task is currently scheduled.
    pub fn has_active_task(&self) -> bool {
        self.inner
            .timer
            .lock()
            .expect("sync timer mutex poisoned")
            .is_active()
    }

    pub fn dispose(&self) {
        {
            let _state = self.inner.state.lock().expect("sync state mutex poisoned");
            self.inner.disposed.store(true, Ordering::Release);
            self.inner
                .timer
                .lock()
                .expect("sync timer mutex poisoned")
                .cancel();
        }
        debug!("sync reconciler disposed");
    }

    /// Applies `event` and its timer action under one state lock.
    fn apply<F>(&self, event: F) -> Result<SyncState, SyncError>
    where
        F: FnOnce(&mut SyncState) -> Result<SyncAction, SyncError>,
    {
        let mut state = self.inner.state.lock().expect("sync state mutex poisoned");
        if self.inner.disposed.load(Ordering::Acquire) {
            return Err(SyncError::Disposed);
        }
        let action = event(&mut state)?;

        let mut timer = self.inner.timer.lock().expect("sync timer mutex poisoned");
        match action {
            SyncAction::StartSync { episode } => {
                debug!(episode, pending = state.pending_changes(), "sync started");
                timer.replace(tokio::spawn(run_episodes(self.inner.clone(), episode)));
            }
            SyncAction::CancelSync => {
                debug!("sync cancelled");
                timer.cancel();
            }
            SyncAction::None => {}
        }

        Ok(state.clone())
    }
}

impl<R: RemoteSink> Drop for SyncReconciler<R> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Runs `episode` and any follow-up episodes or automatic retries it leads to.
async fn run_episodes<R: RemoteSink>(inner: Arc<Inner<R>>, mut episode: u64) {
    loop {
        tokio::time::sleep(inner.settings.sync_delay).await;

        let changes = {
            let state = inner.state.lock().expect("sync state mutex poisoned");
            if !state.is_running(episode) {
                return;
            }
            state.in_flight()
        };
        let outcome = inner.remote.push(changes);

        let (action, failed_attempts) = {
            let mut state = inner.state.lock().expect("sync state mutex poisoned");
            if inner.disposed.load(Ordering::Acquire) || !state.is_running(episode) {
                return;
            }
            let action = state.complete(episode, outcome.clone());
            (action, state.failed_attempts())
        };

        match (&outcome, action) {
            (_, SyncAction::StartSync { episode: next }) => {
                debug!(episode = next, "follow-up sync started");
                episode = next;
            }
            (Ok(()), _) => {
                info!(episode, changes, "sync completed");
                return;
            }
            (Err(message), _) => {
                warn!(episode, %message, failed_attempts, "sync failed");
                let Some(delay) = inner.settings.retry.next_delay(failed_attempts) else {
                    return;
                };

                tokio::time::sleep(delay).await;
                let mut state = inner.state.lock().expect("sync state mutex poisoned");
                if inner.disposed.load(Ordering::Acquire) {
                    return;
                }
                match state.resume() {
                    SyncAction::StartSync { episode: next } => {
                        info!(episode = next, attempt = failed_attempts + 1, "retrying sync");
                        episode = next;
                    }
                    _ => return,
                }
            }
        }
    }
}
