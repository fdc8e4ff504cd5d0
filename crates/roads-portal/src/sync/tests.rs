use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::*;

const DELAY: Duration = Duration::from_millis(1_000);

#[derive(Default)]
struct ScriptedRemote {
    outcomes: Mutex<VecDeque<Result<(), String>>>,
    pushes: AtomicU32,
    changes: Mutex<Vec<u32>>,
}

impl ScriptedRemote {
    fn with(outcomes: Vec<Result<(), String>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            ..Self::default()
        })
    }

    fn failing() -> Arc<Self> {
        Self::with((0..16).map(|i| Err(format!("timeout #{i}"))).collect())
    }

    fn pushes(&self) -> u32 {
        self.pushes.load(Ordering::SeqCst)
    }

    fn batches(&self) -> Vec<u32> {
        self.changes.lock().expect("changes mutex").clone()
    }
}

impl RemoteSink for ScriptedRemote {
    fn push(&self, changes: u32) -> Result<(), String> {
        self.pushes.fetch_add(1, Ordering::SeqCst);
        self.changes.lock().expect("changes mutex").push(changes);
        self.outcomes
            .lock()
            .expect("outcomes mutex")
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

fn settings(retry: RetryPolicy) -> SyncSettings {
    SyncSettings {
        sync_delay: DELAY,
        failure_rate: 0.0,
        retry,
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_secs(60)).await;
}

#[tokio::test(start_paused = true)]
async fn reconnect_flushes_offline_queue_after_delay() {
    let remote = ScriptedRemote::with(Vec::new());
    let reconciler = SyncReconciler::new(remote.clone(), settings(RetryPolicy::Manual));

    reconciler.set_online(false).expect("offline");
    reconciler.record_change().expect("change 1");
    let state = reconciler.record_change().expect("change 2");
    assert_eq!(state.status(), SyncStatus::Pending);
    assert_eq!(state.pending_changes(), 2);

    let state = reconciler.set_online(true).expect("online");
    assert_eq!(state.status(), SyncStatus::Syncing);

    tokio::time::sleep(DELAY / 2).await;
    assert_eq!(reconciler.snapshot().status(), SyncStatus::Syncing);
    assert_eq!(remote.pushes(), 0);

    settle().await;
    let state = reconciler.snapshot();
    assert_eq!(state.status(), SyncStatus::Synced);
    assert_eq!(state.pending_changes(), 0);
    assert!(state.last_sync_time().is_some());
    assert_eq!(remote.batches(), vec![2]);
    assert!(!reconciler.has_active_task());
}

#[tokio::test(start_paused = true)]
async fn manual_policy_waits_for_retry() {
    let remote = ScriptedRemote::with(vec![Err("gateway timeout".to_string())]);
    let reconciler = SyncReconciler::new(remote.clone(), settings(RetryPolicy::Manual));

    reconciler.record_change().expect("change");
    settle().await;

    let state = reconciler.snapshot();
    assert_eq!(state.status(), SyncStatus::Error);
    assert_eq!(state.pending_changes(), 1);
    assert_eq!(state.last_error(), Some("gateway timeout"));
    assert_eq!(remote.pushes(), 1);
    assert!(!reconciler.has_active_task());

    let state = reconciler.retry().expect("retry from error");
    assert_eq!(state.status(), SyncStatus::Syncing);
    settle().await;
    assert_eq!(reconciler.snapshot().status(), SyncStatus::Synced);
    assert_eq!(remote.pushes(), 2);
}

#[tokio::test(start_paused = true)]
async fn retry_is_refused_when_not_in_error() {
    let reconciler = SyncReconciler::new(
        ScriptedRemote::with(Vec::new()),
        settings(RetryPolicy::Manual),
    );
    assert_eq!(
        reconciler.retry().expect_err("nothing to retry"),
        SyncError::NotInError(SyncStatus::Synced)
    );
}

#[tokio::test(start_paused = true)]
async fn backoff_policy_gives_up_after_max_attempts() {
    let remote = ScriptedRemote::failing();
    let reconciler = SyncReconciler::new(
        remote.clone(),
        settings(RetryPolicy::Backoff {
            max_attempts: 2,
            base_delay: Duration::from_millis(100),
        }),
    );

    reconciler.record_change().expect("change");
    settle().await;

    let state = reconciler.snapshot();
    assert_eq!(state.status(), SyncStatus::Error);
    assert_eq!(state.failed_attempts(), 3);
    assert_eq!(remote.pushes(), 3);
    assert!(!reconciler.has_active_task());
}

#[tokio::test(start_paused = true)]
async fn backoff_policy_recovers_on_later_attempt() {
    let remote = ScriptedRemote::with(vec![Err("flaky".to_string())]);
    let reconciler = SyncReconciler::new(
        remote.clone(),
        settings(RetryPolicy::Backoff {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
        }),
    );

    reconciler.record_change().expect("change");
    settle().await;

    let state = reconciler.snapshot();
    assert_eq!(state.status(), SyncStatus::Synced);
    assert_eq!(state.failed_attempts(), 0);
    assert_eq!(remote.pushes(), 2);
}

#[tokio::test(start_paused = true)]
async fn going_offline_cancels_running_sync() {
    let remote = ScriptedRemote::with(Vec::new());
    let reconciler = SyncReconciler::new(remote.clone(), settings(RetryPolicy::Manual));

    reconciler.record_change().expect("change");
    tokio::time::sleep(DELAY / 2).await;
    let state = reconciler.set_online(false).expect("offline");
    assert_eq!(state.status(), SyncStatus::Pending);

    settle().await;
    let state = reconciler.snapshot();
    assert_eq!(state.status(), SyncStatus::Pending);
    assert_eq!(state.pending_changes(), 1);
    assert_eq!(remote.pushes(), 0);
}

#[tokio::test(start_paused = true)]
async fn changes_recorded_mid_sync_are_sent_in_follow_up() {
    let remote = ScriptedRemote::with(Vec::new());
    let reconciler = SyncReconciler::new(remote.clone(), settings(RetryPolicy::Manual));

    reconciler.record_change().expect("first");
    tokio::time::sleep(DELAY / 2).await;
    reconciler.record_change().expect("second");
    reconciler.record_change().expect("third");

    settle().await;
    assert_eq!(reconciler.snapshot().status(), SyncStatus::Synced);
    assert_eq!(remote.batches(), vec![1, 2]);
}

#[tokio::test(start_paused = true)]
async fn dispose_freezes_state() {
    let remote = ScriptedRemote::with(Vec::new());
    let reconciler = SyncReconciler::new(remote.clone(), settings(RetryPolicy::Manual));

    reconciler.record_change().expect("change");
    let before = reconciler.snapshot();
    reconciler.dispose();

    settle().await;
    assert_eq!(reconciler.snapshot(), before);
    assert_eq!(remote.pushes(), 0);
    assert!(reconciler.is_disposed());
    assert_eq!(
        reconciler.record_change().expect_err("disposed"),
        SyncError::Disposed
    );
}

#[tokio::test(start_paused = true)]
async fn dropping_reconciler_cancels_task() {
    let remote = ScriptedRemote::with(Vec::new());
    {
        let reconciler = SyncReconciler::new(remote.clone(), settings(RetryPolicy::Manual));
        reconciler.record_change().expect("change");
    }
    settle().await;
    assert_eq!(remote.pushes(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_connectivity_flaps_never_strand_a_sync() {
    let remote = ScriptedRemote::with(Vec::new());
    let reconciler = Arc::new(SyncReconciler::new(
        remote.clone(),
        SyncSettings {
            sync_delay: Duration::from_millis(2),
            ..settings(RetryPolicy::Manual)
        },
    ));
    reconciler.record_change().expect("change");

    let togglers: Vec<_> = (0..4)
        .map(|worker| {
            let reconciler = reconciler.clone();
            tokio::spawn(async move {
                for round in 0..200 {
                    reconciler
                        .set_online((round + worker) % 2 == 0)
                        .expect("connectivity");
                    if round % 7 == 0 {
                        reconciler.record_change().expect("change");
                    }
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();
    for toggler in togglers {
        toggler.await.expect("toggler finished");
    }

    reconciler.set_online(true).expect("online");
    for _ in 0..200 {
        if reconciler.snapshot().status() == SyncStatus::Synced {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let state = reconciler.snapshot();
    assert_eq!(state.status(), SyncStatus::Synced);
    assert_eq!(state.pending_changes(), 0);
}

#[tokio::test(start_paused = true)]
async fn simulated_remote_honours_failure_rate() {
    let always = SimulatedRemote::new(1.0, StdRng::seed_from_u64(7));
    let never = SimulatedRemote::new(0.0, StdRng::seed_from_u64(7));
    for _ in 0..10 {
        assert!(always.push(1).is_err());
        assert!(never.push(1).is_ok());
    }
}

#[test]
fn backoff_delay_doubles_until_budget_is_spent() {
    let policy = RetryPolicy::Backoff {
        max_attempts: 3,
        base_delay: Duration::from_millis(100),
    };
    assert_eq!(policy.next_delay(0), None);
    assert_eq!(policy.next_delay(1), Some(Duration::from_millis(100)));
    assert_eq!(policy.next_delay(2), Some(Duration::from_millis(200)));
    assert_eq!(policy.next_delay(3), Some(Duration::from_millis(400)));
    assert_eq!(policy.next_delay(4), None);
    assert_eq!(RetryPolicy::Manual.next_delay(1), None);
}
