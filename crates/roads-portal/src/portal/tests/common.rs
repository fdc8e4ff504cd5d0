use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::response::Response;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;

use crate::config::PortalConfig;
use crate::portal::{
    ApplicationKind, ApplicationSubmission, DocumentCategory, DocumentUpload, PortalService,
};
use crate::progress::ProgressSettings;
use crate::status::Language;
use crate::sync::{RemoteSink, RetryPolicy, SyncSettings};

/// Remote that fails a fixed number of pushes before accepting everything.
#[derive(Debug, Default)]
pub(super) struct CountingRemote {
    failures_left: AtomicU32,
    pushes: AtomicU32,
}

impl CountingRemote {
    pub(super) fn failing(times: u32) -> Self {
        Self {
            failures_left: AtomicU32::new(times),
            pushes: AtomicU32::new(0),
        }
    }

    pub(super) fn pushes(&self) -> u32 {
        self.pushes.load(Ordering::SeqCst)
    }
}

impl RemoteSink for CountingRemote {
    fn push(&self, _changes: u32) -> Result<(), String> {
        self.pushes.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            Err("remote unavailable".to_string())
        } else {
            Ok(())
        }
    }
}

pub(super) type TestPortal = PortalService<Arc<CountingRemote>>;

pub(super) fn config() -> PortalConfig {
    PortalConfig {
        language: Language::English,
        progress: ProgressSettings {
            tick: Duration::from_millis(100),
            min_step: 10,
            max_step: 25,
        },
        sync: SyncSettings {
            sync_delay: Duration::from_millis(500),
            failure_rate: 0.0,
            retry: RetryPolicy::Manual,
        },
        upload_max_bytes: 5_000_000,
        seed: Some(7),
    }
}

pub(super) fn portal_with(remote: Arc<CountingRemote>, config: &PortalConfig) -> TestPortal {
    PortalService::new(config, remote, StdRng::seed_from_u64(7))
}

pub(super) fn portal() -> (TestPortal, Arc<CountingRemote>) {
    let remote = Arc::new(CountingRemote::default());
    (portal_with(remote.clone(), &config()), remote)
}

/// Long enough for any progress timer and a few sync episodes to finish.
pub(super) async fn settle() {
    let config = config();
    tokio::time::sleep(config.progress.max_duration() * 2 + config.sync.sync_delay * 6).await;
}

pub(super) fn submission() -> ApplicationSubmission {
    ApplicationSubmission {
        kind: ApplicationKind::RoadOpeningPermit,
        applicant: "Devon Campbell".to_string(),
        location: "Constant Spring Road, St. Andrew".to_string(),
        fee: None,
    }
}

pub(super) fn upload(name: &str) -> DocumentUpload {
    DocumentUpload {
        name: name.to_string(),
        size_bytes: 250_000,
        content_type: None,
        category: DocumentCategory::SitePlan,
        application_id: None,
    }
}

pub(super) async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}
