use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::normalize_key;

/// Reconciliation state shown to field agents working with intermittent connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    Synced,
    Syncing,
    Pending,
    Error,
}

impl SyncStatus {
    pub const fn ordered() -> [Self; 4] {
        [Self::Synced, Self::Syncing, Self::Pending, Self::Error]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::Syncing => "syncing",
            Self::Pending => "pending",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sync status '{0}'")]
pub struct UnknownSyncStatus(pub String);

impl FromStr for SyncStatus {
    type Err = UnknownSyncStatus;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match normalize_key(raw).as_str() {
            "synced" => Ok(Self::Synced),
            "syncing" => Ok(Self::Syncing),
            "pending" | "offline" => Ok(Self::Pending),
            "error" | "failed" => Ok(Self::Error),
            _ => Err(UnknownSyncStatus(raw.to_string())),
        }
    }
}

/// Follow-up the driver must perform after a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    None,
    /// A sync episode began; run it and report back with this episode number.
    StartSync { episode: u64 },
    /// The running episode was abandoned.
    CancelSync,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("retry is only available after a failed sync (current status '{0}')")]
    NotInError(SyncStatus),
    #[error("sync reconciler has been disposed")]
    Disposed,
}

/// Connectivity, queued changes, and the reconciliation status derived from them.
///
/// Invariants: `pending_changes > 0` implies the status is not `synced`, and `synced` always has
/// an empty queue. Changes recorded while a sync is running are kept for a follow-up episode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncState {
    status: SyncStatus,
    online: bool,
    pending_changes: u32,
    in_flight: u32,
    episode: u64,
    failed_attempts: u32,
    last_sync_time: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            status: SyncStatus::Synced,
            online: true,
            pending_changes: 0,
            in_flight: 0,
            episode: 0,
            failed_attempts: 0,
            last_sync_time: None,
            last_error: None,
        }
    }
}

impl SyncState {
    pub fn status(&self) -> SyncStatus {
        self.status
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn pending_changes(&self) -> u32 {
        self.pending_changes
    }

    /// Changes captured by the episode currently running.
    pub fn in_flight(&self) -> u32 {
        self.in_flight
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    pub fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.last_sync_time
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whether `episode` is the sync currently running.
    pub fn is_running(&self, episode: u64) -> bool {
        self.status == SyncStatus::Syncing && self.episode == episode
    }

    pub fn invariant_holds(&self) -> bool {
        match self.status {
            SyncStatus::Synced => self.pending_changes == 0,
            SyncStatus::Syncing | SyncStatus::Pending | SyncStatus::Error => true,
        }
    }

    pub fn record_change(&mut self) -> SyncAction {
        self.pending_changes = self.pending_changes.saturating_add(1);
        match self.status {
            SyncStatus::Syncing | SyncStatus::Error => SyncAction::None,
            SyncStatus::Synced | SyncStatus::Pending if self.online => self.begin(),
            SyncStatus::Synced | SyncStatus::Pending => {
                self.status = SyncStatus::Pending;
                SyncAction::None
            }
        }
    }

    pub fn set_online(&mut self, online: bool) -> SyncAction {
        let was_online = self.online;
        self.online = online;

        if !online {
            let was_syncing = self.status == SyncStatus::Syncing;
            self.in_flight = 0;
            self.status = SyncStatus::Pending;
            return if was_syncing {
                SyncAction::CancelSync
            } else {
                SyncAction::None
            };
        }

        match self.status {
            SyncStatus::Syncing => SyncAction::None,
            SyncStatus::Error if was_online => SyncAction::None,
            SyncStatus::Synced if was_online => SyncAction::None,
            _ if self.pending_changes > 0 => self.begin(),
            _ => {
                self.mark_synced();
                SyncAction::None
            }
        }
    }

    /// Manual retry after a failure. Resets the automatic retry budget.
    pub fn retry(&mut self) -> Result<SyncAction, SyncError> {
        if self.status != SyncStatus::Error {
            return Err(SyncError::NotInError(self.status));
        }
        self.failed_attempts = 0;
        Ok(self.resume())
    }

    /// Restarts a failed sync without touching the attempt counter.
    pub(crate) fn resume(&mut self) -> SyncAction {
        if self.status != SyncStatus::Error {
            return SyncAction::None;
        }
        if !self.online {
            self.status = SyncStatus::Pending;
            return SyncAction::None;
        }
        if self.pending_changes == 0 {
            self.mark_synced();
            return SyncAction::None;
        }
        self.begin()
    }

    /// Applies the result of `episode`. Results from superseded episodes are ignored.
    pub fn complete(&mut self, episode: u64, outcome: Result<(), String>) -> SyncAction {
        if !self.is_running(episode) {
            return SyncAction::None;
        }

        match outcome {
            Ok(()) => {
                self.pending_changes = self.pending_changes.saturating_sub(self.in_flight);
                self.in_flight = 0;
                self.failed_attempts = 0;
                self.last_error = None;
                if self.pending_changes == 0 {
                    self.mark_synced();
                    SyncAction::None
                } else {
                    self.begin()
                }
            }
            Err(message) => {
                self.in_flight = 0;
                self.failed_attempts = self.failed_attempts.saturating_add(1);
                self.last_error = Some(message);
                self.status = SyncStatus::Error;
                SyncAction::None
            }
        }
    }

    fn begin(&mut self) -> SyncAction {
        self.episode += 1;
        self.in_flight = self.pending_changes;
        self.status = SyncStatus::Syncing;
        SyncAction::StartSync {
            episode: self.episode,
        }
    }

    fn mark_synced(&mut self) {
        self.status = SyncStatus::Synced;
        self.pending_changes = 0;
        self.in_flight = 0;
        self.last_sync_time = Some(Utc::now());
    }
}
