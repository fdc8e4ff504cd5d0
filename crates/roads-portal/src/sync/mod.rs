//! Connectivity tracking and simulated reconciliation of offline changes.

mod reconciler;
mod state;

pub use reconciler::{RemoteSink, RetryPolicy, SimulatedRemote, SyncReconciler, SyncSettings};
pub use state::{SyncAction, SyncError, SyncState, SyncStatus, UnknownSyncStatus};

#[cfg(test)]
mod tests;
