//! Handles for background work scheduled by setters.
//!
//! Dropping a handle detaches the task; it still runs to completion.

use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::{ControllerError, ControllerResult};
use crate::sync::SyncOutcome;

/// Account impersonation scheduled after a fork or account change.
#[derive(Debug)]
#[must_use = "dropping the handle detaches the impersonation task"]
pub struct PendingImpersonation(JoinHandle<()>);

impl PendingImpersonation {
    pub(crate) const fn new(handle: JoinHandle<()>) -> Self {
        Self(handle)
    }

    /// Wait for the impersonation attempt to finish. Its failures are
    /// already logged.
    pub async fn wait(self) {
        if let Err(err) = self.0.await {
            warn!(error = %err, "impersonation task did not complete");
        }
    }
}

/// Resynchronization scheduled after a base URL change.
#[derive(Debug)]
#[must_use = "dropping the handle detaches the sync task"]
pub struct PendingSync(JoinHandle<ControllerResult<SyncOutcome>>);

impl PendingSync {
    pub(crate) const fn new(handle: JoinHandle<ControllerResult<SyncOutcome>>) -> Self {
        Self(handle)
    }

    /// Wait for the sync and return its outcome.
    pub async fn wait(self) -> ControllerResult<SyncOutcome> {
        self.0
            .await
            .map_err(|err| ControllerError::SyncAborted(err.to_string()))?
    }
}
