//! Reconciliation with the fork server.

use std::sync::atomic::{AtomicU64, Ordering};

use neptune_core::Fork;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::controller::NeptuneController;
use crate::error::ControllerResult;

/// What a sync run changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "fork", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The active fork was already listed by the server.
    Unchanged,
    /// The server had no forks; a fork of the upstream head was created and selected.
    Created(Fork),
    /// The active fork was missing; the first listed fork was selected.
    Selected(Fork),
    /// The server had no forks and no provider is configured.
    NoForkAvailable,
}

/// Serializes sync runs and coalesces requests that pile up behind one.
///
/// Every request takes a ticket. A run covers every ticket issued before it
/// started, so callers that waited behind a run share the single follow-up.
#[derive(Debug, Default)]
pub(crate) struct SyncGate {
    tickets: AtomicU64,
    last_run: Mutex<LastRun>,
}

#[derive(Debug, Default)]
struct LastRun {
    covered: u64,
    outcome: Option<ControllerResult<SyncOutcome>>,
}

impl NeptuneController {
    /// Reconcile local state with the fork server.
    ///
    /// Selects the first available fork when the active one is gone, forks
    /// the upstream head when the server has none (and a provider is set),
    /// then impersonates all accounts. Listing or fork creation failures
    /// abort the run and leave state unchanged.
    pub async fn sync(&self) -> ControllerResult<SyncOutcome> {
        let ticket = self.sync_gate.tickets.fetch_add(1, Ordering::SeqCst) + 1;
        let mut last_run = self.sync_gate.last_run.lock().await;
        if last_run.covered >= ticket
            && let Some(outcome) = &last_run.outcome
        {
            debug!(ticket, "sync request served by a concurrent run");
            return outcome.clone();
        }

        let covered = self.sync_gate.tickets.load(Ordering::SeqCst);
        let outcome = self.run_sync().await;
        *last_run = LastRun {
            covered,
            outcome: Some(outcome.clone()),
        };
        outcome
    }

    async fn run_sync(&self) -> ControllerResult<SyncOutcome> {
        let (base_url, current, provider_rpc_url) = self.sync_inputs();
        let available = self.gateway().available_forks(&base_url).await?;

        let none_available = available.is_empty();
        let should_select_from_available = !none_available
            && current
                .as_ref()
                .is_none_or(|current| !available.iter().any(|fork| fork.id == current.id));

        let outcome = if none_available {
            if let Some(provider_rpc_url) = provider_rpc_url {
                let fork = self
                    .gateway()
                    .fork_mainnet_latest(&base_url, &provider_rpc_url)
                    .await?;
                info!(fork = %fork.id, name = %fork.name, "no forks available, created one");
                drop(self.set_fork(Some(fork.clone())));
                SyncOutcome::Created(fork)
            } else {
                info!(%base_url, "no forks available and no provider rpc url configured");
                SyncOutcome::NoForkAvailable
            }
        } else if should_select_from_available {
            let fork = available[0].clone();
            info!(fork = %fork.id, "active fork not found on server, selecting first available");
            drop(self.set_fork(Some(fork.clone())));
            SyncOutcome::Selected(fork)
        } else {
            debug!(available = available.len(), "active fork present on server");
            SyncOutcome::Unchanged
        };

        self.impersonate_accounts().await;
        Ok(outcome)
    }
}
