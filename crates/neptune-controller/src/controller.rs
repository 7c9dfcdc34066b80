//! The controller: single owner of canonical state.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};

use neptune_bus::MessageBus;
use neptune_bus::channels::{Accounts, ActiveFork, BaseUrl, Chain, Connection, ForkRpcUrl, ProviderRpcUrl};
use neptune_core::endpoints::{fork_rpc_url, origin};
use neptune_core::{Account, ChainId, ConnectionChange, Fork, RpcPayload, Snapshot, TabId, Url, default_accounts};
use neptune_gateway::{ForkGateway, impersonate_all_logged};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{ControllerConfig, parse_base_url};
use crate::error::{ControllerError, ControllerResult};
use crate::rpc::RpcForwarder;
use crate::store::Store;
use crate::sync::{SyncGate, SyncOutcome};
use crate::tasks::{PendingImpersonation, PendingSync};

#[derive(Debug)]
struct State {
    base_url: Url,
    provider_rpc_url: Option<String>,
    accounts: Vec<Account>,
    chain_id: ChainId,
    fork: Option<Fork>,
    connected_tabs: HashSet<TabId>,
}

impl State {
    fn fork_rpc_url(&self) -> Option<String> {
        self.fork
            .as_ref()
            .map(|fork| fork_rpc_url(&self.base_url, fork).to_string())
    }
}

/// Owns accounts, chain id, active fork, base URL, provider URL and tab
/// connections, and keeps them reconciled with the fork server.
///
/// Every mutation goes through a setter, which persists the new snapshot
/// and broadcasts the affected channels on the bus.
pub struct NeptuneController {
    config: ControllerConfig,
    bus: Arc<MessageBus>,
    gateway: Arc<dyn ForkGateway>,
    store: Arc<dyn Store>,
    forwarder: RpcForwarder,
    state: RwLock<State>,
    pub(crate) sync_gate: SyncGate,
    this: Weak<Self>,
}

impl fmt::Debug for NeptuneController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NeptuneController")
            .field("config", &self.config)
            .field("state", &*self.state.read())
            .finish_non_exhaustive()
    }
}

impl NeptuneController {
    /// Build a controller with default state. Touches neither the network
    /// nor the store.
    #[must_use]
    pub fn new(
        config: ControllerConfig,
        bus: Arc<MessageBus>,
        gateway: Arc<dyn ForkGateway>,
        store: Arc<dyn Store>,
    ) -> Arc<Self> {
        let state = State {
            base_url: config.base_url.clone(),
            provider_rpc_url: None,
            accounts: default_accounts(),
            chain_id: config.default_chain_id.clone(),
            fork: None,
            connected_tabs: HashSet::new(),
        };
        let forwarder = RpcForwarder::new(config.request_timeout());
        Arc::new_cyclic(|this| Self {
            config,
            bus,
            gateway,
            store,
            forwarder,
            state: RwLock::new(state),
            sync_gate: SyncGate::default(),
            this: this.clone(),
        })
    }

    /// Seed state from the store, then reconcile once with the fork server.
    ///
    /// The provider URL falls back to the configured default when nothing
    /// was saved.
    pub async fn init(&self) -> ControllerResult<SyncOutcome> {
        let snapshot = self.store.load().unwrap_or_else(|err| {
            warn!(error = %err, "could not read saved state, starting from defaults");
            Snapshot::default()
        });
        info!(restored = !snapshot.is_empty(), "initializing controller");

        if let Some(base_url) = snapshot.base_url {
            match parse_base_url(&base_url) {
                Ok(url) => self.apply_base_url(url),
                Err(err) => warn!(%base_url, error = %err, "ignoring saved base url"),
            }
        }
        if let Some(accounts) = snapshot.accounts {
            drop(self.set_accounts(accounts));
        }
        if let Some(fork) = snapshot.fork {
            drop(self.set_fork(Some(fork)));
        }
        if let Some(chain_id) = snapshot.chain_id {
            self.set_chain_id(chain_id);
        }

        let default_provider = self.config.default_provider_rpc_url.as_deref();
        let restored = match snapshot.provider_rpc_url.as_deref() {
            Some(saved) => match self.set_provider_rpc_url(Some(saved)) {
                Ok(()) => true,
                Err(err) => {
                    warn!(error = %err, "ignoring saved provider rpc url");
                    false
                }
            },
            None => false,
        };
        if !restored && let Err(err) = self.set_provider_rpc_url(default_provider) {
            warn!(error = %err, "ignoring invalid provider rpc url");
        }

        self.sync().await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Bus this controller serves.
    #[must_use]
    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    /// Current account list.
    #[must_use]
    pub fn accounts(&self) -> Vec<Account> {
        self.state.read().accounts.clone()
    }

    /// Current chain id.
    #[must_use]
    pub fn chain_id(&self) -> ChainId {
        self.state.read().chain_id.clone()
    }

    /// Active fork.
    #[must_use]
    pub fn fork(&self) -> Option<Fork> {
        self.state.read().fork.clone()
    }

    /// Fork server address.
    #[must_use]
    pub fn base_url(&self) -> Url {
        self.state.read().base_url.clone()
    }

    /// Upstream chain endpoint.
    #[must_use]
    pub fn provider_rpc_url(&self) -> Option<String> {
        self.state.read().provider_rpc_url.clone()
    }

    /// RPC endpoint of the active fork, derived from base URL and fork.
    #[must_use]
    pub fn fork_rpc_url(&self) -> Option<String> {
        self.state.read().fork_rpc_url()
    }

    /// Whether `tab` is connected.
    #[must_use]
    pub fn is_connected(&self, tab: TabId) -> bool {
        self.state.read().connected_tabs.contains(&tab)
    }

    /// Durable image of the current state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.read();
        Snapshot {
            accounts: Some(state.accounts.clone()),
            fork: state.fork.clone(),
            provider_rpc_url: state.provider_rpc_url.clone(),
            base_url: Some(state.base_url.to_string()),
            chain_id: Some(state.chain_id.clone()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Setters
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the chain id.
    pub fn set_chain_id(&self, chain_id: ChainId) {
        self.state.write().chain_id = chain_id.clone();
        self.persist();
        debug!(%chain_id, "chain changed");
        self.bus.emit_changed::<Chain>(chain_id);
    }

    /// Replace the account list and impersonate it on the active fork.
    ///
    /// Returns `None` without broadcasting when the list is unchanged.
    pub fn set_accounts(&self, accounts: Vec<Account>) -> Option<PendingImpersonation> {
        {
            let mut state = self.state.write();
            if state.accounts == accounts {
                return None;
            }
            state.accounts.clone_from(&accounts);
        }
        self.persist();
        debug!(count = accounts.len(), "accounts changed");
        self.bus.emit_changed::<Accounts>(accounts);
        Some(self.schedule_impersonation())
    }

    /// Replace the active fork, broadcast it and its RPC URL, then
    /// impersonate accounts on it in the background.
    pub fn set_fork(&self, fork: Option<Fork>) -> PendingImpersonation {
        let fork_rpc_url = {
            let mut state = self.state.write();
            state.fork.clone_from(&fork);
            state.fork_rpc_url()
        };
        self.persist();
        info!(fork = ?fork.as_ref().map(|f| f.id.as_str()), "active fork changed");
        self.bus.emit_changed::<ActiveFork>(fork);
        self.bus.emit_changed::<ForkRpcUrl>(fork_rpc_url);
        self.schedule_impersonation()
    }

    /// Point at a different fork server and resynchronize against it.
    ///
    /// An unparseable URL is rejected and leaves state untouched.
    pub fn set_base_url(&self, url: &str) -> ControllerResult<PendingSync> {
        let parsed = parse_base_url(url)?;
        self.apply_base_url(parsed);
        Ok(self.schedule_sync())
    }

    /// Replace the upstream chain endpoint. `None` or an empty string clears it.
    pub fn set_provider_rpc_url(&self, url: Option<&str>) -> ControllerResult<()> {
        let url = match url.filter(|url| !url.is_empty()) {
            Some(url) => {
                Url::parse(url).map_err(|err| ControllerError::invalid_url(url, err))?;
                Some(url.to_string())
            }
            None => None,
        };
        self.state.write().provider_rpc_url.clone_from(&url);
        self.persist();
        debug!(provider_rpc_url = ?url, "provider rpc url changed");
        self.bus.emit_changed::<ProviderRpcUrl>(url);
        Ok(())
    }

    /// Mark `tab` connected. Broadcasts on every call.
    pub fn connect(&self, tab: TabId) {
        self.state.write().connected_tabs.insert(tab);
        debug!(%tab, "tab connected");
        self.bus.emit_changed::<Connection>(ConnectionChange::connected(tab));
    }

    /// Mark `tab` disconnected. Broadcasts on every call.
    pub fn disconnect(&self, tab: TabId) {
        self.state.write().connected_tabs.remove(&tab);
        debug!(%tab, "tab disconnected");
        self.bus.emit_changed::<Connection>(ConnectionChange::disconnected(tab));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // RPC
    // ─────────────────────────────────────────────────────────────────────────

    /// Forward a JSON-RPC payload to the active fork.
    pub async fn send_rpc_request(&self, payload: RpcPayload) -> ControllerResult<Value> {
        let (fork_rpc_url, origin) = {
            let state = self.state.read();
            (state.fork_rpc_url(), origin(&state.base_url))
        };
        let fork_rpc_url = fork_rpc_url.ok_or(ControllerError::NoActiveFork)?;
        self.forwarder.forward(&fork_rpc_url, &origin, payload).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) fn gateway(&self) -> &dyn ForkGateway {
        self.gateway.as_ref()
    }

    pub(crate) fn sync_inputs(&self) -> (Url, Option<Fork>, Option<String>) {
        let state = self.state.read();
        (
            state.base_url.clone(),
            state.fork.clone(),
            state.provider_rpc_url.clone(),
        )
    }

    /// Replace the base URL without scheduling a resync.
    fn apply_base_url(&self, url: Url) {
        let fork_rpc_url = {
            let mut state = self.state.write();
            state.base_url = url.clone();
            state.fork_rpc_url()
        };
        self.persist();
        info!(base_url = %url, "base url changed");
        self.bus.emit_changed::<BaseUrl>(url.to_string());
        self.bus.emit_changed::<ForkRpcUrl>(fork_rpc_url);
    }

    fn persist(&self) {
        if let Err(err) = self.store.save(&self.snapshot()) {
            warn!(error = %err, "failed to persist state");
        }
    }

    /// Impersonate every account on the active fork, awaiting the attempt.
    pub(crate) async fn impersonate_accounts(&self) {
        let (fork_rpc_url, accounts) = {
            let state = self.state.read();
            (state.fork_rpc_url(), state.accounts.clone())
        };
        if let Some(url) = fork_rpc_url {
            impersonate_all_logged(self.gateway.as_ref(), &url, &accounts).await;
        }
    }

    fn schedule_impersonation(&self) -> PendingImpersonation {
        let (fork_rpc_url, accounts) = {
            let state = self.state.read();
            (state.fork_rpc_url(), state.accounts.clone())
        };
        let gateway = self.gateway.clone();
        PendingImpersonation::new(tokio::spawn(async move {
            if let Some(url) = fork_rpc_url {
                impersonate_all_logged(gateway.as_ref(), &url, &accounts).await;
            }
        }))
    }

    fn schedule_sync(&self) -> PendingSync {
        let this = self.this.upgrade();
        PendingSync::new(tokio::spawn(async move {
            match this {
                Some(controller) => controller.sync().await,
                None => Err(ControllerError::SyncAborted("controller dropped".into())),
            }
        }))
    }
}
