//! The fork server seam.

use async_trait::async_trait;
use neptune_core::{Account, Fork, Url};
use tracing::{debug, info, warn};

use crate::error::GatewayResult;

/// Parameters for creating a fork.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateForkParams {
    /// Display name.
    pub name: String,
    /// Upstream chain the fork is seeded from.
    pub provider_rpc_url: Option<String>,
    /// Fork to branch from. A root fork gets prefunded anvil accounts.
    pub parent: Option<Fork>,
}

impl CreateForkParams {
    /// Root fork of `provider_rpc_url`.
    #[must_use]
    pub fn new(name: impl Into<String>, provider_rpc_url: Option<String>) -> Self {
        Self {
            name: name.into(),
            provider_rpc_url,
            parent: None,
        }
    }

    /// Branch from an existing fork.
    #[must_use]
    pub fn with_parent(mut self, parent: Fork) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Name given to forks bootstrapped from the upstream head.
#[must_use]
pub fn mainnet_fork_name(block: u64) -> String {
    format!("Mainnet @ block {block}")
}

/// Network operations against the fork server, the upstream chain and
/// individual forks.
#[async_trait]
pub trait ForkGateway: Send + Sync {
    /// List the forks the server currently hosts.
    async fn available_forks(&self, base: &Url) -> GatewayResult<Vec<Fork>>;

    /// Create a fork and return it.
    async fn create_fork(&self, base: &Url, params: CreateForkParams) -> GatewayResult<Fork>;

    /// Delete a fork.
    async fn delete_fork(&self, base: &Url, fork: &Fork) -> GatewayResult<()>;

    /// Current head block number of an upstream chain.
    async fn latest_block(&self, provider_rpc_url: &str) -> GatewayResult<u64>;

    /// Impersonate every account on a fork in one batched call.
    async fn impersonate_all(&self, fork_rpc_url: &str, accounts: &[Account])
    -> GatewayResult<()>;

    /// Create a root fork of the upstream head, named after its block.
    async fn fork_mainnet_latest(&self, base: &Url, provider_rpc_url: &str) -> GatewayResult<Fork> {
        let block = self.latest_block(provider_rpc_url).await?;
        let params = CreateForkParams::new(mainnet_fork_name(block), Some(provider_rpc_url.into()));
        let fork = self.create_fork(base, params).await?;
        info!(fork = %fork.id, block, "forked upstream head");
        Ok(fork)
    }

    /// Whether the fork server answers its listing endpoint.
    async fn is_server_running(&self, base: &Url) -> bool {
        match self.available_forks(base).await {
            Ok(_) => true,
            Err(err) => {
                debug!(%base, error = %err, "fork server not reachable");
                false
            }
        }
    }
}

/// Impersonate accounts, logging instead of returning a failure.
pub async fn impersonate_all_logged(
    gateway: &dyn ForkGateway,
    fork_rpc_url: &str,
    accounts: &[Account],
) {
    match gateway.impersonate_all(fork_rpc_url, accounts).await {
        Ok(()) => debug!(fork_rpc_url, accounts = accounts.len(), "accounts impersonated"),
        Err(err) => warn!(fork_rpc_url, error = %err, "account impersonation failed"),
    }
}
