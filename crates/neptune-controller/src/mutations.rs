//! Fork management as performed by UI contexts: through the bus, never by
//! touching controller state directly.

use neptune_bus::MessageBus;
use neptune_bus::channels::{BaseUrl, ProviderRpcUrl, Rpc};
use neptune_core::{Fork, RpcRequest, Url};
use neptune_gateway::{CreateForkParams, ForkGateway, mainnet_fork_name};
use serde_json::{Value, json};
use tracing::info;

use crate::config::parse_base_url;
use crate::error::{ControllerError, ControllerResult};

async fn resolve_base_url(bus: &MessageBus, base_url: Option<Url>) -> ControllerResult<Url> {
    if let Some(url) = base_url {
        return Ok(url);
    }
    let url = bus.get::<BaseUrl>(()).await?;
    parse_base_url(&url)
}

/// Create a fork seeded from the configured provider.
///
/// `from` branches from an existing fork instead of the upstream chain.
/// The base URL is asked from the bus when not given.
pub async fn create_fork(
    bus: &MessageBus,
    gateway: &dyn ForkGateway,
    name: &str,
    from: Option<&Fork>,
    base_url: Option<Url>,
) -> ControllerResult<Fork> {
    let base_url = resolve_base_url(bus, base_url).await?;
    let provider_rpc_url = bus.get::<ProviderRpcUrl>(()).await?;

    let mut params = CreateForkParams::new(name, provider_rpc_url);
    if let Some(parent) = from {
        params = params.with_parent(parent.clone());
    }
    let fork = gateway.create_fork(&base_url, params).await?;
    info!(fork = %fork.id, name = %fork.name, "fork created");
    Ok(fork)
}

/// Delete a fork on the fork server the bus reports.
pub async fn delete_fork(
    bus: &MessageBus,
    gateway: &dyn ForkGateway,
    fork: &Fork,
) -> ControllerResult<()> {
    let base_url = resolve_base_url(bus, None).await?;
    gateway.delete_fork(&base_url, fork).await?;
    info!(fork = %fork.id, "fork deleted");
    Ok(())
}

/// Fork the upstream head, named after its block number.
pub async fn fork_mainnet_latest(
    bus: &MessageBus,
    gateway: &dyn ForkGateway,
    base_url: Option<Url>,
) -> ControllerResult<Fork> {
    let provider_rpc_url = bus
        .get::<ProviderRpcUrl>(())
        .await?
        .ok_or(ControllerError::NoProviderConfigured)?;
    let block = gateway.latest_block(&provider_rpc_url).await?;
    create_fork(bus, gateway, &mainnet_fork_name(block), None, base_url).await
}

/// How far to rewind the active fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backtrack {
    /// Back to the fork point.
    Reset,
    /// Undo the most recent step.
    StepBackOnce,
}

impl Backtrack {
    /// JSON-RPC method implementing this rewind.
    #[must_use]
    pub const fn method(self) -> &'static str {
        match self {
            Self::Reset => "neptune_reset",
            Self::StepBackOnce => "neptune_stepBackOnce",
        }
    }
}

/// Rewind the active fork and return the fork's result value.
pub async fn backtrack(bus: &MessageBus, mode: Backtrack) -> ControllerResult<Value> {
    let request = RpcRequest::new(mode.method(), json!([])).with_id(1);
    let reply = bus.send_request::<Rpc>(request.into()).await?;

    if let Some(error) = reply.get("error").filter(|error| !error.is_null()) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| error.to_string(), str::to_string);
        return Err(ControllerError::BacktrackFailed(message));
    }
    match reply.get("result") {
        Some(result) if is_truthy(result) => Ok(result.clone()),
        _ => Err(ControllerError::BacktrackFailed("Backtrack failed".into())),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
