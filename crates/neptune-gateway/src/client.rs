//! reqwest implementation of [`ForkGateway`].

use std::time::Duration;

use async_trait::async_trait;
use neptune_core::endpoints::{fork_url, forks_url};
use neptune_core::{Account, Fork, RpcRequest, Url};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{CreateForkParams, ForkGateway};

const DEFAULT_USER_AGENT: &str = concat!("neptune/", env!("CARGO_PKG_VERSION"));

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Default headers applied to every request.
    pub headers: HeaderMap,
    /// Request timeout.
    pub timeout: Duration,
    /// User agent.
    pub user_agent: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            headers,
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Builder for [`ForkServerClient`].
#[derive(Debug, Clone, Default)]
pub struct ForkServerClientBuilder {
    config: GatewayConfig,
}

impl ForkServerClientBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the client.
    pub fn build(self) -> GatewayResult<ForkServerClient> {
        ForkServerClient::with_config(self.config)
    }
}

/// Fork server client.
#[derive(Debug, Clone)]
pub struct ForkServerClient {
    http: reqwest::Client,
    config: GatewayConfig,
}

/// Fork listing, either a bare array or wrapped in `{"forks": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ForkListing {
    Bare(Vec<Fork>),
    Wrapped { forks: Vec<Fork> },
}

#[derive(Deserialize)]
struct RpcErrorObject {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct RpcReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

impl ForkServerClient {
    /// Create a client with default configuration.
    pub fn new() -> GatewayResult<Self> {
        Self::with_config(GatewayConfig::default())
    }

    /// Create a client with custom configuration.
    pub fn with_config(config: GatewayConfig) -> GatewayResult<Self> {
        let http = reqwest::Client::builder()
            .default_headers(config.headers.clone())
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { http, config })
    }

    /// Start a builder.
    #[must_use]
    pub fn builder() -> ForkServerClientBuilder {
        ForkServerClientBuilder::new()
    }

    /// Client configuration.
    #[must_use]
    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    async fn send_once(&self, request: reqwest::RequestBuilder) -> GatewayResult<Vec<u8>> {
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(GatewayError::HttpStatus {
                status,
                body: truncate_body(&bytes),
            });
        }

        Ok(bytes.to_vec())
    }

    async fn rpc_call(&self, endpoint: &str, request: &RpcRequest) -> GatewayResult<Value> {
        let bytes = self
            .send_once(self.http.post(endpoint).body(serde_json::to_vec(request)?))
            .await?;
        let reply: RpcReply = serde_json::from_slice(&bytes)?;
        if let Some(error) = reply.error {
            return Err(GatewayError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(reply.result.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl ForkGateway for ForkServerClient {
    #[instrument(skip_all, fields(base = %base))]
    async fn available_forks(&self, base: &Url) -> GatewayResult<Vec<Fork>> {
        let bytes = self.send_once(self.http.get(forks_url(base))).await?;
        let listing: ForkListing = serde_json::from_slice(&bytes)?;
        let forks = match listing {
            ForkListing::Bare(forks) | ForkListing::Wrapped { forks } => forks,
        };
        debug!(count = forks.len(), "listed forks");
        Ok(forks)
    }

    #[instrument(skip_all, fields(base = %base, name = %params.name))]
    async fn create_fork(&self, base: &Url, params: CreateForkParams) -> GatewayResult<Fork> {
        let mut config = json!({
            "eth_rpc_url": params.provider_rpc_url,
            "prefund_anvil_accounts": params.parent.is_none(),
        });
        if let Some(parent) = &params.parent {
            config["parent_fork_id"] = json!(parent.id);
        }
        let body = json!({ "name": params.name, "config": config });

        let bytes = self
            .send_once(self.http.post(forks_url(base)).body(serde_json::to_vec(&body)?))
            .await?;
        let response: Value = serde_json::from_slice(&bytes)?;
        let fork_id = match response.get("fork_id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(GatewayError::ForkCreationFailed {
                    response: truncate_body(&bytes),
                });
            }
        };

        debug!(fork = %fork_id, "fork created");
        Ok(Fork::new(fork_id, params.name))
    }

    #[instrument(skip_all, fields(base = %base, fork = %fork.id))]
    async fn delete_fork(&self, base: &Url, fork: &Fork) -> GatewayResult<()> {
        self.send_once(self.http.delete(fork_url(base, fork))).await?;
        debug!("fork deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn latest_block(&self, provider_rpc_url: &str) -> GatewayResult<u64> {
        let request = RpcRequest::new("eth_blockNumber", json!([])).with_id(1);
        let result = self.rpc_call(provider_rpc_url, &request).await?;
        let block = result
            .as_str()
            .and_then(parse_quantity)
            .ok_or_else(|| GatewayError::InvalidBlockNumber(result.to_string()))?;
        debug!(block, "latest upstream block");
        Ok(block)
    }

    #[instrument(skip_all, fields(fork_rpc_url = %fork_rpc_url, accounts = accounts.len()))]
    async fn impersonate_all(
        &self,
        fork_rpc_url: &str,
        accounts: &[Account],
    ) -> GatewayResult<()> {
        if accounts.is_empty() {
            return Ok(());
        }
        let batch: Vec<RpcRequest> = accounts
            .iter()
            .zip(1_u64..)
            .map(|(account, id)| {
                RpcRequest::new("anvil_impersonateAccount", json!([account.address])).with_id(id)
            })
            .collect();

        self.send_once(self.http.post(fork_rpc_url).body(serde_json::to_vec(&batch)?))
            .await?;
        Ok(())
    }
}

fn parse_quantity(value: &str) -> Option<u64> {
    let digits = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X"))?;
    u64::from_str_radix(digits, 16).ok()
}

/// Lossy UTF-8 rendering of a response body, capped for error messages.
#[must_use]
pub fn truncate_body(bytes: &[u8]) -> String {
    const MAX_LEN: usize = 4096;
    let mut body = String::from_utf8_lossy(bytes).to_string();
    if body.len() > MAX_LEN {
        let mut cut = MAX_LEN;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push('…');
    }
    body
}
