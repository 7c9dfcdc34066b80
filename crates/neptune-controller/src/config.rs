//! Controller configuration.

use std::path::PathBuf;
use std::time::Duration;

use neptune_bus::BusConfig;
use neptune_core::{ChainId, Url};
use serde::{Deserialize, Serialize};

use crate::error::{ControllerError, ControllerResult};

/// Upstream chain endpoint used when nothing has been persisted.
pub const PROVIDER_RPC_URL_ENV: &str = "PROVIDER_RPC_URL";
/// Location of the JSON state file.
pub const STORE_PATH_ENV: &str = "NEPTUNE_STORE_PATH";
/// Fork server address override.
pub const BASE_URL_ENV: &str = "NEPTUNE_BASE_URL";
/// HTTP timeout override, in seconds.
pub const REQUEST_TIMEOUT_ENV: &str = "NEPTUNE_REQUEST_TIMEOUT_SECS";

/// Controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Fork server address used until one is persisted.
    #[serde(default = "default_base_url")]
    pub base_url: Url,

    /// Chain id used until one is persisted.
    #[serde(default)]
    pub default_chain_id: ChainId,

    /// Upstream chain endpoint used until one is persisted.
    pub default_provider_rpc_url: Option<String>,

    /// JSON state file.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// HTTP timeout for fork server, upstream and fork RPC calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Bus tuning.
    #[serde(skip)]
    pub bus: BusConfig,
}

fn default_base_url() -> Url {
    // Constant input, always parses.
    Url::parse("http://localhost:1738").unwrap_or_else(|_| unreachable!())
}

/// Parse a fork server address. Only hierarchical URLs can carry the
/// `forks/{id}` path, so `mailto:`-style URLs are rejected too.
pub(crate) fn parse_base_url(raw: &str) -> ControllerResult<Url> {
    let url = Url::parse(raw).map_err(|err| ControllerError::invalid_url(raw, err))?;
    if url.cannot_be_a_base() {
        return Err(ControllerError::invalid_url(raw, "URL cannot carry a path"));
    }
    Ok(url)
}

fn default_store_path() -> PathBuf {
    PathBuf::from("neptune-state.json")
}

const fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            default_chain_id: ChainId::default(),
            default_provider_rpc_url: None,
            store_path: default_store_path(),
            request_timeout_secs: default_request_timeout_secs(),
            bus: BusConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> ControllerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with whatever `lookup` reports. Empty values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ControllerResult<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get(BASE_URL_ENV) {
            config.base_url = parse_base_url(&url)?;
        }
        config.default_provider_rpc_url = get(PROVIDER_RPC_URL_ENV);
        if let Some(path) = get(STORE_PATH_ENV) {
            config.store_path = PathBuf::from(path);
        }
        if let Some(secs) = get(REQUEST_TIMEOUT_ENV) {
            match secs.parse() {
                Ok(secs) => config.request_timeout_secs = secs,
                Err(_) => tracing::warn!(value = %secs, "ignoring invalid {REQUEST_TIMEOUT_ENV}"),
            }
        }

        Ok(config)
    }

    /// HTTP timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.base_url.as_str(), "http://localhost:1738/");
        assert_eq!(config.default_chain_id, ChainId::new("0x1"));
        assert_eq!(config.default_provider_rpc_url, None);
        assert_eq!(config.store_path, PathBuf::from("neptune-state.json"));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_environment_overlay() {
        let config = ControllerConfig::from_lookup(lookup(&[
            (PROVIDER_RPC_URL_ENV, "https://eth.example"),
            (STORE_PATH_ENV, "/tmp/neptune.json"),
            (REQUEST_TIMEOUT_ENV, "5"),
        ]))
        .unwrap();

        assert_eq!(
            config.default_provider_rpc_url.as_deref(),
            Some("https://eth.example")
        );
        assert_eq!(config.store_path, PathBuf::from("/tmp/neptune.json"));
        assert_eq!(config.request_timeout_secs, 5);
    }

    #[test]
    fn test_empty_provider_is_unset() {
        let config = ControllerConfig::from_lookup(lookup(&[(PROVIDER_RPC_URL_ENV, "")])).unwrap();
        assert_eq!(config.default_provider_rpc_url, None);
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = ControllerConfig::from_lookup(lookup(&[(BASE_URL_ENV, "not a url")])).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidUrl { .. }));
    }

    #[test]
    fn test_base_url_must_carry_a_path() {
        let err = parse_base_url("mailto:dev@example.com").unwrap_err();
        assert!(matches!(err, ControllerError::InvalidUrl { .. }));
        assert_eq!(
            parse_base_url("http://localhost:1738").unwrap().as_str(),
            "http://localhost:1738/"
        );
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ControllerConfig =
            serde_json::from_str(r#"{"request_timeout_secs": 3}"#).unwrap();
        assert_eq!(config.request_timeout_secs, 3);
        assert_eq!(config.base_url.as_str(), "http://localhost:1738/");
    }
}
