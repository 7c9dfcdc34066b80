//! Persisted state image.

use serde::{Deserialize, Serialize};

use crate::{Account, ChainId, Fork};

/// Durable copy of the controller's state.
///
/// Every field is optional; an absent field means "use the default".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Account list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accounts: Option<Vec<Account>>,

    /// Active fork.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fork: Option<Fork>,

    /// Upstream chain endpoint used to seed new forks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_rpc_url: Option<String>,

    /// Fork server address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Selected chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<ChainId>,
}

impl Snapshot {
    /// Whether nothing has been persisted yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.accounts.is_none()
            && self.fork.is_none()
            && self.provider_rpc_url.is_none()
            && self.base_url.is_none()
            && self.chain_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_empty_snapshot() {
        let snapshot: Snapshot = serde_json::from_str("{}").unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_snapshot_uses_camel_case_keys() {
        let snapshot = Snapshot {
            provider_rpc_url: Some("https://eth.example".into()),
            chain_id: Some(ChainId::new("0x1")),
            ..Snapshot::default()
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["providerRpcUrl"], "https://eth.example");
        assert_eq!(json["chainId"], "0x1");
        assert!(json.get("fork").is_none());
    }
}
