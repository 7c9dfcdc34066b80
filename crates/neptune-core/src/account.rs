//! Accounts and chain identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Chain selected when nothing else has been configured (Ethereum mainnet).
pub const DEFAULT_CHAIN_ID: &str = "0x1";

/// Hex-encoded chain identifier (for example `0x1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(String);

impl ChainId {
    /// Wrap a hex chain id string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ChainId {
    fn default() -> Self {
        Self::new(DEFAULT_CHAIN_ID)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChainId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// An address the controller treats as one of the user's own.
///
/// Equality is field-wise, so two account lists compare equal exactly when
/// they hold the same addresses with the same labels in the same order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    /// Checksummed hex address.
    pub address: String,

    /// Display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Account {
    /// Create an unlabelled account.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            label: None,
        }
    }

    /// Attach a display label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Development accounts prefunded by anvil-backed forks.
const ANVIL_ADDRESSES: [&str; 5] = [
    "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
    "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
    "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC",
    "0x90F79bf6EB2c4f870365E785982E1f101E93b906",
    "0x15d34AAf54267DB7D7c367839AAf71A00a2C6A65",
];

/// The account set used before anything has been persisted.
#[must_use]
pub fn default_accounts() -> Vec<Account> {
    ANVIL_ADDRESSES
        .iter()
        .enumerate()
        .map(|(idx, address)| Account::new(*address).with_label(format!("Account {}", idx + 1)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_default_is_mainnet() {
        let chain = ChainId::default();
        assert_eq!(chain.as_str(), "0x1");
    }

    #[test]
    fn test_account_lists_compare_by_value() {
        let a = vec![Account::new("0xabc").with_label("main")];
        let b = vec![Account::new("0xabc").with_label("main")];
        let c = vec![Account::new("0xabc")];

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_account_label_omitted_when_absent() {
        let json = serde_json::to_value(Account::new("0xabc")).unwrap();
        assert_eq!(json, serde_json::json!({ "address": "0xabc" }));
    }

    #[test]
    fn test_default_accounts_are_labelled() {
        let accounts = default_accounts();
        assert_eq!(accounts.len(), 5);
        assert_eq!(accounts[0].label.as_deref(), Some("Account 1"));
        assert_eq!(accounts[4].label.as_deref(), Some("Account 5"));
    }
}
