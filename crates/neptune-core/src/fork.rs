//! Forks and tab connection state.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Server-assigned fork identifier.
///
/// Servers may report ids as strings or integers; both normalize to the
/// decimal string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ForkId(String);

impl<'de> Deserialize<'de> for ForkId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(id) => Self(id),
            RawId::Unsigned(id) => Self(id.to_string()),
            RawId::Signed(id) => Self(id.to_string()),
        })
    }
}

impl ForkId {
    /// Wrap a fork id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ForkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fork session hosted by the fork server.
///
/// Forks are never partially updated; the controller always swaps the whole
/// value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fork {
    /// Fork id (`fork_id` is accepted on input, as the server reports it on creation).
    #[serde(alias = "fork_id")]
    pub id: ForkId,

    /// Display name.
    #[serde(default)]
    pub name: String,
}

impl Fork {
    /// Create a fork handle.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ForkId::new(id),
            name: name.into(),
        }
    }
}

/// Opaque identifier of a client page (browser tab).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection membership change for one tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionChange {
    /// Whether the tab is now connected.
    pub connected: bool,
    /// The tab concerned.
    pub tab_id: TabId,
}

impl ConnectionChange {
    /// A tab joined.
    #[must_use]
    pub const fn connected(tab_id: TabId) -> Self {
        Self {
            connected: true,
            tab_id,
        }
    }

    /// A tab left.
    #[must_use]
    pub const fn disconnected(tab_id: TabId) -> Self {
        Self {
            connected: false,
            tab_id,
        }
    }
}
