//! Channel identity and per-protocol payload typing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Every channel the bus knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChannelName {
    /// Account list.
    Accounts,
    /// Selected chain id.
    Chain,
    /// Fork server address.
    BaseUrl,
    /// Upstream chain endpoint.
    ProviderRpcUrl,
    /// Active fork.
    Fork,
    /// Derived RPC endpoint of the active fork.
    ForkRpcUrl,
    /// Per-tab connection status.
    Connection,
    /// JSON-RPC forwarding.
    Rpc,
    /// Resynchronization trigger.
    Sync,
}

impl ChannelName {
    /// Wire name of the channel.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Accounts => "accounts",
            Self::Chain => "chain",
            Self::BaseUrl => "baseUrl",
            Self::ProviderRpcUrl => "providerRpcUrl",
            Self::Fork => "fork",
            Self::ForkRpcUrl => "forkRpcUrl",
            Self::Connection => "connection",
            Self::Rpc => "rpc",
            Self::Sync => "sync",
        }
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named channel. Implemented by zero-sized marker types.
pub trait Channel: Send + Sync + 'static {
    /// Channel name.
    const NAME: ChannelName;
}

/// Channels answering "get current value".
pub trait GetChannel: Channel {
    /// Query parameter (`()` for most channels).
    type Query: Send + 'static;
    /// Current value.
    type Value: Send + 'static;
}

/// Channels accepting a mutation.
pub trait SetChannel: Channel {
    /// Mutation input.
    type Input: Send + 'static;
    /// Whatever the handler reports back.
    type Output: Send + 'static;
}

/// Channels broadcasting change notifications.
pub trait ChangeChannel: Channel {
    /// Broadcast payload.
    type Change: Clone + Send + Sync + 'static;
}

/// Channels carrying an opaque request/response exchange.
pub trait RequestChannel: Channel {
    /// Request payload.
    type Request: Send + 'static;
    /// Response payload.
    type Response: Send + 'static;
}
