//! The channel catalogue.
//!
//! | Channel | get | set | changed | request |
//! |---|---|---|---|---|
//! | [`Accounts`] | `() -> Vec<Account>` | `Vec<Account>` | `Vec<Account>` | |
//! | [`Chain`] | `() -> ChainId` | `ChainId` | `ChainId` | |
//! | [`BaseUrl`] | `() -> String` | `String` | `String` | |
//! | [`ProviderRpcUrl`] | `() -> Option<String>` | `Option<String>` | `Option<String>` | |
//! | [`ActiveFork`] | `() -> Option<Fork>` | `Option<Fork>` | `Option<Fork>` | |
//! | [`ForkRpcUrl`] | `() -> Option<String>` | | `Option<String>` | |
//! | [`Connection`] | `TabId -> bool` | `ConnectionChange` | `ConnectionChange` | |
//! | [`Rpc`] | | | | `RpcPayload -> Value` |
//! | [`Resync`] | | | | `() -> ()` |

use neptune_core::{Account, ChainId, ConnectionChange, Fork, RpcPayload, TabId};

use crate::channel::{
    ChangeChannel, Channel, ChannelName, GetChannel, RequestChannel, SetChannel,
};

/// Account list channel.
#[derive(Debug, Clone, Copy)]
pub struct Accounts;

impl Channel for Accounts {
    const NAME: ChannelName = ChannelName::Accounts;
}

impl GetChannel for Accounts {
    type Query = ();
    type Value = Vec<Account>;
}

impl SetChannel for Accounts {
    type Input = Vec<Account>;
    type Output = ();
}

impl ChangeChannel for Accounts {
    type Change = Vec<Account>;
}

/// Chain id channel.
#[derive(Debug, Clone, Copy)]
pub struct Chain;

impl Channel for Chain {
    const NAME: ChannelName = ChannelName::Chain;
}

impl GetChannel for Chain {
    type Query = ();
    type Value = ChainId;
}

impl SetChannel for Chain {
    type Input = ChainId;
    type Output = ();
}

impl ChangeChannel for Chain {
    type Change = ChainId;
}

/// Fork server address channel.
#[derive(Debug, Clone, Copy)]
pub struct BaseUrl;

impl Channel for BaseUrl {
    const NAME: ChannelName = ChannelName::BaseUrl;
}

impl GetChannel for BaseUrl {
    type Query = ();
    type Value = String;
}

impl SetChannel for BaseUrl {
    type Input = String;
    type Output = ();
}

impl ChangeChannel for BaseUrl {
    type Change = String;
}

/// Upstream chain endpoint channel.
#[derive(Debug, Clone, Copy)]
pub struct ProviderRpcUrl;

impl Channel for ProviderRpcUrl {
    const NAME: ChannelName = ChannelName::ProviderRpcUrl;
}

impl GetChannel for ProviderRpcUrl {
    type Query = ();
    type Value = Option<String>;
}

impl SetChannel for ProviderRpcUrl {
    type Input = Option<String>;
    type Output = ();
}

impl ChangeChannel for ProviderRpcUrl {
    type Change = Option<String>;
}

/// Active fork channel.
#[derive(Debug, Clone, Copy)]
pub struct ActiveFork;

impl Channel for ActiveFork {
    const NAME: ChannelName = ChannelName::Fork;
}

impl GetChannel for ActiveFork {
    type Query = ();
    type Value = Option<Fork>;
}

impl SetChannel for ActiveFork {
    type Input = Option<Fork>;
    type Output = ();
}

impl ChangeChannel for ActiveFork {
    type Change = Option<Fork>;
}

/// Derived fork RPC endpoint channel. Read-only.
#[derive(Debug, Clone, Copy)]
pub struct ForkRpcUrl;

impl Channel for ForkRpcUrl {
    const NAME: ChannelName = ChannelName::ForkRpcUrl;
}

impl GetChannel for ForkRpcUrl {
    type Query = ();
    type Value = Option<String>;
}

impl ChangeChannel for ForkRpcUrl {
    type Change = Option<String>;
}

/// Tab connection channel.
#[derive(Debug, Clone, Copy)]
pub struct Connection;

impl Channel for Connection {
    const NAME: ChannelName = ChannelName::Connection;
}

impl GetChannel for Connection {
    type Query = TabId;
    type Value = bool;
}

impl SetChannel for Connection {
    type Input = ConnectionChange;
    type Output = ();
}

impl ChangeChannel for Connection {
    type Change = ConnectionChange;
}

/// JSON-RPC forwarding channel.
#[derive(Debug, Clone, Copy)]
pub struct Rpc;

impl Channel for Rpc {
    const NAME: ChannelName = ChannelName::Rpc;
}

impl RequestChannel for Rpc {
    type Request = RpcPayload;
    type Response = serde_json::Value;
}

/// Resynchronization trigger. Carries no payload.
#[derive(Debug, Clone, Copy)]
pub struct Resync;

impl Channel for Resync {
    const NAME: ChannelName = ChannelName::Sync;
}

impl RequestChannel for Resync {
    type Request = ();
    type Response = ();
}
