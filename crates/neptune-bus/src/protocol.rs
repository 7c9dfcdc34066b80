//! Wire protocol for carrying bus traffic across a process boundary.
//!
//! A peer sends [`Envelope`]s, one JSON object per line. Each is answered
//! with an [`OutboundFrame::Reply`] echoing its id; change notifications
//! are interleaved as [`OutboundFrame::Notification`].

use neptune_core::{Account, ChainId, ConnectionChange, ErrorResponse, Fork, RpcPayload, TabId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::bus::{ChangeEvent, MessageBus};
use crate::channel::ChannelName;
use crate::channels::{
    Accounts, ActiveFork, BaseUrl, Chain, Connection, ForkRpcUrl, ProviderRpcUrl, Rpc,
};
use crate::error::BusResult;

/// Every request a remote peer can make.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum BusRequest {
    GetAccounts,
    SetAccounts { accounts: Vec<Account> },
    GetChain,
    SetChain { chain_id: ChainId },
    GetBaseUrl,
    SetBaseUrl { url: String },
    GetProviderRpcUrl,
    SetProviderRpcUrl { url: Option<String> },
    GetFork,
    SetFork { fork: Option<Fork> },
    GetForkRpcUrl,
    GetConnection { tab_id: TabId },
    SetConnection { connected: bool, tab_id: TabId },
    Rpc { payload: RpcPayload },
    Sync,
}

impl BusRequest {
    /// Channel the request travels on.
    #[must_use]
    pub const fn channel(&self) -> ChannelName {
        match self {
            Self::GetAccounts | Self::SetAccounts { .. } => ChannelName::Accounts,
            Self::GetChain | Self::SetChain { .. } => ChannelName::Chain,
            Self::GetBaseUrl | Self::SetBaseUrl { .. } => ChannelName::BaseUrl,
            Self::GetProviderRpcUrl | Self::SetProviderRpcUrl { .. } => {
                ChannelName::ProviderRpcUrl
            }
            Self::GetFork | Self::SetFork { .. } => ChannelName::Fork,
            Self::GetForkRpcUrl => ChannelName::ForkRpcUrl,
            Self::GetConnection { .. } | Self::SetConnection { .. } => ChannelName::Connection,
            Self::Rpc { .. } => ChannelName::Rpc,
            Self::Sync => ChannelName::Sync,
        }
    }
}

/// Outcome of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BusResponse {
    Ok { value: Value },
    Error { error: ErrorResponse },
}

impl BusResponse {
    /// Whether the request succeeded.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

/// A change notification as seen by a remote peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "value", rename_all = "camelCase")]
pub enum BusNotification {
    Accounts(Vec<Account>),
    Chain(ChainId),
    BaseUrl(String),
    ProviderRpcUrl(Option<String>),
    Fork(Option<Fork>),
    ForkRpcUrl(Option<String>),
    Connection(ConnectionChange),
}

impl BusNotification {
    /// Channel the change was broadcast on.
    #[must_use]
    pub const fn channel(&self) -> ChannelName {
        match self {
            Self::Accounts(_) => ChannelName::Accounts,
            Self::Chain(_) => ChannelName::Chain,
            Self::BaseUrl(_) => ChannelName::BaseUrl,
            Self::ProviderRpcUrl(_) => ChannelName::ProviderRpcUrl,
            Self::Fork(_) => ChannelName::Fork,
            Self::ForkRpcUrl(_) => ChannelName::ForkRpcUrl,
            Self::Connection(_) => ChannelName::Connection,
        }
    }

    /// Wire form of a bus change. Request-only channels have none.
    #[must_use]
    pub fn from_change(event: &ChangeEvent) -> Option<Self> {
        match event.channel() {
            ChannelName::Accounts => event.value::<Accounts>().cloned().map(Self::Accounts),
            ChannelName::Chain => event.value::<Chain>().cloned().map(Self::Chain),
            ChannelName::BaseUrl => event.value::<BaseUrl>().cloned().map(Self::BaseUrl),
            ChannelName::ProviderRpcUrl => event
                .value::<ProviderRpcUrl>()
                .cloned()
                .map(Self::ProviderRpcUrl),
            ChannelName::Fork => event.value::<ActiveFork>().cloned().map(Self::Fork),
            ChannelName::ForkRpcUrl => event.value::<ForkRpcUrl>().cloned().map(Self::ForkRpcUrl),
            ChannelName::Connection => event.value::<Connection>().copied().map(Self::Connection),
            ChannelName::Rpc | ChannelName::Sync => None,
        }
    }
}

/// Inbound frame: a request plus the id its reply will carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub id: Option<u64>,
    pub request: BusRequest,
}

impl Envelope {
    /// Best-effort `id` of a frame that failed to decode, so the error reply
    /// can still be correlated.
    #[must_use]
    pub fn id_of(raw: &str) -> Option<u64> {
        serde_json::from_str::<Value>(raw)
            .ok()?
            .get("id")
            .and_then(Value::as_u64)
    }
}

/// Outbound frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundFrame {
    Reply {
        id: Option<u64>,
        response: BusResponse,
    },
    Notification {
        notification: BusNotification,
    },
}

/// Route a wire request to the registered handler.
pub async fn dispatch(bus: &MessageBus, request: BusRequest) -> BusResponse {
    let channel = request.channel();
    let result = match request {
        BusRequest::GetAccounts => encode(bus.get::<Accounts>(()).await),
        BusRequest::SetAccounts { accounts } => encode(bus.set::<Accounts>(accounts).await),
        BusRequest::GetChain => encode(bus.get::<Chain>(()).await),
        BusRequest::SetChain { chain_id } => encode(bus.set::<Chain>(chain_id).await),
        BusRequest::GetBaseUrl => encode(bus.get::<BaseUrl>(()).await),
        BusRequest::SetBaseUrl { url } => encode(bus.set::<BaseUrl>(url).await),
        BusRequest::GetProviderRpcUrl => encode(bus.get::<ProviderRpcUrl>(()).await),
        BusRequest::SetProviderRpcUrl { url } => encode(bus.set::<ProviderRpcUrl>(url).await),
        BusRequest::GetFork => encode(bus.get::<ActiveFork>(()).await),
        BusRequest::SetFork { fork } => encode(bus.set::<ActiveFork>(fork).await),
        BusRequest::GetForkRpcUrl => encode(bus.get::<ForkRpcUrl>(()).await),
        BusRequest::GetConnection { tab_id } => encode(bus.get::<Connection>(tab_id).await),
        BusRequest::SetConnection { connected, tab_id } => encode(
            bus.set::<Connection>(ConnectionChange { connected, tab_id })
                .await,
        ),
        BusRequest::Rpc { payload } => bus.send_request::<Rpc>(payload).await,
        BusRequest::Sync => encode(bus.sync().await),
    };

    match result {
        Ok(value) => BusResponse::Ok { value },
        Err(err) => {
            debug!(%channel, error = %err, "bus request failed");
            BusResponse::Error {
                error: err.to_response(),
            }
        }
    }
}

fn encode<T: Serialize>(result: BusResult<T>) -> BusResult<Value> {
    Ok(serde_json::to_value(result?)?)
}

/// Every change on the bus as wire notifications, in emit order.
///
/// Forwarding stops once the receiver is dropped or the bus goes away.
#[must_use]
pub fn notifications(bus: &MessageBus) -> mpsc::Receiver<BusNotification> {
    let (tx, rx) = mpsc::channel(bus.config().change_capacity.max(1));
    let mut feed = bus.subscribe_all();
    tokio::spawn(async move {
        while let Some(event) = feed.recv().await {
            let Some(notification) = BusNotification::from_change(&event) else {
                continue;
            };
            if tx.send(notification).await.is_err() {
                break;
            }
        }
    });
    rx
}
