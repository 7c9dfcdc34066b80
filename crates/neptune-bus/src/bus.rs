//! In-process message bus.
//!
//! Handlers are registered by the owning context (normally the controller)
//! and invoked by any other context holding the bus. Change notifications
//! ride on one `tokio::sync::broadcast` channel per bus channel, and are
//! mirrored onto a single bus-wide feed that keeps emit order across
//! channels.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::channel::{ChangeChannel, Channel, ChannelName, GetChannel, RequestChannel, SetChannel};
use crate::channels::Resync;
use crate::error::{BusError, BusResult};

/// Default broadcast buffer per change channel.
const DEFAULT_CHANGE_CAPACITY: usize = 256;

/// Message bus configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Buffered change notifications per channel before slow subscribers lag.
    pub change_capacity: usize,

    /// How long a request may wait for its responder. `None` waits forever.
    pub request_timeout: Option<Duration>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            change_capacity: DEFAULT_CHANGE_CAPACITY,
            request_timeout: None,
        }
    }
}

impl BusConfig {
    /// Create a new configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-channel broadcast buffer.
    #[must_use]
    pub const fn with_change_capacity(mut self, capacity: usize) -> Self {
        self.change_capacity = capacity;
        self
    }

    /// Bound how long requests wait for a responder.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

type Handler<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, BusResult<O>> + Send + Sync>;

type Slot = Box<dyn Any + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Protocol {
    Get,
    Set,
    Request,
}

/// One change as carried on the bus-wide feed.
#[derive(Clone)]
pub struct ChangeEvent {
    channel: ChannelName,
    value: Arc<dyn Any + Send + Sync>,
}

impl fmt::Debug for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeEvent")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl ChangeEvent {
    /// Channel the change was emitted on.
    #[must_use]
    pub const fn channel(&self) -> ChannelName {
        self.channel
    }

    /// The changed value, if this event belongs to `C`.
    #[must_use]
    pub fn value<C: ChangeChannel>(&self) -> Option<&C::Change> {
        if self.channel != C::NAME {
            return None;
        }
        self.value.downcast_ref()
    }
}

/// Typed request/notify bus shared by every execution context.
pub struct MessageBus {
    config: BusConfig,
    handlers: RwLock<HashMap<(Protocol, TypeId), Slot>>,
    senders: Mutex<HashMap<TypeId, Slot>>,
    feed: broadcast::Sender<ChangeEvent>,
}

impl fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBus")
            .field("config", &self.config)
            .field("handlers", &self.handlers.read().len())
            .field("change_channels", &self.senders.lock().len())
            .finish()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus {
    /// Create a bus with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Create a bus with custom configuration.
    #[must_use]
    pub fn with_config(config: BusConfig) -> Self {
        let (feed, _) = broadcast::channel(config.change_capacity.max(1));
        Self {
            config,
            handlers: RwLock::new(HashMap::new()),
            senders: Mutex::new(HashMap::new()),
            feed,
        }
    }

    /// Bus configuration.
    #[must_use]
    pub const fn config(&self) -> &BusConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Get
    // ─────────────────────────────────────────────────────────────────────────

    /// Register the provider of a channel's current value. The last
    /// registration wins.
    pub fn on_get<C, F, Fut>(&self, handler: F)
    where
        C: GetChannel,
        F: Fn(C::Query) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BusResult<C::Value>> + Send + 'static,
    {
        self.register::<C, _, _, _, _>(Protocol::Get, handler);
    }

    /// Ask the provider for the channel's current value.
    pub async fn get<C: GetChannel>(&self, query: C::Query) -> BusResult<C::Value> {
        self.call::<C, C::Query, C::Value>(Protocol::Get, query)
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Set
    // ─────────────────────────────────────────────────────────────────────────

    /// Register the handler performing a channel's mutation.
    pub fn on_set<C, F, Fut>(&self, handler: F)
    where
        C: SetChannel,
        F: Fn(C::Input) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BusResult<C::Output>> + Send + 'static,
    {
        self.register::<C, _, _, _, _>(Protocol::Set, handler);
    }

    /// Request a mutation and wait for the handler's result.
    pub async fn set<C: SetChannel>(&self, input: C::Input) -> BusResult<C::Output> {
        self.call::<C, C::Input, C::Output>(Protocol::Set, input)
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Request / response
    // ─────────────────────────────────────────────────────────────────────────

    /// Register the responder of a request channel.
    pub fn on_request<C, F, Fut>(&self, handler: F)
    where
        C: RequestChannel,
        F: Fn(C::Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BusResult<C::Response>> + Send + 'static,
    {
        self.register::<C, _, _, _, _>(Protocol::Request, handler);
    }

    /// Send an opaque request and wait for the response.
    pub async fn send_request<C: RequestChannel>(
        &self,
        request: C::Request,
    ) -> BusResult<C::Response> {
        self.call::<C, C::Request, C::Response>(Protocol::Request, request)
            .await
    }

    /// Register the resynchronization entry point.
    pub fn on_sync<F, Fut>(&self, handler: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BusResult<()>> + Send + 'static,
    {
        self.on_request::<Resync, _, _>(move |()| handler());
    }

    /// Request an immediate resynchronization.
    pub async fn sync(&self) -> BusResult<()> {
        self.send_request::<Resync>(()).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Change notifications
    // ─────────────────────────────────────────────────────────────────────────

    /// Broadcast a change. Without subscribers this is a silent no-op.
    pub fn emit_changed<C: ChangeChannel>(&self, value: C::Change) {
        if self.feed.receiver_count() > 0 {
            let event = ChangeEvent {
                channel: C::NAME,
                value: Arc::new(value.clone()),
            };
            let _ = self.feed.send(event);
        }
        match self.sender::<C>().send(value) {
            Ok(receivers) => debug!(channel = %C::NAME, receivers, "change broadcast"),
            Err(_) => debug!(channel = %C::NAME, "change broadcast without subscribers"),
        }
    }

    /// Subscribe to a channel's future changes.
    #[must_use]
    pub fn subscribe<C: ChangeChannel>(&self) -> Subscription<C> {
        Subscription {
            receiver: self.sender::<C>().subscribe(),
            _channel: PhantomData,
        }
    }

    /// Subscribe to every future change on every channel, in emit order.
    #[must_use]
    pub fn subscribe_all(&self) -> ChangeFeed {
        ChangeFeed {
            receiver: self.feed.subscribe(),
        }
    }

    /// Run `handler` for every future change on a background task.
    pub fn on_changed<C, F, Fut>(&self, handler: F) -> JoinHandle<()>
    where
        C: ChangeChannel,
        F: Fn(C::Change) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut subscription = self.subscribe::<C>();
        tokio::spawn(async move {
            while let Some(change) = subscription.recv().await {
                handler(change).await;
            }
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn register<C, I, O, F, Fut>(&self, protocol: Protocol, handler: F)
    where
        C: Channel,
        I: Send + 'static,
        O: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BusResult<O>> + Send + 'static,
    {
        let handler: Handler<I, O> = Arc::new(move |input| handler(input).boxed());
        let previous = self
            .handlers
            .write()
            .insert((protocol, TypeId::of::<C>()), Box::new(handler));
        if previous.is_some() {
            debug!(channel = %C::NAME, ?protocol, "replaced bus handler");
        }
    }

    async fn call<C, I, O>(&self, protocol: Protocol, input: I) -> BusResult<O>
    where
        C: Channel,
        I: Send + 'static,
        O: Send + 'static,
    {
        let handler = self
            .handlers
            .read()
            .get(&(protocol, TypeId::of::<C>()))
            .and_then(|slot| slot.downcast_ref::<Handler<I, O>>())
            .cloned();
        let Some(handler) = handler else {
            debug!(channel = %C::NAME, ?protocol, "no responder registered");
            return Err(BusError::ChannelUnavailable { channel: C::NAME });
        };

        debug!(channel = %C::NAME, ?protocol, "bus request");
        let response = handler(input);
        match self.config.request_timeout {
            Some(limit) => tokio::time::timeout(limit, response).await.map_err(|_| {
                warn!(channel = %C::NAME, ?protocol, ?limit, "bus request timed out");
                BusError::ChannelUnavailable { channel: C::NAME }
            })?,
            None => response.await,
        }
    }

    fn sender<C: ChangeChannel>(&self) -> broadcast::Sender<C::Change> {
        let capacity = self.config.change_capacity.max(1);
        let mut senders = self.senders.lock();
        let slot = senders
            .entry(TypeId::of::<C>())
            .or_insert_with(|| Box::new(broadcast::channel::<C::Change>(capacity).0));
        if let Some(sender) = slot.downcast_ref::<broadcast::Sender<C::Change>>() {
            return sender.clone();
        }
        let (sender, _) = broadcast::channel(capacity);
        *slot = Box::new(sender.clone());
        sender
    }
}

/// Receiver of one channel's change notifications.
pub struct Subscription<C: ChangeChannel> {
    receiver: broadcast::Receiver<C::Change>,
    _channel: PhantomData<C>,
}

impl<C: ChangeChannel> fmt::Debug for Subscription<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &C::NAME)
            .field("pending", &self.receiver.len())
            .finish()
    }
}

impl<C: ChangeChannel> Subscription<C> {
    /// Wait for the next change. `None` once the bus is gone.
    ///
    /// A subscriber that falls more than the channel capacity behind skips
    /// the missed changes.
    pub async fn recv(&mut self) -> Option<C::Change> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(channel = %C::NAME, skipped, "subscriber lagged, skipping changes");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take an already delivered change without waiting.
    pub fn try_recv(&mut self) -> Option<C::Change> {
        loop {
            match self.receiver.try_recv() {
                Ok(change) => return Some(change),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(channel = %C::NAME, skipped, "subscriber lagged, skipping changes");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Take every already delivered change.
    pub fn drain(&mut self) -> Vec<C::Change> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

/// Receiver of the bus-wide change feed.
#[derive(Debug)]
pub struct ChangeFeed {
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl ChangeFeed {
    /// Wait for the next change on any channel. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "change feed lagged, skipping changes");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
