//! Neptune Bus - Typed message bus between Neptune execution contexts.
//!
//! This crate provides:
//! - Statically named, statically typed channels ([`channels`]); a channel
//!   only exposes the protocols it declares, so a "get" channel can never be
//!   used as "set".
//! - An in-process [`MessageBus`] carrying get/set, request/response and
//!   change-notification traffic.
//! - A closed wire protocol ([`BusRequest`], [`BusResponse`],
//!   [`BusNotification`]) and [`dispatch`] for carrying the same traffic
//!   across a process boundary.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod bus;
mod channel;
pub mod channels;
mod error;
mod protocol;

pub use bus::{BusConfig, ChangeEvent, ChangeFeed, MessageBus, Subscription};
pub use channel::{
    ChangeChannel, Channel, ChannelName, GetChannel, RequestChannel, SetChannel,
};
pub use error::{BusError, BusResult};
pub use protocol::{
    BusNotification, BusRequest, BusResponse, Envelope, OutboundFrame, dispatch, notifications,
};
