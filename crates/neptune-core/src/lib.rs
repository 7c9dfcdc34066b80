//! Neptune Core - Shared domain types for the Neptune fork controller.
//!
//! This crate provides the vocabulary every other Neptune crate speaks:
//!
//! - [`ChainId`], [`Account`], [`Fork`] and [`TabId`] for canonical controller state
//! - [`RpcRequest`] and [`RpcPayload`] for JSON-RPC traffic aimed at a fork
//! - [`Snapshot`] for the persisted state image
//! - URL derivation helpers in [`endpoints`]

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod account;
pub mod endpoints;
mod error;
mod fork;
mod rpc;
mod snapshot;

pub use account::{Account, ChainId, DEFAULT_CHAIN_ID, default_accounts};
pub use error::ErrorResponse;
pub use fork::{ConnectionChange, Fork, ForkId, TabId};
pub use rpc::{RpcPayload, RpcRequest};
pub use snapshot::Snapshot;

// Re-export commonly used external types
pub use url::Url;
