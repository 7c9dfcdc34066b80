//! Neptune Controller - State reconciliation for local fork sessions.
//!
//! This crate provides:
//! - [`NeptuneController`], the single owner of accounts, chain id, active
//!   fork, fork server address, provider URL and tab connections. It serves
//!   every bus channel and persists each change through a [`Store`].
//! - Resynchronization with the fork server ([`NeptuneController::sync`]).
//! - JSON-RPC forwarding to the active fork ([`RpcForwarder`]).
//! - Bus-driven fork management for UI contexts ([`mutations`]).

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod config;
mod controller;
mod error;
pub mod mutations;
mod rpc;
mod store;
mod sync;
mod tasks;
mod wiring;

pub use config::{
    BASE_URL_ENV, ControllerConfig, PROVIDER_RPC_URL_ENV, REQUEST_TIMEOUT_ENV, STORE_PATH_ENV,
};
pub use controller::NeptuneController;
pub use error::{ControllerError, ControllerResult};
pub use rpc::RpcForwarder;
pub use store::{JsonFileStore, MemoryStore, Store};
pub use sync::SyncOutcome;
pub use tasks::{PendingImpersonation, PendingSync};
