//! Neptune Gateway - HTTP access to the fork server and upstream chains.
//!
//! This crate provides:
//! - The [`ForkGateway`] seam the controller talks through.
//! - [`ForkServerClient`], its reqwest implementation: fork listing, creation
//!   and deletion, latest-block lookup and account impersonation.
//! - [`GatewayError`] with stable `NEP-3xxx` wire codes.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod client;
mod error;
mod gateway;

pub use client::{ForkServerClient, ForkServerClientBuilder, GatewayConfig, truncate_body};
pub use error::{GatewayError, GatewayResult, HttpErrorInfo};
pub use gateway::{CreateForkParams, ForkGateway, impersonate_all_logged, mainnet_fork_name};
