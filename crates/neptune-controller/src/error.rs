//! Controller error types.
//!
//! Codes follow the `NEP-xxxx` ranges:
//! - NEP-1xxx: bus errors (see `neptune_bus::BusError`)
//! - NEP-2xxx: fork state errors
//! - NEP-3xxx: network errors (see `neptune_gateway::GatewayError`)
//! - NEP-9xxx: internal errors

use neptune_bus::{BusError, ChannelName};
use neptune_core::ErrorResponse;
use neptune_gateway::GatewayError;
use thiserror::Error;

/// Error type for controller operations.
#[derive(Debug, Clone, Error)]
pub enum ControllerError {
    /// An RPC request arrived while no fork is selected.
    #[error("No active fork")]
    NoActiveFork,

    /// Bootstrapping a fork needs an upstream chain endpoint.
    #[error("No provider rpc url set")]
    NoProviderConfigured,

    /// A URL failed to parse.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected input.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// Fork server or upstream chain failure.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Bus request failure.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// Forwarding a JSON-RPC payload to the active fork failed.
    #[error("RPC forwarding failed: {0}")]
    Rpc(GatewayError),

    /// Persistent store failure.
    #[error("Store error: {0}")]
    Store(String),

    /// The fork refused to backtrack.
    #[error("Backtrack failed: {0}")]
    BacktrackFailed(String),

    /// A sync task ended without producing an outcome.
    #[error("Sync aborted: {0}")]
    SyncAborted(String),
}

impl ControllerError {
    /// Build an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Stable wire code.
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            Self::NoActiveFork => "NEP-2001".into(),
            Self::NoProviderConfigured => "NEP-2002".into(),
            Self::InvalidUrl { .. } => "NEP-2003".into(),
            Self::BacktrackFailed(_) => "NEP-2004".into(),
            Self::Gateway(err) | Self::Rpc(err) => err.code().into(),
            Self::Bus(err) => err.code(),
            Self::Store(_) => "NEP-9001".into(),
            Self::SyncAborted(_) => "NEP-9002".into(),
        }
    }

    /// Convert to wire response format.
    #[must_use]
    pub fn to_response(&self) -> ErrorResponse {
        match self {
            Self::Bus(err) => err.to_response(),
            Self::InvalidUrl { url, .. } => ErrorResponse::new(self.code(), self.to_string())
                .with_details(serde_json::json!({ "url": url })),
            _ => ErrorResponse::new(self.code(), self.to_string()),
        }
    }

    /// Report this failure as the answer of a bus handler.
    #[must_use]
    pub fn into_bus_error(self, channel: ChannelName) -> BusError {
        match self {
            Self::Bus(err) => err,
            other => BusError::handler(channel, other.code(), other.to_string()),
        }
    }
}

impl From<std::io::Error> for ControllerError {
    fn from(err: std::io::Error) -> Self {
        Self::Store(err.to_string())
    }
}

/// Result type for controller operations.
pub type ControllerResult<T> = Result<T, ControllerError>;
