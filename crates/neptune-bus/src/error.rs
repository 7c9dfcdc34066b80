//! Message bus error types.

use neptune_core::ErrorResponse;
use thiserror::Error;

use crate::ChannelName;

/// Error type for bus operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// Nobody answered the request.
    #[error("No responder on channel '{channel}'")]
    ChannelUnavailable {
        /// Channel the request was sent on.
        channel: ChannelName,
    },

    /// The responder ran and failed.
    #[error("Handler on channel '{channel}' failed: {message}")]
    Handler {
        /// Channel the request was sent on.
        channel: ChannelName,
        /// Wire code reported by the responder.
        code: String,
        /// Failure description.
        message: String,
    },

    /// A payload could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(String),
}

impl BusError {
    /// Build a handler failure.
    pub fn handler(
        channel: ChannelName,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Handler {
            channel,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Stable wire code.
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            Self::ChannelUnavailable { .. } => "NEP-1001".into(),
            Self::Handler { code, .. } => code.clone(),
            Self::Codec(_) => "NEP-1002".into(),
        }
    }

    /// Convert to wire response format.
    #[must_use]
    pub fn to_response(&self) -> ErrorResponse {
        let message = match self {
            Self::Handler { message, .. } => message.clone(),
            other => other.to_string(),
        };
        let response = ErrorResponse::new(self.code(), message);
        match self {
            Self::ChannelUnavailable { channel } | Self::Handler { channel, .. } => {
                response.with_details(serde_json::json!({ "channel": channel }))
            }
            Self::Codec(_) => response,
        }
    }
}

impl From<serde_json::Error> for BusError {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

/// Result type for bus operations.
pub type BusResult<T> = Result<T, BusError>;
