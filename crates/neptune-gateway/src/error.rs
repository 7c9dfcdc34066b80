//! Error types for the fork server client.

use neptune_core::ErrorResponse;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// HTTP error information captured from reqwest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpErrorInfo {
    /// Error message.
    pub message: String,
    /// HTTP status code (if available).
    pub status_code: Option<u16>,
    /// Whether the error was a timeout.
    pub is_timeout: bool,
    /// Whether the error was a connection failure.
    pub is_connect: bool,
}

impl From<reqwest::Error> for HttpErrorInfo {
    fn from(err: reqwest::Error) -> Self {
        Self {
            message: err.to_string(),
            status_code: err.status().map(|status| status.as_u16()),
            is_timeout: err.is_timeout(),
            is_connect: err.is_connect(),
        }
    }
}

/// Error type for gateway operations.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// HTTP/network error.
    #[error("HTTP error: {}", .0.message)]
    Http(HttpErrorInfo),

    /// Non-success response status.
    #[error("HTTP status {status} with body: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: StatusCode,
        /// Response body (truncated if needed).
        body: String,
    },

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(String),

    /// The fork server answered without a fork id.
    #[error("Failed to create fork: {response}")]
    ForkCreationFailed {
        /// Response body (truncated if needed).
        response: String,
    },

    /// `eth_blockNumber` returned something that is not a hex quantity.
    #[error("Invalid block number: {0}")]
    InvalidBlockNumber(String),

    /// JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(HttpErrorInfo::from(err))
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl GatewayError {
    /// Stable wire code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Http(info) if info.is_timeout => "NEP-3002",
            Self::Http(_) => "NEP-3001",
            Self::HttpStatus { .. } => "NEP-3003",
            Self::Json(_) => "NEP-3004",
            Self::ForkCreationFailed { .. } => "NEP-3005",
            Self::InvalidBlockNumber(_) => "NEP-3006",
            Self::Rpc { .. } => "NEP-3007",
        }
    }

    /// Whether the fork server could not be reached at all.
    #[must_use]
    pub const fn is_unreachable(&self) -> bool {
        matches!(self, Self::Http(info) if info.is_connect || info.is_timeout)
    }

    /// Convert to wire response format.
    #[must_use]
    pub fn to_response(&self) -> ErrorResponse {
        let response = ErrorResponse::new(self.code(), self.to_string());
        match self {
            Self::HttpStatus { status, .. } => {
                response.with_details(serde_json::json!({ "status_code": status.as_u16() }))
            }
            Self::Rpc { code, .. } => response.with_details(serde_json::json!({ "rpc_code": code })),
            _ => response,
        }
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_has_its_own_code() {
        let info = HttpErrorInfo {
            message: "timed out".into(),
            status_code: None,
            is_timeout: true,
            is_connect: false,
        };
        let err = GatewayError::Http(info);
        assert_eq!(err.code(), "NEP-3002");
        assert!(err.is_unreachable());
    }

    #[test]
    fn test_status_error_carries_status_detail() {
        let err = GatewayError::HttpStatus {
            status: StatusCode::BAD_GATEWAY,
            body: "upstream down".into(),
        };
        let response = err.to_response();
        assert_eq!(response.code, "NEP-3003");
        assert_eq!(response.details, Some(serde_json::json!({ "status_code": 502 })));
        assert!(!err.is_unreachable());
    }
}
