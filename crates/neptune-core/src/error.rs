//! Wire-level error representation.
//!
//! Error codes use the `NEP-xxxx` scheme:
//! - NEP-1xxx: Message bus errors
//! - NEP-2xxx: Fork state errors
//! - NEP-3xxx: Fork server / network errors
//! - NEP-9xxx: Internal errors

use serde::{Deserialize, Serialize};

/// Wire format for error responses crossing a context boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g. `NEP-2001`).
    pub code: String,

    /// Human-readable message.
    pub message: String,

    /// Structured details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Create an error response without details.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Attach structured details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}
