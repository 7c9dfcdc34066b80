//! JSON-RPC request shapes forwarded to the active fork.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON-RPC protocol version tag.
const JSONRPC_VERSION: &str = "2.0";

/// A single JSON-RPC request object.
///
/// The object is carried as-is: members are neither validated nor
/// normalized, so whatever the caller sent reaches the fork unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RpcRequest(Map<String, Value>);

impl RpcRequest {
    /// Create a `2.0` request with no id.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        let mut members = Map::new();
        members.insert("jsonrpc".into(), JSONRPC_VERSION.into());
        members.insert("method".into(), Value::String(method.into()));
        members.insert("params".into(), params);
        Self(members)
    }

    /// Set the request id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.0.insert("id".into(), id.into());
        self
    }

    /// Make the id member present, defaulting it to `null`.
    ///
    /// Fork servers reject requests without an `id` member but accept an
    /// explicit `null`. An existing id, `null` included, is left alone.
    #[must_use]
    pub fn with_default_id(mut self) -> Self {
        self.0.entry("id").or_insert(Value::Null);
        self
    }

    /// The `method` member, when it is a string.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        self.0.get("method").and_then(Value::as_str)
    }

    /// The `id` member, if present.
    #[must_use]
    pub fn id(&self) -> Option<&Value> {
        self.0.get("id")
    }

    /// Borrow the raw members.
    #[must_use]
    pub const fn members(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for RpcRequest {
    fn from(members: Map<String, Value>) -> Self {
        Self(members)
    }
}

/// One request or an ordered batch; the shape is preserved end to end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcPayload {
    /// A JSON array of requests.
    Batch(Vec<RpcRequest>),
    /// A single request object.
    Single(RpcRequest),
}

impl RpcPayload {
    /// Default every absent id to `null`, keeping the single/batch shape.
    #[must_use]
    pub fn with_default_ids(self) -> Self {
        match self {
            Self::Single(request) => Self::Single(request.with_default_id()),
            Self::Batch(requests) => Self::Batch(
                requests
                    .into_iter()
                    .map(RpcRequest::with_default_id)
                    .collect(),
            ),
        }
    }

    /// Number of request objects carried.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Batch(requests) => requests.len(),
        }
    }

    /// Whether this is an empty batch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the payload is a batch.
    #[must_use]
    pub const fn is_batch(&self) -> bool {
        matches!(self, Self::Batch(_))
    }
}

impl From<RpcRequest> for RpcPayload {
    fn from(request: RpcRequest) -> Self {
        Self::Single(request)
    }
}

impl From<Vec<RpcRequest>> for RpcPayload {
    fn from(requests: Vec<RpcRequest>) -> Self {
        Self::Batch(requests)
    }
}
