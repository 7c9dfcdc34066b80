//! JSON-RPC forwarding to the active fork.

use std::time::Duration;

use neptune_core::RpcPayload;
use neptune_gateway::{GatewayError, truncate_body};
use reqwest::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use serde_json::Value;
use tracing::debug;

use crate::error::{ControllerError, ControllerResult};

/// Posts JSON-RPC payloads to a fork endpoint.
#[derive(Debug, Clone)]
pub struct RpcForwarder {
    http: reqwest::Client,
}

impl RpcForwarder {
    /// Create a forwarder with the given request timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http }
    }

    /// Forward `payload` and return the endpoint's JSON reply verbatim.
    ///
    /// Every request without an id is sent with `"id": null`; a batch stays
    /// a batch. JSON-RPC error objects in the reply are not inspected.
    pub async fn forward(
        &self,
        fork_rpc_url: &str,
        origin: &str,
        payload: RpcPayload,
    ) -> ControllerResult<Value> {
        let payload = payload.with_default_ids();
        debug!(
            fork_rpc_url,
            batch = payload.is_batch(),
            requests = payload.len(),
            "forwarding rpc payload"
        );
        let body = serde_json::to_vec(&payload).map_err(rpc_error)?;

        let response = self
            .http
            .post(fork_rpc_url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCESS_CONTROL_ALLOW_ORIGIN, origin)
            .body(body)
            .send()
            .await
            .map_err(rpc_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(rpc_error)?;

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(value),
            Err(_) if !status.is_success() => Err(ControllerError::Rpc(GatewayError::HttpStatus {
                status,
                body: truncate_body(&bytes),
            })),
            Err(err) => Err(rpc_error(err)),
        }
    }
}

fn rpc_error(err: impl Into<GatewayError>) -> ControllerError {
    ControllerError::Rpc(err.into())
}

#[cfg(test)]
mod tests {
    use neptune_core::RpcRequest;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn test_forward_sets_headers_and_null_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("content-type", "application/json"))
            .and(header("access-control-allow-origin", "http://localhost:1738"))
            .and(body_json(json!({"jsonrpc": "2.0", "method": "eth_chainId", "params": [], "id": null})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "0x1"})))
            .expect(1)
            .mount(&server)
            .await;

        let forwarder = RpcForwarder::new(Duration::from_secs(5));
        let payload = RpcRequest::new("eth_chainId", json!([])).into();
        let reply = forwarder
            .forward(&server.uri(), "http://localhost:1738", payload)
            .await
            .unwrap();

        assert_eq!(reply, json!({"result": "0x1"}));
    }

    #[tokio::test]
    async fn test_error_status_without_json_is_rpc_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let forwarder = RpcForwarder::new(Duration::from_secs(5));
        let payload = RpcRequest::new("eth_chainId", json!([])).into();
        let err = forwarder
            .forward(&server.uri(), "http://localhost:1738", payload)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ControllerError::Rpc(GatewayError::HttpStatus { .. })
        ));
    }
}
