use neptune_core::{Account, Fork, Url};
use neptune_gateway::{CreateForkParams, ForkGateway, ForkServerClient, GatewayError};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn base_url(server: &MockServer) -> Url {
    Url::parse(&server.uri()).unwrap()
}

#[tokio::test]
async fn available_forks_lists_server_forks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "a", "name": "Fork A"},
            {"id": "b", "name": "Fork B"}
        ])))
        .mount(&server)
        .await;

    let client = ForkServerClient::new().unwrap();
    let forks = client.available_forks(&base_url(&server)).await.unwrap();

    assert_eq!(forks, vec![Fork::new("a", "Fork A"), Fork::new("b", "Fork B")]);
}

#[tokio::test]
async fn create_root_fork_prefunds_accounts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/forks"))
        .and(body_json(json!({
            "name": "Scratch",
            "config": {
                "eth_rpc_url": "https://eth.example",
                "prefund_anvil_accounts": true
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"fork_id": "f1"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ForkServerClient::new().unwrap();
    let params = CreateForkParams::new("Scratch", Some("https://eth.example".into()));
    let fork = client.create_fork(&base_url(&server), params).await.unwrap();

    assert_eq!(fork, Fork::new("f1", "Scratch"));
}

#[tokio::test]
async fn create_child_fork_references_parent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/forks"))
        .and(body_json(json!({
            "name": "Child",
            "config": {
                "eth_rpc_url": null,
                "parent_fork_id": "root",
                "prefund_anvil_accounts": false
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"fork_id": "child"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ForkServerClient::new().unwrap();
    let params = CreateForkParams::new("Child", None).with_parent(Fork::new("root", "Root"));
    let fork = client.create_fork(&base_url(&server), params).await.unwrap();

    assert_eq!(fork.id.as_str(), "child");
}

#[tokio::test]
async fn create_fork_without_id_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/forks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "no capacity"})))
        .mount(&server)
        .await;

    let client = ForkServerClient::new().unwrap();
    let err = client
        .create_fork(&base_url(&server), CreateForkParams::new("X", None))
        .await
        .unwrap_err();

    match err {
        GatewayError::ForkCreationFailed { response } => assert!(response.contains("no capacity")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn delete_fork_hits_fork_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/forks/f1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = ForkServerClient::new().unwrap();
    client
        .delete_fork(&base_url(&server), &Fork::new("f1", "Scratch"))
        .await
        .unwrap();
}

#[tokio::test]
async fn latest_block_decodes_hex() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "jsonrpc": "2.0",
            "method": "eth_blockNumber",
            "params": [],
            "id": 1
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": "0x3039"})),
        )
        .mount(&server)
        .await;

    let client = ForkServerClient::new().unwrap();
    assert_eq!(client.latest_block(&server.uri()).await.unwrap(), 12345);
}

#[tokio::test]
async fn latest_block_surfaces_rpc_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32000, "message": "header not found"}
        })))
        .mount(&server)
        .await;

    let client = ForkServerClient::new().unwrap();
    let err = client.latest_block(&server.uri()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Rpc { code: -32000, .. }));
}

#[tokio::test]
async fn fork_mainnet_latest_names_fork_after_block() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": "0x3039"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/forks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"fork_id": "m1"})))
        .mount(&server)
        .await;

    let client = ForkServerClient::new().unwrap();
    let provider = format!("{}/rpc", server.uri());
    let fork = client
        .fork_mainnet_latest(&base_url(&server), &provider)
        .await
        .unwrap();

    assert_eq!(fork, Fork::new("m1", "Mainnet @ block 12345"));
}

#[tokio::test]
async fn impersonate_all_sends_one_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/forks/f1"))
        .and(body_json(json!([
            {"jsonrpc": "2.0", "method": "anvil_impersonateAccount", "params": ["0x01"], "id": 1},
            {"jsonrpc": "2.0", "method": "anvil_impersonateAccount", "params": ["0x02"], "id": 2}
        ])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = ForkServerClient::new().unwrap();
    let fork_rpc_url = format!("{}/forks/f1", server.uri());
    client
        .impersonate_all(&fork_rpc_url, &[Account::new("0x01"), Account::new("0x02")])
        .await
        .unwrap();
}

#[tokio::test]
async fn server_liveness_follows_listing_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forks"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = ForkServerClient::new().unwrap();
    assert!(!client.is_server_running(&base_url(&server)).await);

    let up = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&up)
        .await;
    assert!(client.is_server_running(&base_url(&up)).await);
}
