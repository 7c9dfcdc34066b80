mod common;

use std::time::Duration;

use common::{FakeGateway, Harness, LATEST_BLOCK, fork};
use neptune_bus::channels::ActiveFork;
use neptune_controller::{ControllerError, SyncOutcome};
use neptune_gateway::{GatewayError, HttpErrorInfo};

fn with_provider(h: &Harness) {
    h.controller
        .set_provider_rpc_url(Some("https://eth.example"))
        .unwrap();
}

#[tokio::test]
async fn selects_first_available_when_no_fork() {
    let h = Harness::new(FakeGateway::with_forks(vec![fork("a"), fork("b")]));

    let outcome = h.controller.sync().await.unwrap();

    assert_eq!(outcome, SyncOutcome::Selected(fork("a")));
    assert_eq!(h.controller.fork(), Some(fork("a")));
}

#[tokio::test]
async fn replaces_fork_missing_from_server() {
    let h = Harness::new(FakeGateway::with_forks(vec![fork("a"), fork("b")]));
    h.controller.set_fork(Some(fork("gone"))).wait().await;

    let outcome = h.controller.sync().await.unwrap();

    assert_eq!(outcome, SyncOutcome::Selected(fork("a")));
    assert_eq!(h.controller.fork(), Some(fork("a")));
}

#[tokio::test]
async fn keeps_listed_fork() {
    let h = Harness::new(FakeGateway::with_forks(vec![fork("a"), fork("b")]));
    h.controller.set_fork(Some(fork("b"))).wait().await;

    let outcome = h.controller.sync().await.unwrap();

    assert_eq!(outcome, SyncOutcome::Unchanged);
    assert_eq!(h.controller.fork(), Some(fork("b")));
}

#[tokio::test]
async fn bootstraps_fork_from_upstream_head() {
    let h = Harness::new(FakeGateway::new());
    with_provider(&h);

    let outcome = h.controller.sync().await.unwrap();

    let SyncOutcome::Created(created) = outcome else {
        panic!("expected a created fork");
    };
    assert_eq!(created.name, format!("Mainnet @ block {LATEST_BLOCK}"));
    assert_eq!(created.name, "Mainnet @ block 12345");
    assert_eq!(h.controller.fork(), Some(created));

    let params = h.gateway.created();
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].provider_rpc_url.as_deref(), Some("https://eth.example"));
    assert_eq!(params[0].parent, None);
}

#[tokio::test]
async fn no_bootstrap_without_provider() {
    let h = Harness::new(FakeGateway::new());
    h.controller.set_fork(Some(fork("stale"))).wait().await;

    let outcome = h.controller.sync().await.unwrap();

    assert_eq!(outcome, SyncOutcome::NoForkAvailable);
    assert!(h.gateway.created().is_empty());
    assert_eq!(h.controller.fork(), Some(fork("stale")));
}

#[tokio::test]
async fn second_sync_changes_nothing() {
    let h = Harness::new(FakeGateway::new());
    with_provider(&h);
    let mut fork_changes = h.bus.subscribe::<ActiveFork>();

    let first = h.controller.sync().await.unwrap();
    let second = h.controller.sync().await.unwrap();

    assert!(matches!(first, SyncOutcome::Created(_)));
    assert_eq!(second, SyncOutcome::Unchanged);
    assert_eq!(h.gateway.created().len(), 1);
    assert_eq!(fork_changes.drain().len(), 1);
}

#[tokio::test]
async fn impersonates_accounts_on_active_fork() {
    let h = Harness::new(FakeGateway::with_forks(vec![fork("a")]));
    h.controller.set_fork(Some(fork("a"))).wait().await;
    let before = h.gateway.impersonations().len();

    h.controller.sync().await.unwrap();

    let impersonations = h.gateway.impersonations();
    assert_eq!(impersonations.len(), before + 1);
    assert_eq!(
        impersonations.last().map(|(url, _)| url.as_str()),
        Some("http://localhost:1738/forks/a")
    );
}

#[tokio::test]
async fn listing_failure_aborts_without_changes() {
    let gateway = FakeGateway::with_forks(vec![fork("a")]);
    gateway.fail_listing(GatewayError::Http(HttpErrorInfo {
        message: "connection refused".into(),
        status_code: None,
        is_timeout: false,
        is_connect: true,
    }));
    let h = Harness::new(gateway);
    h.controller.set_fork(Some(fork("b"))).wait().await;

    let err = h.controller.sync().await.unwrap_err();

    assert!(matches!(err, ControllerError::Gateway(GatewayError::Http(_))));
    assert_eq!(h.controller.fork(), Some(fork("b")));
}

#[tokio::test(start_paused = true)]
async fn concurrent_requests_share_one_follow_up() {
    let gateway = FakeGateway::with_forks(vec![fork("a")]);
    gateway.delay_listing(Duration::from_millis(50));
    let h = Harness::new(gateway);

    let (first, second, third) = tokio::join!(
        h.controller.sync(),
        h.controller.sync(),
        h.controller.sync()
    );

    assert_eq!(first.unwrap(), SyncOutcome::Selected(fork("a")));
    assert_eq!(second.unwrap(), SyncOutcome::Unchanged);
    assert_eq!(third.unwrap(), SyncOutcome::Unchanged);
    assert_eq!(h.gateway.list_calls(), 2);
}

#[tokio::test]
async fn sync_over_bus() {
    let h = Harness::new(FakeGateway::with_forks(vec![fork("a")]));

    h.bus.sync().await.unwrap();

    assert_eq!(h.controller.fork(), Some(fork("a")));
}
