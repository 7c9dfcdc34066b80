//! Shared fixtures for controller tests.

#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use neptune_bus::MessageBus;
use neptune_controller::{ControllerConfig, MemoryStore, NeptuneController};
use neptune_core::{Account, Fork, Url};
use neptune_gateway::{CreateForkParams, ForkGateway, GatewayError, GatewayResult};
use parking_lot::Mutex;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static TRACING: Once = Once::new();

/// Route controller logs to the test harness. `RUST_LOG` overrides the filter.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,neptune_controller=debug"));
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_test_writer().compact())
            .try_init();
    });
}

/// Block reported by [`FakeGateway::latest_block`].
pub const LATEST_BLOCK: u64 = 12345;

/// In-memory fork server.
#[derive(Default)]
pub struct FakeGateway {
    forks: Mutex<Vec<Fork>>,
    list_error: Mutex<Option<GatewayError>>,
    list_delay: Mutex<Option<Duration>>,
    created: Mutex<Vec<CreateForkParams>>,
    impersonations: Mutex<Vec<(String, Vec<Account>)>>,
    list_calls: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_forks(forks: Vec<Fork>) -> Self {
        let gateway = Self::default();
        *gateway.forks.lock() = forks;
        gateway
    }

    pub fn fail_listing(&self, error: GatewayError) {
        *self.list_error.lock() = Some(error);
    }

    pub fn delay_listing(&self, delay: Duration) {
        *self.list_delay.lock() = Some(delay);
    }

    pub fn forks(&self) -> Vec<Fork> {
        self.forks.lock().clone()
    }

    pub fn created(&self) -> Vec<CreateForkParams> {
        self.created.lock().clone()
    }

    pub fn impersonations(&self) -> Vec<(String, Vec<Account>)> {
        self.impersonations.lock().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ForkGateway for FakeGateway {
    async fn available_forks(&self, _base: &Url) -> GatewayResult<Vec<Fork>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.list_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.list_error.lock().clone() {
            return Err(error);
        }
        Ok(self.forks())
    }

    async fn create_fork(&self, _base: &Url, params: CreateForkParams) -> GatewayResult<Fork> {
        let mut created = self.created.lock();
        let fork = Fork::new(format!("created-{}", created.len() + 1), params.name.clone());
        created.push(params);
        self.forks.lock().push(fork.clone());
        Ok(fork)
    }

    async fn delete_fork(&self, _base: &Url, fork: &Fork) -> GatewayResult<()> {
        self.forks.lock().retain(|f| f.id != fork.id);
        Ok(())
    }

    async fn latest_block(&self, _provider_rpc_url: &str) -> GatewayResult<u64> {
        Ok(LATEST_BLOCK)
    }

    async fn impersonate_all(&self, fork_rpc_url: &str, accounts: &[Account]) -> GatewayResult<()> {
        self.impersonations
            .lock()
            .push((fork_rpc_url.to_string(), accounts.to_vec()));
        Ok(())
    }
}

/// A controller wired to a fake gateway and an in-memory store.
pub struct Harness {
    pub controller: Arc<NeptuneController>,
    pub bus: Arc<MessageBus>,
    pub gateway: Arc<FakeGateway>,
    pub store: Arc<MemoryStore>,
}

impl Harness {
    pub fn new(gateway: FakeGateway) -> Self {
        Self::with(gateway, MemoryStore::new(), ControllerConfig::default())
    }

    pub fn with(gateway: FakeGateway, store: MemoryStore, config: ControllerConfig) -> Self {
        init_test_tracing();
        let bus = Arc::new(MessageBus::new());
        let gateway = Arc::new(gateway);
        let store = Arc::new(store);
        let controller =
            NeptuneController::new(config, bus.clone(), gateway.clone(), store.clone());
        controller.register_handlers();
        Self {
            controller,
            bus,
            gateway,
            store,
        }
    }
}

pub fn fork(id: &str) -> Fork {
    Fork::new(id, format!("Fork {id}"))
}
