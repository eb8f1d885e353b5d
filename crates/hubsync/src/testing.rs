//! In-memory hub app for unit tests.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use hubsync_api::DeviceInventory;
use hubsync_core::{EngineConfig, HubApi, IngestConfig, IngestEndpoint, SyncEngine};
use secrecy::SecretString;

use crate::host::LoggingHost;

#[derive(Default)]
pub struct FakeHub {
    pub inventory: Mutex<DeviceInventory>,
    pub fetches: AtomicUsize,
}

impl FakeHub {
    pub fn with_inventory(value: Value) -> Self {
        let hub = Self::default();
        if let Ok(inventory) = serde_json::from_value(value) {
            *hub.inventory.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = inventory;
        }
        hub
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl HubApi for FakeHub {
    fn get_devices(
        &self,
    ) -> impl Future<Output = Result<DeviceInventory, hubsync_api::Error>> + Send {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let inventory = self
            .inventory
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        async move { Ok(inventory) }
    }

    fn send_start_direct(
        &self,
        _ip: &str,
        _port: u16,
        _version: &str,
    ) -> impl Future<Output = Result<(), hubsync_api::Error>> + Send {
        async { Ok(()) }
    }

    fn send_device_command(
        &self,
        _device_id: &str,
        _command: &str,
        _values: &[Value],
    ) -> impl Future<Output = Result<(), hubsync_api::Error>> + Send {
        async { Ok(()) }
    }

    fn update_globals(&self, _hub_ip: Option<&str>, _use_local: bool) {}
}

pub struct Fixture {
    pub hub: Arc<FakeHub>,
    pub host: Arc<LoggingHost>,
    pub engine: SyncEngine<FakeHub>,
    pub endpoint: IngestEndpoint<FakeHub>,
}

pub fn fixture(inventory: Value) -> Fixture {
    let hub = Arc::new(FakeHub::with_inventory(inventory));
    let host = Arc::new(LoggingHost::default());
    let engine = SyncEngine::new(Arc::clone(&hub), host.clone(), EngineConfig::default());
    let endpoint = IngestEndpoint::new(
        engine.clone(),
        IngestConfig::new(SecretString::from("tok".to_string()), "app-1"),
    );
    Fixture {
        hub,
        host,
        engine,
        endpoint,
    }
}
