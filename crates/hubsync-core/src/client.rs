// ── Outbound hub seam ──
//
// The engine talks to the hub app only through `HubApi`, so tests can
// drive full cycles with an in-memory fake.

use std::future::Future;

use serde_json::Value;

use hubsync_api::{DeviceInventory, HubClient};

pub trait HubApi: Send + Sync + 'static {
    fn get_devices(&self) -> impl Future<Output = Result<DeviceInventory, hubsync_api::Error>> + Send;

    fn send_start_direct(
        &self,
        ip: &str,
        port: u16,
        version: &str,
    ) -> impl Future<Output = Result<(), hubsync_api::Error>> + Send;

    fn send_device_command(
        &self,
        device_id: &str,
        command: &str,
        values: &[Value],
    ) -> impl Future<Output = Result<(), hubsync_api::Error>> + Send;

    /// Push the command routing preference down to the transport.
    fn update_globals(&self, hub_ip: Option<&str>, use_local: bool);
}

impl HubApi for HubClient {
    fn get_devices(&self) -> impl Future<Output = Result<DeviceInventory, hubsync_api::Error>> + Send {
        HubClient::get_devices(self)
    }

    fn send_start_direct(
        &self,
        ip: &str,
        port: u16,
        version: &str,
    ) -> impl Future<Output = Result<(), hubsync_api::Error>> + Send {
        HubClient::send_start_direct(self, ip, port, version)
    }

    fn send_device_command(
        &self,
        device_id: &str,
        command: &str,
        values: &[Value],
    ) -> impl Future<Output = Result<(), hubsync_api::Error>> + Send {
        HubClient::send_device_command(self, device_id, command, values)
    }

    fn update_globals(&self, hub_ip: Option<&str>, use_local: bool) {
        HubClient::update_globals(self, hub_ip, use_local);
    }
}
