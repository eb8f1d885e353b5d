// hubsync-api: Async client for the cloud hub app (device inventory + commands)

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::{HubClient, LOCAL_HUB_PORT, RoutingTarget};
pub use error::Error;
pub use models::{DeviceInventory, InventoryLocation, RemoteDevice};
pub use transport::{TlsMode, TransportConfig};
