//! Device-state synchronization engine between `hubsync-api` and the
//! accessory layer.
//!
//! The engine keeps a local cache of hub devices consistent with the hub
//! app's authoritative inventory through two inputs:
//!
//! - **Full reconciliation**: the [`Scheduler`] (or an inbound refresh
//!   request) pulls the whole inventory and [`SyncEngine::reconcile`]
//!   diffs it against the cache in three ordered passes: remove, update,
//!   create.
//!
//! - **Incremental updates**: [`IngestEndpoint`] accepts single attribute
//!   changes, writes them into the cached record and fans out to exactly
//!   the observers registered for that `(device, attribute)` pair.
//!
//! Cache and attribute index live together in one [`store::SyncState`]
//! behind a single synchronous lock, so a reconciliation pass and an
//! attribute change can never interleave.
//!
//! The accessory layer plugs in through [`AccessoryHost`]; observers are
//! held weakly via [`ObserverHandle`] and are purged with their device.

pub mod client;
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod host;
pub mod ingest;
pub mod model;
pub mod reconcile;
pub mod scheduler;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::HubApi;
pub use config::{EngineConfig, IngestConfig, RESTART_DELAY};
pub use engine::{ChangeOutcome, RefreshOutcome, SyncEngine};
pub use error::CoreError;
pub use host::{AccessoryHost, AttributeObserver, ObserverHandle, Registrar};
pub use ingest::{IngestEndpoint, IngestOperation, IngestStatus, RequestBody};
pub use reconcile::{ReconcilePlan, ReconcileReport};
pub use scheduler::Scheduler;
pub use store::{AttributeIndex, DeviceCache, SyncState};
pub use stream::DeviceStream;

pub use model::{
    AttributeValue, Attributes, Capability, DeviceId, DeviceRecord, IncomingAttributeChange,
    PreferenceUpdate, RoutingPreferences, TemperatureUnit,
};
