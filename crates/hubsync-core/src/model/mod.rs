// ── Domain model ──
//
// Canonical types shared by the cache, the reconciliation passes and the
// ingest path. Wire types from `hubsync-api` are converted into these in
// `crate::convert`.

pub mod capability;
pub mod change;
pub mod device;
pub mod preferences;

pub use capability::Capability;
pub use change::IncomingAttributeChange;
pub use device::{AttributeValue, Attributes, DeviceId, DeviceRecord};
pub use preferences::{PreferenceUpdate, RoutingPreferences, TemperatureUnit};
