// ── Engine-owned device state ──

mod cache;
mod index;
mod state;

pub use cache::DeviceCache;
pub use index::AttributeIndex;
pub use state::SyncState;
