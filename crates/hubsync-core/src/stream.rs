// ── Device snapshot subscriptions ──

use std::sync::Arc;

use tokio::sync::watch;

use crate::model::DeviceRecord;

type Snapshot = Arc<Vec<Arc<DeviceRecord>>>;

/// A subscription to the cached device set.
///
/// Gives a point-in-time snapshot plus change notification through
/// [`changed`](Self::changed).
pub struct DeviceStream {
    current: Snapshot,
    receiver: watch::Receiver<Snapshot>,
}

impl DeviceStream {
    pub(crate) fn new(receiver: watch::Receiver<Snapshot>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation or on the last `changed()`.
    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    /// Wait for the next mutation. `None` once the engine is gone.
    pub async fn changed(&mut self) -> Option<Snapshot> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }
}
