// ── Cache + index under one lock ──
//
// The engine wraps `SyncState` in a single `Mutex`. Every method here is
// synchronous, so a reconciliation pass and an attribute change can never
// interleave.

use std::sync::Arc;

use tracing::trace;

use super::{AttributeIndex, DeviceCache};
use crate::model::{DeviceRecord, IncomingAttributeChange};

#[derive(Default)]
pub struct SyncState {
    pub(crate) cache: DeviceCache,
    pub(crate) index: AttributeIndex,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &DeviceCache {
        &self.cache
    }

    pub fn index(&self) -> &AttributeIndex {
        &self.index
    }

    /// Cache a record and give it an index entry.
    pub fn put_device(&mut self, record: DeviceRecord) -> Option<Arc<DeviceRecord>> {
        let stored = self.cache.put(record)?;
        self.index.ensure_device(&stored.device_id);
        Some(stored)
    }

    /// Drop a record together with all of its observer registrations.
    pub fn remove_device(&mut self, id: &str) -> Option<Arc<DeviceRecord>> {
        let removed = self.cache.get(id);
        self.cache.remove(id);
        self.index.purge_device(id);
        removed
    }

    /// Write one attribute and refresh the observers registered for it.
    ///
    /// Returns the number of observers refreshed, or `None` when the device
    /// is not cached (nothing is written in that case).
    pub fn apply_change(&mut self, change: &IncomingAttributeChange) -> Option<usize> {
        let record = self.cache.get_mut(change.device_id.as_str())?;
        record
            .attributes
            .insert(change.attribute.clone(), change.value.clone());

        let snapshot = self.cache.get(change.device_id.as_str())?;
        let observers = self
            .index
            .lookup(change.device_id.as_str(), &change.attribute);
        for observer in &observers {
            observer.refresh(&snapshot, &change.attribute);
        }
        trace!(
            device_id = %change.device_id,
            attribute = %change.attribute,
            observers = observers.len(),
            "attribute change applied"
        );
        Some(observers.len())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::host::{AttributeObserver, ObserverHandle};
    use crate::model::DeviceId;

    #[derive(Default)]
    struct Probe {
        values: Mutex<Vec<serde_json::Value>>,
    }

    impl AttributeObserver for Probe {
        fn refresh(&self, device: &DeviceRecord, attribute: &str) {
            let value = device.attribute(attribute).cloned().unwrap_or_default();
            self.values.lock().unwrap().push(value);
        }
    }

    fn change(device: &str, attribute: &str, value: serde_json::Value) -> IncomingAttributeChange {
        IncomingAttributeChange {
            device_id: DeviceId::new(device),
            attribute: attribute.into(),
            value,
            timestamp: None,
            display_name: None,
        }
    }

    #[test]
    fn remove_cascades_to_index() {
        let mut state = SyncState::new();
        state.put_device(DeviceRecord::new("d1", "Lamp"));
        let probe = Arc::new(Probe::default());
        state
            .index
            .register_observer(&DeviceId::new("d1"), "switch", ObserverHandle::new(&probe));

        assert!(state.remove_device("d1").is_some());
        assert!(state.cache.get("d1").is_none());
        assert_eq!(state.index.observer_count("d1"), 0);
        assert!(!state.index.contains_device("d1"));
    }

    #[test]
    fn change_refreshes_only_matching_observers() {
        let mut state = SyncState::new();
        state.put_device(DeviceRecord::new("d1", "Lamp").with_attribute("switch", json!("off")));
        let on_switch = Arc::new(Probe::default());
        let on_level = Arc::new(Probe::default());
        let id = DeviceId::new("d1");
        state
            .index
            .register_observer(&id, "switch", ObserverHandle::new(&on_switch));
        state
            .index
            .register_observer(&id, "level", ObserverHandle::new(&on_level));

        assert_eq!(state.apply_change(&change("d1", "switch", json!("on"))), Some(1));

        assert_eq!(*on_switch.values.lock().unwrap(), vec![json!("on")]);
        assert!(on_level.values.lock().unwrap().is_empty());
        assert_eq!(
            state.cache.get("d1").unwrap().attribute("switch"),
            Some(&json!("on"))
        );
    }

    #[test]
    fn change_for_unknown_device_writes_nothing() {
        let mut state = SyncState::new();
        assert_eq!(state.apply_change(&change("ghost", "switch", json!("on"))), None);
        assert!(state.cache.is_empty());
    }

    #[test]
    fn change_without_observers_still_writes() {
        let mut state = SyncState::new();
        state.put_device(DeviceRecord::new("d1", "Lamp"));
        assert_eq!(state.apply_change(&change("d1", "battery", json!(80))), Some(0));
        assert_eq!(state.cache.get("d1").unwrap().attribute("battery"), Some(&json!(80)));
    }
}
