// ── Attribute index ──
//
// (device id, attribute) -> observers that must refresh when that
// attribute changes. Handles are weak; the accessory layer owns its
// observers and the index never keeps one alive.

use std::collections::HashMap;
use std::sync::Arc;

use crate::host::{AttributeObserver, ObserverHandle};
use crate::model::DeviceId;

#[derive(Default)]
pub struct AttributeIndex {
    entries: HashMap<DeviceId, HashMap<String, Vec<ObserverHandle>>>,
}

impl AttributeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure a device has an (initially empty) entry.
    pub fn ensure_device(&mut self, device_id: &DeviceId) {
        self.entries.entry(device_id.clone()).or_default();
    }

    /// Register `handle` for `(device_id, attribute)`.
    ///
    /// Registering the same observer twice for one key is a no-op. Dead
    /// handles under that key are dropped first. Returns `true` if the
    /// handle was added.
    pub fn register_observer(
        &mut self,
        device_id: &DeviceId,
        attribute: &str,
        handle: ObserverHandle,
    ) -> bool {
        let handles = self
            .entries
            .entry(device_id.clone())
            .or_default()
            .entry(attribute.to_owned())
            .or_default();

        handles.retain(ObserverHandle::is_alive);
        if handles.iter().any(|h| h.same_observer(&handle)) {
            return false;
        }
        handles.push(handle);
        true
    }

    /// Live observers for a key, in registration order.
    pub fn lookup(&self, device_id: &str, attribute: &str) -> Vec<Arc<dyn AttributeObserver>> {
        self.entries
            .get(device_id)
            .and_then(|attrs| attrs.get(attribute))
            .map(|handles| handles.iter().filter_map(ObserverHandle::upgrade).collect())
            .unwrap_or_default()
    }

    /// Drop every registration of a device but keep its (now empty) entry.
    pub fn reset_device(&mut self, device_id: &DeviceId) {
        self.entries.insert(device_id.clone(), HashMap::new());
    }

    pub fn purge_device(&mut self, device_id: &str) -> bool {
        self.entries.remove(device_id).is_some()
    }

    pub fn contains_device(&self, device_id: &str) -> bool {
        self.entries.contains_key(device_id)
    }

    /// Number of live registrations across all attributes of a device.
    pub fn observer_count(&self, device_id: &str) -> usize {
        self.entries.get(device_id).map_or(0, |attrs| {
            attrs
                .values()
                .flatten()
                .filter(|h| h.is_alive())
                .count()
        })
    }

    pub fn device_count(&self) -> usize {
        self.entries.len()
    }
}
