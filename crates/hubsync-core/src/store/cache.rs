// ── Device cache ──
//
// Last-known record per device id. Records are handed out as shared
// `Arc` snapshots; mutation goes through `Arc::make_mut`, so a snapshot
// a reader already holds never changes under it.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::model::{DeviceId, DeviceRecord};

#[derive(Debug, Default)]
pub struct DeviceCache {
    devices: HashMap<DeviceId, Arc<DeviceRecord>>,
}

impl DeviceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Arc<DeviceRecord>> {
        self.devices.get(id).cloned()
    }

    /// Insert or replace. Records with a blank id are refused.
    pub fn put(&mut self, record: DeviceRecord) -> Option<Arc<DeviceRecord>> {
        if record.device_id.is_empty() {
            return None;
        }
        let record = Arc::new(record);
        self.devices
            .insert(record.device_id.clone(), Arc::clone(&record));
        Some(record)
    }

    /// Returns `true` if the device was present.
    pub fn remove(&mut self, id: &str) -> bool {
        self.devices.remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.devices.contains_key(id)
    }

    pub fn keys(&self) -> BTreeSet<DeviceId> {
        self.devices.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Copy-on-write access to a cached record.
    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut DeviceRecord> {
        self.devices.get_mut(id).map(Arc::make_mut)
    }

    /// All records, ordered by id.
    pub fn snapshot(&self) -> Vec<Arc<DeviceRecord>> {
        let mut records: Vec<_> = self.devices.values().cloned().collect();
        records.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        records
    }
}
