// ── Full reconciliation ──
//
// Diffs a fetched inventory against the cache and applies the result in
// three ordered passes: remove, update, create. Runs entirely inside the
// state lock.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::host::{AccessoryHost, Registrar};
use crate::model::{DeviceId, DeviceRecord};
use crate::store::SyncState;

/// The three disjoint id sets of a diff, each sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcilePlan {
    pub to_create: Vec<DeviceId>,
    pub to_update: Vec<DeviceId>,
    pub to_remove: Vec<DeviceId>,
}

impl ReconcilePlan {
    pub fn compute(remote: &BTreeSet<DeviceId>, cached: &BTreeSet<DeviceId>) -> Self {
        Self {
            to_create: remote.difference(cached).cloned().collect(),
            to_update: remote.intersection(cached).cloned().collect(),
            to_remove: cached.difference(remote).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_remove.is_empty()
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub created: Vec<DeviceId>,
    pub updated: Vec<DeviceId>,
    pub removed: Vec<DeviceId>,
    /// Capability tags outside the recognized set, seen in this inventory.
    pub unknown_capabilities: BTreeSet<String>,
    /// Inventory entries dropped for having no device id.
    pub skipped: usize,
    pub cache_size: usize,
}

impl SyncState {
    /// Bring the cache in line with `records`, driving `host` for every
    /// created, updated and removed device.
    ///
    /// An empty `records` list removes every cached device.
    pub fn reconcile(
        &mut self,
        records: Vec<DeviceRecord>,
        host: &dyn AccessoryHost,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        let mut remote: BTreeMap<DeviceId, DeviceRecord> = BTreeMap::new();
        for record in records {
            if record.device_id.is_empty() {
                warn!(name = %record.name, "skipping inventory entry without a device id");
                report.skipped += 1;
                continue;
            }
            if let Some(previous) = remote.insert(record.device_id.clone(), record) {
                debug!(device_id = %previous.device_id, "duplicate inventory entry, keeping the last one");
            }
        }

        for record in remote.values() {
            report
                .unknown_capabilities
                .extend(record.unknown_capabilities().map(str::to_owned));
        }

        let remote_ids: BTreeSet<DeviceId> = remote.keys().cloned().collect();
        let plan = ReconcilePlan::compute(&remote_ids, &self.cache.keys());

        // Remove
        for id in &plan.to_remove {
            if let Some(record) = self.cache.get(id.as_str()) {
                host.remove(&record);
                info!(device_id = %id, name = %record.display_name(), "removing device");
            }
            self.remove_device(id.as_str());
        }
        report.removed = plan.to_remove;

        // Update
        for id in &plan.to_update {
            let Some(incoming) = remote.remove(id) else {
                continue;
            };
            let Some(cached) = self.cache.get_mut(id.as_str()) else {
                continue;
            };
            cached.merge_from(incoming);
            let Some(record) = self.cache.get(id.as_str()) else {
                continue;
            };
            // Capabilities may have changed: registrations start over.
            self.index.reset_device(id);
            let mut registrar = Registrar::new(id, &mut self.index);
            host.update(&record, &mut registrar);
        }
        report.updated = plan.to_update;

        // Create
        for id in &plan.to_create {
            let Some(incoming) = remote.remove(id) else {
                continue;
            };
            let Some(record) = self.put_device(incoming) else {
                continue;
            };
            let mut registrar = Registrar::new(id, &mut self.index);
            host.create(&record, &mut registrar);
            info!(
                device_id = %id,
                name = %record.display_name(),
                observers = registrar.registered(),
                "added device"
            );
        }
        report.created = plan.to_create;

        report.cache_size = self.cache.len();
        report
    }
}
