//! Default accessory host: one logging accessory per device.
//!
//! Stands in for a real accessory bridge. Each accessory observes the
//! attributes of its device's exposed capabilities and logs every refresh.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use hubsync_core::{
    AccessoryHost, AttributeObserver, DeviceId, DeviceRecord, ObserverHandle, Registrar,
};

pub struct LoggedAccessory {
    name: String,
}

impl AttributeObserver for LoggedAccessory {
    fn refresh(&self, device: &DeviceRecord, attribute: &str) {
        info!(
            accessory = %self.name,
            device_id = %device.device_id,
            attribute,
            value = %device.attribute(attribute).unwrap_or(&serde_json::Value::Null),
            "accessory refreshed"
        );
    }
}

#[derive(Default)]
pub struct LoggingHost {
    accessories: Mutex<HashMap<DeviceId, Arc<LoggedAccessory>>>,
}

impl LoggingHost {
    pub fn accessory_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<DeviceId, Arc<LoggedAccessory>>> {
        self.accessories
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn attach(&self, device: &DeviceRecord, registrar: &mut Registrar<'_>) -> usize {
        let mut accessories = self.lock();
        let accessory = accessories
            .entry(device.device_id.clone())
            .or_insert_with(|| {
                Arc::new(LoggedAccessory {
                    name: device.display_name().to_owned(),
                })
            });
        let handle = ObserverHandle::new(accessory);
        device
            .exposed_capabilities()
            .map(|capability| registrar.register_all(capability.attributes().iter().copied(), &handle))
            .sum()
    }
}

impl AccessoryHost for LoggingHost {
    fn create(&self, device: &Arc<DeviceRecord>, registrar: &mut Registrar<'_>) {
        let registered = self.attach(device, registrar);
        if registered == 0 {
            debug!(device_id = %device.device_id, "device exposes no supported capabilities");
        }
    }

    fn update(&self, device: &Arc<DeviceRecord>, registrar: &mut Registrar<'_>) {
        let registered = self.attach(device, registrar);
        debug!(device_id = %device.device_id, registered, "observers re-registered");
    }

    fn remove(&self, device: &DeviceRecord) {
        self.lock().remove(&device.device_id);
        debug!(
            device_id = %device.device_id,
            remaining = self.accessory_count(),
            "accessory removed"
        );
    }
}
