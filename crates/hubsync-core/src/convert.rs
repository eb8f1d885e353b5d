// ── Wire -> domain conversion ──
//
// Turns `hubsync-api` inventory types into cache records and routing
// preferences.

use std::collections::BTreeSet;

use chrono::Utc;
use hubsync_api::{InventoryLocation, RemoteDevice};

use crate::config::EngineConfig;
use crate::model::{Capability, DeviceId, DeviceRecord, RoutingPreferences, TemperatureUnit};

impl From<RemoteDevice> for DeviceRecord {
    fn from(remote: RemoteDevice) -> Self {
        Self {
            device_id: DeviceId::new(remote.device_id.trim()),
            name: remote.name,
            label: remote.basename.filter(|s| !s.is_empty()),
            manufacturer: remote.manufacturer_name,
            model: remote.model_name,
            status: remote.status,
            last_activity: remote.last_time,
            capabilities: remote
                .capabilities
                .iter()
                .map(|tag| Capability::parse(tag))
                .collect(),
            commands: remote.commands.into_iter().collect(),
            attributes: remote.attributes.into_iter().collect(),
            excluded_capabilities: BTreeSet::new(),
            synced_at: Utc::now(),
        }
    }
}

/// Convert an inventory list, applying configured exclusions.
pub(crate) fn records_from_inventory(
    devices: Vec<RemoteDevice>,
    config: &EngineConfig,
) -> Vec<DeviceRecord> {
    devices
        .into_iter()
        .map(|remote| {
            let mut record = DeviceRecord::from(remote);
            config.apply_exclusions(&mut record);
            record
        })
        .collect()
}

/// Fold the inventory `location` block into the current preferences.
///
/// The temperature scale is taken whenever it parses. Routing is only
/// touched when the hub reports its address.
pub(crate) fn preferences_from_location(
    location: &InventoryLocation,
    current: &RoutingPreferences,
) -> RoutingPreferences {
    let mut next = current.clone();
    if let Some(unit) = location
        .temperature_scale
        .as_deref()
        .and_then(|s| s.trim().parse::<TemperatureUnit>().ok())
    {
        next.temperature_unit = unit;
    }
    if let Some(hub_ip) = location.hub_ip.as_deref().filter(|ip| !ip.is_empty()) {
        next.local_hub_ip = Some(hub_ip.to_owned());
        next.local_commands = location.local_commands();
    }
    next
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn remote(value: serde_json::Value) -> RemoteDevice {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn remote_device_becomes_record() {
        let record = DeviceRecord::from(remote(json!({
            "deviceid": " d1 ",
            "name": "Front Door",
            "basename": "Door Lock",
            "manufacturerName": "Acme",
            "capabilities": ["Lock", "Battery", "Flux Capacitor"],
            "commands": ["lock", "unlock"],
            "attributes": { "lock": "locked", "battery": 90 }
        })));

        assert_eq!(record.device_id.as_str(), "d1");
        assert_eq!(record.display_name(), "Door Lock");
        assert_eq!(record.manufacturer.as_deref(), Some("Acme"));
        assert!(record.capabilities.contains(&Capability::Lock));
        assert_eq!(record.unknown_capabilities().collect::<Vec<_>>(), ["Flux Capacitor"]);
        assert!(record.commands.contains("unlock"));
        assert_eq!(record.attribute("battery"), Some(&json!(90)));
    }

    #[test]
    fn location_without_hub_ip_keeps_routing() {
        let current = RoutingPreferences {
            local_commands: true,
            local_hub_ip: Some("10.0.0.2".into()),
            temperature_unit: TemperatureUnit::Fahrenheit,
        };
        let location: InventoryLocation =
            serde_json::from_value(json!({ "temperature_scale": "C" })).unwrap();

        let next = preferences_from_location(&location, &current);
        assert_eq!(next.temperature_unit, TemperatureUnit::Celsius);
        assert!(next.local_commands);
        assert_eq!(next.local_hub_ip.as_deref(), Some("10.0.0.2"));
    }

    #[test]
    fn location_with_hub_ip_sets_routing() {
        let location: InventoryLocation = serde_json::from_value(json!({
            "hubIP": "192.168.1.20",
            "local_commands": false
        }))
        .unwrap();

        let next = preferences_from_location(&location, &RoutingPreferences::default());
        assert_eq!(next.local_hub_ip.as_deref(), Some("192.168.1.20"));
        assert!(!next.local_commands);
    }
}
