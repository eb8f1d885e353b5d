// Wire types for the hub app's `devices` endpoint.
//
// The hub app is loose about types: device ids arrive as strings or
// numbers, capabilities as an object keyed by name or as a plain list.
// These types absorb that looseness so the core only sees clean values.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Response body of `GET {app_url}{app_id}/devices`.
///
/// `device_list` is `None` when the hub answered without a `deviceList`
/// array (error payloads, maintenance pages decoded as JSON). That is not
/// the same as an empty inventory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceInventory {
    #[serde(rename = "deviceList", default, deserialize_with = "device_array")]
    pub device_list: Option<Vec<RemoteDevice>>,
    #[serde(default)]
    pub location: Option<InventoryLocation>,
}

/// Hub location block: temperature scale and local routing hints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryLocation {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub temperature_scale: Option<String>,
    #[serde(rename = "hubIP", default)]
    pub hub_ip: Option<String>,
    /// Kept raw: only a JSON `true` enables local commands.
    #[serde(default)]
    pub local_commands: Option<Value>,
}

impl InventoryLocation {
    /// Whether the hub asked for commands to go over the local network.
    pub fn local_commands(&self) -> bool {
        matches!(self.local_commands, Some(Value::Bool(true)))
    }
}

/// A single device as the hub app reports it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteDevice {
    #[serde(rename = "deviceid", default, deserialize_with = "lenient_string")]
    pub device_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default)]
    pub basename: Option<String>,
    #[serde(rename = "manufacturerName", default)]
    pub manufacturer_name: Option<String>,
    #[serde(rename = "modelName", default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "lastTime", default)]
    pub last_time: Option<String>,
    #[serde(default, deserialize_with = "capability_names")]
    pub capabilities: Vec<String>,
    #[serde(default, deserialize_with = "command_names")]
    pub commands: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub attributes: BTreeMap<String, Value>,
}

// ── Lenient field decoders ──────────────────────────────────────────

/// Only a JSON array counts as a device list.
fn device_array<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Vec<RemoteDevice>>, D::Error> {
    match Value::deserialize(de)? {
        Value::Array(items) => serde_json::from_value(Value::Array(items))
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

/// `null` becomes the type's default.
fn null_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

fn lenient_string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

/// Accepts `{"Switch": 1, ...}`, `["Switch", ...]` or `null`.
fn capability_names<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
    Ok(names_of(Value::deserialize(de)?))
}

fn command_names<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
    Ok(names_of(Value::deserialize(de)?))
}

fn names_of(value: Value) -> Vec<String> {
    let mut names: Vec<String> = match value {
        Value::Object(map) => map.into_iter().map(|(k, _)| k).collect(),
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    names.sort();
    names.dedup();
    names
}
