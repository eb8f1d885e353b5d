// ── Device domain types ──

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::capability::Capability;

/// A single attribute value as the hub reports it (string, number, bool...).
pub type AttributeValue = serde_json::Value;

/// Attribute name -> current value. Ordered so snapshots are deterministic.
pub type Attributes = BTreeMap<String, AttributeValue>;

// ── DeviceId ────────────────────────────────────────────────────────

/// Stable hub-assigned device identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for DeviceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ── DeviceRecord ────────────────────────────────────────────────────

/// The last-known state of one hub device.
///
/// `attributes` is the single source of truth the accessory layer reads.
/// `device_id` is fixed at creation; [`merge_from`](Self::merge_from)
/// never touches it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub device_id: DeviceId,
    pub name: String,
    pub label: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub status: Option<String>,
    pub last_activity: Option<String>,
    pub capabilities: BTreeSet<Capability>,
    pub commands: BTreeSet<String>,
    pub attributes: Attributes,
    pub excluded_capabilities: BTreeSet<Capability>,
    pub synced_at: DateTime<Utc>,
}

impl DeviceRecord {
    /// A bare record with no capabilities or attributes.
    pub fn new(device_id: impl Into<DeviceId>, name: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            name: name.into(),
            label: None,
            manufacturer: None,
            model: None,
            status: None,
            last_activity: None,
            capabilities: BTreeSet::new(),
            commands: BTreeSet::new(),
            attributes: Attributes::new(),
            excluded_capabilities: BTreeSet::new(),
            synced_at: Utc::now(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Display name: the hub label when present, else the device name.
    pub fn display_name(&self) -> &str {
        self.label
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.name)
    }

    /// Recognized capabilities that are not excluded for this device.
    pub fn exposed_capabilities(&self) -> impl Iterator<Item = &Capability> {
        self.capabilities
            .iter()
            .filter(|c| c.is_known() && !self.excluded_capabilities.contains(*c))
    }

    /// Capability tags outside the recognized set.
    pub fn unknown_capabilities(&self) -> impl Iterator<Item = &str> {
        self.capabilities
            .iter()
            .filter(|c| !c.is_known())
            .map(Capability::name)
    }

    /// Fold a freshly fetched record into this one.
    ///
    /// Attributes merge shallowly: incoming keys are added or overwritten,
    /// keys missing from the incoming payload are kept. Descriptive fields
    /// take the incoming values.
    pub fn merge_from(&mut self, incoming: DeviceRecord) {
        let DeviceRecord {
            device_id: _,
            name,
            label,
            manufacturer,
            model,
            status,
            last_activity,
            capabilities,
            commands,
            attributes,
            excluded_capabilities,
            synced_at,
        } = incoming;

        self.name = name;
        self.label = label;
        self.manufacturer = manufacturer;
        self.model = model;
        self.status = status;
        self.last_activity = last_activity;
        self.capabilities = capabilities;
        self.commands = commands;
        self.excluded_capabilities = excluded_capabilities;
        self.attributes.extend(attributes);
        self.synced_at = synced_at;
    }
}
