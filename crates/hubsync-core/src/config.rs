// ── Runtime engine configuration ──
//
// Built by the binary from the loaded config file; the core never reads
// files or the environment itself.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::model::{Capability, DeviceId, DeviceRecord};

/// Delay between an accepted `restartService` request and the restart signal.
pub const RESTART_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Period of the full inventory refresh.
    pub polling_interval: Duration,
    /// Attribute names never cached nor applied from push events.
    pub excluded_attributes: BTreeSet<String>,
    /// Per-device capabilities hidden from the accessory layer.
    pub excluded_capabilities: HashMap<DeviceId, BTreeSet<Capability>>,
    pub restart_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            polling_interval: Duration::from_secs(3600),
            excluded_attributes: BTreeSet::new(),
            excluded_capabilities: HashMap::new(),
            restart_delay: RESTART_DELAY,
        }
    }
}

impl EngineConfig {
    pub fn is_attribute_excluded(&self, attribute: &str) -> bool {
        self.excluded_attributes.contains(attribute)
    }

    /// Drop excluded attributes and attach per-device capability exclusions.
    pub fn apply_exclusions(&self, record: &mut DeviceRecord) {
        if !self.excluded_attributes.is_empty() {
            record
                .attributes
                .retain(|name, _| !self.excluded_attributes.contains(name));
        }
        if let Some(excluded) = self.excluded_capabilities.get(&record.device_id) {
            record.excluded_capabilities.clone_from(excluded);
        }
    }
}

/// Credentials every inbound request must echo back.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub access_token: SecretString,
    pub app_id: String,
}

impl IngestConfig {
    pub fn new(access_token: SecretString, app_id: impl Into<String>) -> Self {
        Self {
            access_token,
            app_id: app_id.into(),
        }
    }

    /// Exact match on both values; empty configured values never match.
    pub fn authorizes(&self, access_token: Option<&str>, app_id: Option<&str>) -> bool {
        let expected_token = self.access_token.expose_secret();
        match (access_token, app_id) {
            (Some(token), Some(app)) => {
                !expected_token.is_empty()
                    && !self.app_id.is_empty()
                    && token == expected_token
                    && app == self.app_id
            }
            _ => false,
        }
    }
}
