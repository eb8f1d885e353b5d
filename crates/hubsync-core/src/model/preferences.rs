// ── Routing preferences ──
//
// Process-wide settings the hub pushes to us: whether device commands go
// over the LAN, where the hub lives, and which temperature scale it uses.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum TemperatureUnit {
    #[default]
    #[strum(serialize = "F")]
    #[serde(rename = "F")]
    Fahrenheit,
    #[strum(serialize = "C")]
    #[serde(rename = "C")]
    Celsius,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingPreferences {
    pub local_commands: bool,
    pub local_hub_ip: Option<String>,
    pub temperature_unit: TemperatureUnit,
}

/// A partial preference change. Absent fields leave the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceUpdate {
    pub local_commands: Option<bool>,
    pub local_hub_ip: Option<String>,
}

impl PreferenceUpdate {
    /// Read `local_commands` / `local_hub_ip` from an `/updateprefs` body.
    ///
    /// Only a truthy `local_commands` switches local routing on; falsy
    /// values (`false`, `0`, `""`, `null`) are ignored like an absent field,
    /// so this endpoint never turns it off. An empty or non-string
    /// `local_hub_ip` is treated as absent.
    pub fn from_body(body: &Map<String, Value>) -> Self {
        Self {
            local_commands: body
                .get("local_commands")
                .filter(|v| truthy(v))
                .map(|_| true),
            local_hub_ip: body
                .get("local_hub_ip")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
        }
    }

    /// The preferences after this update, or `None` when nothing differs.
    pub fn apply_to(&self, current: &RoutingPreferences) -> Option<RoutingPreferences> {
        let mut next = current.clone();
        let mut changed = false;

        if let Some(local) = self.local_commands.filter(|l| *l != current.local_commands) {
            next.local_commands = local;
            changed = true;
        }
        if let Some(ip) = self
            .local_hub_ip
            .as_deref()
            .filter(|ip| current.local_hub_ip.as_deref() != Some(*ip))
        {
            next.local_hub_ip = Some(ip.to_owned());
            changed = true;
        }

        changed.then_some(next)
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.abs() > 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
