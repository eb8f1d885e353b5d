// ── Out-of-band attribute events ──

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::device::{AttributeValue, DeviceId};

/// A single attribute delta pushed by the hub.
///
/// Ephemeral: applied to the cache and fanned out, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomingAttributeChange {
    pub device_id: DeviceId,
    pub attribute: String,
    pub value: AttributeValue,
    /// When the hub observed the change, if it said so. Logging only.
    pub timestamp: Option<DateTime<Utc>>,
    pub display_name: Option<String>,
}

impl IncomingAttributeChange {
    /// Decode the `change_*` fields of an `/update` body.
    ///
    /// `change_device` and `change_attribute` are required; `change_value`
    /// defaults to `null`. The error is a short human-readable reason.
    pub fn from_body(body: &Map<String, Value>) -> Result<Self, String> {
        let device_id = body
            .get("change_device")
            .and_then(scalar_string)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| "missing change_device".to_owned())?;
        let attribute = body
            .get("change_attribute")
            .and_then(scalar_string)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "missing change_attribute".to_owned())?;

        Ok(Self {
            device_id: DeviceId::new(device_id),
            attribute,
            value: body.get("change_value").cloned().unwrap_or(Value::Null),
            timestamp: body.get("change_date").and_then(parse_timestamp),
            display_name: body.get("change_name").and_then(scalar_string),
        })
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// RFC 3339 text or epoch milliseconds (number or numeric string).
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let millis = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => {
            if let Ok(ts) = DateTime::parse_from_rfc3339(s.trim()) {
                return Some(ts.with_timezone(&Utc));
            }
            s.trim().parse::<i64>().ok()
        }
        _ => None,
    }?;
    Utc.timestamp_millis_opt(millis).single()
}
