// ── Inbound operations ──
//
// Transport-agnostic handlers for the requests the hub app pushes to us.
// Every operation authenticates against the configured `access_token` and
// `app_id` and answers with an `IngestStatus`; errors never escape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use tracing::{debug, info, warn};

use crate::client::HubApi;
use crate::config::IngestConfig;
use crate::engine::{ChangeOutcome, SyncEngine};
use crate::error::CoreError;
use crate::model::{IncomingAttributeChange, PreferenceUpdate};

/// A decoded JSON request body. Unparseable input is treated as empty.
pub type RequestBody = Map<String, Value>;

/// `/update` bodies with this many keys or fewer carry no change.
const MIN_UPDATE_KEYS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, AsRefStr)]
pub enum IngestOperation {
    #[strum(serialize = "initial")]
    Handshake,
    #[strum(serialize = "restartService")]
    Restart,
    #[strum(serialize = "refreshDevices")]
    TriggerRefresh,
    #[strum(serialize = "updateprefs")]
    UpdatePreferences,
    #[strum(serialize = "update")]
    AttributeChange,
}

impl IngestOperation {
    /// Every operation, in route order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }
}

/// Response body of every inbound operation: `{"status": "OK"}` or
/// `{"status": "Failed: <reason>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStatus {
    pub status: String,
}

impl IngestStatus {
    pub fn ok() -> Self {
        Self {
            status: "OK".into(),
        }
    }

    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self {
            status: format!("Failed: {reason}"),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }
}

pub struct IngestEndpoint<C: HubApi> {
    engine: SyncEngine<C>,
    config: IngestConfig,
}

impl<C: HubApi> Clone for IngestEndpoint<C> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            config: self.config.clone(),
        }
    }
}

impl<C: HubApi> IngestEndpoint<C> {
    pub fn new(engine: SyncEngine<C>, config: IngestConfig) -> Self {
        Self { engine, config }
    }

    pub fn engine(&self) -> &SyncEngine<C> {
        &self.engine
    }

    /// Authenticate and run one operation.
    pub fn handle(&self, operation: IngestOperation, body: &RequestBody) -> IngestStatus {
        match self.dispatch(operation, body) {
            Ok(()) => IngestStatus::ok(),
            Err(e) => {
                warn!(operation = %operation, error = %e, "inbound request rejected");
                IngestStatus::failed(e)
            }
        }
    }

    fn dispatch(&self, operation: IngestOperation, body: &RequestBody) -> Result<(), CoreError> {
        self.authorize(operation, body)?;
        match operation {
            IngestOperation::Handshake => {
                info!("hub communication established");
                Ok(())
            }
            IngestOperation::Restart => {
                self.engine.schedule_restart();
                Ok(())
            }
            IngestOperation::TriggerRefresh => {
                info!("hub requested a device refresh");
                self.engine.trigger_refresh();
                Ok(())
            }
            IngestOperation::UpdatePreferences => {
                info!("hub sent preference updates");
                self.engine
                    .apply_preference_update(&PreferenceUpdate::from_body(body));
                Ok(())
            }
            IngestOperation::AttributeChange => self.attribute_change(body),
        }
    }

    fn authorize(&self, operation: IngestOperation, body: &RequestBody) -> Result<(), CoreError> {
        let token = body.get("access_token").and_then(Value::as_str);
        let app_id = body.get("app_id").and_then(Value::as_str);
        if self.config.authorizes(token, app_id) {
            Ok(())
        } else {
            Err(CoreError::AuthorizationFailed {
                operation: operation.to_string(),
            })
        }
    }

    fn attribute_change(&self, body: &RequestBody) -> Result<(), CoreError> {
        if body.len() <= MIN_UPDATE_KEYS {
            return Ok(());
        }
        let change = IncomingAttributeChange::from_body(body).map_err(|reason| {
            CoreError::MalformedRequest {
                operation: IngestOperation::AttributeChange.to_string(),
                reason,
            }
        })?;
        info!(
            name = change.display_name.as_deref().unwrap_or("unknown"),
            attribute = %change.attribute.to_uppercase(),
            value = %change.value,
            "change event"
        );
        if let ChangeOutcome::UnknownDevice = self.engine.apply_attribute_change(&change) {
            debug!(device_id = %change.device_id, "no cached device for change event");
        }
        Ok(())
    }
}
