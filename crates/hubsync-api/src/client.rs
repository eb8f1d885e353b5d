// Hub app HTTP client
//
// Wraps `reqwest::Client` with the hub app's URL layout
// (`{app_url}{app_id}/...`, token in the query string) and the two
// command paths: the cloud endpoint and the hub's local event port.

use std::sync::{PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info, trace};
use url::Url;

use crate::error::Error;
use crate::models::DeviceInventory;
use crate::transport::TransportConfig;

/// Port the hub listens on for local (LAN) command events.
pub const LOCAL_HUB_PORT: u16 = 39500;

/// Where device commands are sent.
///
/// Mirrors the process-wide routing preference; updated through
/// [`HubClient::update_globals`] whenever the hub reports a change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTarget {
    pub hub_ip: Option<String>,
    pub use_local: bool,
}

/// Raw HTTP client for the cloud hub app.
pub struct HubClient {
    http: reqwest::Client,
    app_url: Url,
    app_id: String,
    access_token: SecretString,
    local_hub_port: u16,
    routing: RwLock<RoutingTarget>,
}

impl HubClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `app_url` is the hub app base (e.g. `https://graph.api.example.com/api/smartapps/installations/`);
    /// the `app_id` is appended as the first path segment of every request.
    pub fn new(
        app_url: &str,
        app_id: impl Into<String>,
        access_token: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        Ok(Self::with_client(
            transport.build_client()?,
            Url::parse(app_url)?,
            app_id,
            access_token,
        ))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        app_url: Url,
        app_id: impl Into<String>,
        access_token: SecretString,
    ) -> Self {
        Self {
            http,
            app_url,
            app_id: app_id.into(),
            access_token,
            local_hub_port: LOCAL_HUB_PORT,
            routing: RwLock::new(RoutingTarget::default()),
        }
    }

    /// Override the local hub event port (the hub firmware fixes it at
    /// [`LOCAL_HUB_PORT`]; tests point it at a mock server).
    pub fn with_local_hub_port(mut self, port: u16) -> Self {
        self.local_hub_port = port;
        self
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn app_url(&self) -> &Url {
        &self.app_url
    }

    /// The current command routing target.
    pub fn routing(&self) -> RoutingTarget {
        self.routing
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ── Routing preference ───────────────────────────────────────────

    /// Store the hub address and local/cloud preference used by
    /// [`send_device_command`](Self::send_device_command).
    pub fn update_globals(&self, hub_ip: Option<&str>, use_local: bool) {
        let target = RoutingTarget {
            hub_ip: hub_ip.map(str::to_owned),
            use_local,
        };
        debug!(hub_ip = ?target.hub_ip, use_local, "updating command routing");
        *self.routing.write().unwrap_or_else(PoisonError::into_inner) = target;
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Fetch the full device inventory.
    pub async fn get_devices(&self) -> Result<DeviceInventory, Error> {
        let url = self.app_path("devices")?;
        debug!("GET {}", redact(&url));
        let resp = self
            .http
            .get(url)
            .query(&[("access_token", self.access_token.expose_secret())])
            .send()
            .await?;
        parse_json(resp).await
    }

    /// Announce the direct-connect endpoint so the hub pushes events to it.
    pub async fn send_start_direct(&self, ip: &str, port: u16, version: &str) -> Result<(), Error> {
        let url = self.app_path(&format!("startDirect/{ip}/{port}/{version}"))?;
        debug!("POST {}", redact(&url));
        let resp = self
            .http
            .post(url)
            .query(&[("access_token", self.access_token.expose_secret())])
            .json(&json!({}))
            .send()
            .await?;
        ensure_success(resp).await?;
        info!(ip, port, "direct-connect endpoint announced to hub app");
        Ok(())
    }

    /// Send a command to a device, over the LAN when routing says so.
    pub async fn send_device_command(
        &self,
        device_id: &str,
        command: &str,
        values: &[Value],
    ) -> Result<(), Error> {
        let routing = self.routing();
        let resp = if routing.use_local {
            let hub_ip = routing.hub_ip.ok_or(Error::LocalHubUnavailable)?;
            let url = Url::parse(&format!("http://{hub_ip}:{}/event", self.local_hub_port))?;
            let source = format!("hubsync_{}", self.app_id);
            debug!(device_id, command, "POST {url} (local)");
            self.http
                .post(url)
                .header("evtSource", source.as_str())
                .header("evtType", "hkCommand")
                .json(&json!({
                    "deviceid": device_id,
                    "command": command,
                    "values": values,
                    "evtsource": source,
                    "evttype": "hkCommand",
                }))
                .send()
                .await?
        } else {
            let url = self.app_path(&format!("{device_id}/command/{command}"))?;
            debug!(device_id, command, "POST {} (cloud)", redact(&url));
            self.http
                .post(url)
                .query(&[("access_token", self.access_token.expose_secret())])
                .json(&json!({ "values": values }))
                .send()
                .await?
        };
        ensure_success(resp).await
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{app_url}{app_id}/{path}`
    fn app_path(&self, path: &str) -> Result<Url, Error> {
        let base = self.app_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{}/{path}", self.app_id))?)
    }
}

// ── Response helpers ─────────────────────────────────────────────────

async fn ensure_success(resp: reqwest::Response) -> Result<(), Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    Err(Error::Http {
        status: status.as_u16(),
        body: preview(&body).to_owned(),
    })
}

async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(Error::Http {
            status: status.as_u16(),
            body: preview(&body).to_owned(),
        });
    }
    trace!(bytes = body.len(), "response body received");
    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body,
    })
}

fn preview(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(200)
        .map_or(body.len(), |(idx, _)| idx);
    &body[..end]
}

/// URL without its query string, for logging.
fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}
