//! Configuration for the hubsync service.
//!
//! A TOML file plus `HUBSYNC_*` environment overrides, credential
//! resolution, and translation into the runtime types of `hubsync-core`
//! and `hubsync-api`.

use std::collections::{BTreeSet, HashMap};
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use hubsync_api::{TlsMode, TransportConfig};
use hubsync_core::{Capability, DeviceId, EngineConfig, IngestConfig};

/// Prefix for environment overrides (`HUBSYNC_APP_ID`, ...).
pub const ENV_PREFIX: &str = "HUBSYNC_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("missing required setting '{field}'")]
    MissingField { field: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Hub app base URL; the app id is appended as a path segment.
    pub app_url: Option<String>,

    pub app_id: Option<String>,

    /// Access token (plaintext; prefer `access_token_env` or `HUBSYNC_ACCESS_TOKEN`).
    pub access_token: Option<String>,

    /// Name of an environment variable holding the access token.
    pub access_token_env: Option<String>,

    #[serde(default = "default_polling_seconds")]
    pub polling_seconds: u64,

    /// Carried for the hub app; the engine does not use it.
    #[serde(default = "default_update_seconds")]
    pub update_seconds: u64,

    #[serde(default = "default_direct_port")]
    pub direct_port: u16,

    /// Address announced to the hub. Detected when unset.
    pub direct_ip: Option<String>,

    #[serde(default)]
    pub excluded_attributes: Vec<String>,

    /// Device id -> capability names hidden for that device.
    #[serde(default)]
    pub excluded_capabilities: HashMap<String, Vec<String>>,

    /// Outbound request timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Extra CA certificate for the hub app endpoint.
    pub ca_cert: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_url: None,
            app_id: None,
            access_token: None,
            access_token_env: None,
            polling_seconds: default_polling_seconds(),
            update_seconds: default_update_seconds(),
            direct_port: default_direct_port(),
            direct_ip: None,
            excluded_attributes: Vec::new(),
            excluded_capabilities: HashMap::new(),
            timeout: default_timeout(),
            ca_cert: None,
        }
    }
}

fn default_polling_seconds() -> u64 {
    3600
}
fn default_update_seconds() -> u64 {
    30
}
fn default_direct_port() -> u16 {
    8000
}
fn default_timeout() -> u64 {
    30
}

// ── Config file path ────────────────────────────────────────────────

/// Platform config path, e.g. `~/.config/hubsync/config.toml`.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "hubsync", "hubsync").map_or_else(
        || PathBuf::from("hubsync.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load from `path` (or the platform default) merged with the environment.
///
/// A missing file is not an error; every field can come from the
/// environment instead.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    debug!(path = %path.display(), "loading configuration");

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed(ENV_PREFIX));

    Ok(figment.extract()?)
}

/// Serialize the config to TOML and write it to `path`.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(cfg)?)?;
    Ok(())
}

impl Config {
    /// TOML rendering with the access token masked.
    pub fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        let mut shown = self.clone();
        if shown.access_token.is_some() {
            shown.access_token = Some("********".into());
        }
        Ok(toml::to_string_pretty(&shown)?)
    }

    pub fn app_url(&self) -> Result<url::Url, ConfigError> {
        let raw = required(self.app_url.as_deref(), "app_url")?;
        raw.parse().map_err(|e| ConfigError::Validation {
            field: "app_url".into(),
            reason: format!("{e}: {raw}"),
        })
    }

    pub fn app_id(&self) -> Result<&str, ConfigError> {
        required(self.app_id.as_deref(), "app_id")
    }

    /// `access_token_env` first, then the plaintext / `HUBSYNC_ACCESS_TOKEN` value.
    pub fn access_token(&self) -> Result<SecretString, ConfigError> {
        if let Some(value) = self
            .access_token_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|v| !v.is_empty())
        {
            return Ok(SecretString::from(value));
        }
        required(self.access_token.as_deref(), "access_token")
            .map(|t| SecretString::from(t.to_owned()))
    }

    /// Check everything `run` needs before anything starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.app_url()?;
        self.app_id()?;
        self.access_token()?;
        if self.direct_port == 0 {
            return Err(ConfigError::Validation {
                field: "direct_port".into(),
                reason: "must be non-zero".into(),
            });
        }
        if let Some(ip) = &self.direct_ip {
            ip.parse::<IpAddr>().map_err(|e| ConfigError::Validation {
                field: "direct_ip".into(),
                reason: format!("{e}: {ip}"),
            })?;
        }
        Ok(())
    }

    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            polling_interval: Duration::from_secs(self.polling_seconds),
            excluded_attributes: self.excluded_attributes.iter().cloned().collect(),
            excluded_capabilities: self
                .excluded_capabilities
                .iter()
                .map(|(id, caps)| {
                    let caps: BTreeSet<Capability> =
                        caps.iter().map(|c| Capability::parse(c)).collect();
                    (DeviceId::new(id.as_str()), caps)
                })
                .collect(),
            ..EngineConfig::default()
        }
    }

    pub fn to_ingest_config(&self) -> Result<IngestConfig, ConfigError> {
        Ok(IngestConfig::new(self.access_token()?, self.app_id()?))
    }

    pub fn transport_config(&self) -> TransportConfig {
        let tls = self
            .ca_cert
            .clone()
            .map_or(TlsMode::System, TlsMode::CustomCa);
        TransportConfig {
            tls,
            ..TransportConfig::default()
        }
        .with_timeout(Duration::from_secs(self.timeout))
    }

    /// The address announced to the hub and bound by the listener.
    pub fn direct_ip(&self) -> IpAddr {
        self.direct_ip
            .as_deref()
            .and_then(|ip| ip.parse().ok())
            .or_else(detect_local_ip)
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, ConfigError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingField {
            field: field.into(),
        })
}

/// First non-loopback IPv4 address, found by asking the OS which source
/// address it would route an outbound datagram from. Nothing is sent.
fn detect_local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80)).ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_loopback() && !ip.is_unspecified()).then_some(ip)
}

#[cfg(test)]
mod tests {
    use figment::Jail;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn defaults_apply_without_a_file() {
        Jail::expect_with(|jail| {
            let cfg = load_config(Some(&jail.directory().join("absent.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(cfg.polling_seconds, 3600);
            assert_eq!(cfg.update_seconds, 30);
            assert_eq!(cfg.direct_port, 8000);
            assert_eq!(cfg.timeout, 30);
            assert!(cfg.app_id.is_none());
            Ok(())
        });
    }

    #[test]
    fn file_values_and_env_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "hubsync.toml",
                r#"
                app_url = "https://hub.example.com/api/installations/"
                app_id = "app-1"
                access_token = "from-file"
                polling_seconds = 600
                excluded_attributes = ["power"]

                [excluded_capabilities]
                d1 = ["Battery", "Switch Level"]
                "#,
            )?;
            jail.set_env("HUBSYNC_POLLING_SECONDS", "120");
            jail.set_env("HUBSYNC_ACCESS_TOKEN", "from-env");

            let cfg = load_config(Some(Path::new("hubsync.toml"))).map_err(|e| e.to_string())?;
            cfg.validate().map_err(|e| e.to_string())?;

            assert_eq!(cfg.polling_seconds, 120);
            assert_eq!(
                cfg.access_token().map_err(|e| e.to_string())?.expose_secret(),
                "from-env"
            );

            let engine = cfg.to_engine_config();
            assert_eq!(engine.polling_interval, Duration::from_secs(120));
            assert!(engine.is_attribute_excluded("power"));
            let d1 = &engine.excluded_capabilities[&DeviceId::new("d1")];
            assert!(d1.contains(&Capability::Battery));
            assert!(d1.contains(&Capability::SwitchLevel));
            Ok(())
        });
    }

    #[test]
    fn token_env_indirection_wins() {
        Jail::expect_with(|jail| {
            jail.set_env("MY_HUB_TOKEN", "indirect");
            let cfg = Config {
                access_token: Some("plain".into()),
                access_token_env: Some("MY_HUB_TOKEN".into()),
                ..Config::default()
            };
            assert_eq!(
                cfg.access_token().map_err(|e| e.to_string())?.expose_secret(),
                "indirect"
            );
            Ok(())
        });
    }

    #[test]
    fn missing_required_fields_are_reported() {
        let err = Config::default().validate().err();
        assert!(matches!(err, Some(ConfigError::MissingField { field }) if field == "app_url"));

        let cfg = Config {
            app_url: Some("not a url".into()),
            ..Config::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn explicit_direct_ip_is_used() {
        let cfg = Config {
            direct_ip: Some("192.168.1.50".into()),
            ..Config::default()
        };
        assert_eq!(cfg.direct_ip().to_string(), "192.168.1.50");
    }

    #[test]
    fn redacted_toml_hides_token() {
        let cfg = Config {
            access_token: Some("secret-token".into()),
            ..Config::default()
        };
        let rendered = cfg.to_redacted_toml().unwrap_or_default();
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("polling_seconds = 3600"));
    }

    #[test]
    fn save_then_load_from_disk() {
        Jail::expect_with(|jail| {
            let path = jail.directory().join("nested").join("config.toml");
            let cfg = Config {
                app_id: Some("app-9".into()),
                direct_port: 8123,
                ..Config::default()
            };
            save_config(&cfg, &path).map_err(|e| e.to_string())?;
            let loaded = load_config(Some(&path)).map_err(|e| e.to_string())?;
            assert_eq!(loaded.app_id.as_deref(), Some("app-9"));
            assert_eq!(loaded.direct_port, 8123);
            Ok(())
        });
    }
}
