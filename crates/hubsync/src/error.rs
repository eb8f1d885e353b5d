//! CLI error types with miette diagnostics.

use miette::Diagnostic;
use thiserror::Error;

use hubsync_config::ConfigError;
use hubsync_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("Missing required setting '{field}'")]
    #[diagnostic(
        code(hubsync::missing_setting),
        help(
            "Set `{field}` in {path}\n\
             or export {env} in the service environment."
        )
    )]
    MissingSetting {
        field: String,
        env: String,
        path: String,
    },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(hubsync::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(hubsync::config))]
    Config(Box<figment::Error>),

    #[error("Hub app rejected the access token")]
    #[diagnostic(
        code(hubsync::auth_failed),
        help("Check `app_id` and `access_token` against the hub app's settings page.")
    )]
    AuthFailed,

    #[error("Could not reach the hub app: {reason}")]
    #[diagnostic(
        code(hubsync::hub_unavailable),
        help("Check `app_url` and network access; the next scheduled cycle retries.")
    )]
    HubUnavailable { reason: String },

    #[error("Device command failed: {message}")]
    #[diagnostic(code(hubsync::command_failed))]
    CommandFailed { message: String },

    #[error("Could not listen on {addr}")]
    #[diagnostic(
        code(hubsync::bind_failed),
        help("Another process may own the port; change `direct_port` or `direct_ip`.")
    )]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Restart requested by the hub app")]
    #[diagnostic(
        code(hubsync::restart),
        help("Exiting with status 1 so the service manager starts hubsync again.")
    )]
    RestartRequested,

    #[error("Internal error: {0}")]
    #[diagnostic(code(hubsync::internal))]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(hubsync::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingSetting { .. } | Self::Validation { .. } | Self::Config(_) => {
                exit_code::USAGE
            }
            Self::AuthFailed => exit_code::AUTH,
            Self::HubUnavailable { .. } | Self::Bind { .. } => exit_code::CONNECTION,
            Self::CommandFailed { message } if message.starts_with("unknown device") => {
                exit_code::NOT_FOUND
            }
            _ => exit_code::GENERAL,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingField { field } => CliError::MissingSetting {
                env: format!("{}{}", hubsync_config::ENV_PREFIX, field.to_uppercase()),
                path: hubsync_config::config_path().display().to_string(),
                field,
            },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Serialization(e) => CliError::Internal(e.to_string()),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::FetchFailed { reason, .. } => CliError::HubUnavailable { reason },
            CoreError::CommandFailed { message } => CliError::CommandFailed { message },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Unauthorized { .. } | CoreError::AuthorizationFailed { .. } => {
                CliError::AuthFailed
            }
            CoreError::MalformedRequest { reason, .. } | CoreError::Internal(reason) => {
                CliError::Internal(reason)
            }
        }
    }
}

impl From<hubsync_api::Error> for CliError {
    fn from(err: hubsync_api::Error) -> Self {
        CoreError::from(err).into()
    }
}
