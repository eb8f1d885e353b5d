// ── Core error types ──
//
// Domain-level errors. Transport failures from `hubsync-api` are folded
// into `FetchFailed` / `CommandFailed` so callers never match on HTTP
// details directly.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Missing access_token or app_id")]
    AuthorizationFailed { operation: String },

    #[error("Hub app rejected the access token (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("Device inventory fetch failed: {reason}")]
    FetchFailed { reason: String, transient: bool },

    #[error("Malformed {operation} request: {reason}")]
    MalformedRequest { operation: String, reason: String },

    #[error("Device command failed: {message}")]
    CommandFailed { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the next scheduled cycle may reasonably succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::FetchFailed { transient: true, .. })
    }
}

impl From<hubsync_api::Error> for CoreError {
    fn from(err: hubsync_api::Error) -> Self {
        match err {
            hubsync_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            hubsync_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS error: {msg}"),
            },
            hubsync_api::Error::Http {
                status: status @ (401 | 403),
                ..
            } => CoreError::Unauthorized { status },
            hubsync_api::Error::LocalHubUnavailable => CoreError::CommandFailed {
                message: "local commands enabled but no hub address is known".into(),
            },
            other => CoreError::FetchFailed {
                transient: other.is_transient(),
                reason: other.to_string(),
            },
        }
    }
}
