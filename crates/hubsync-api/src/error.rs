use thiserror::Error;

/// Top-level error type for the `hubsync-api` crate.
///
/// Covers every failure mode of the outbound surfaces: the cloud hub app
/// (inventory, direct-connect announce, cloud commands) and the local hub
/// event port. `hubsync-core` maps these into engine-level failures.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Hub app ─────────────────────────────────────────────────────
    /// The hub app answered with a non-success status.
    #[error("Hub app returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Local command routing was requested but no hub address is known.
    #[error("Local command routing requested but no hub address is known")]
    LocalHubUnavailable,

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying on the
    /// next cycle rather than surfacing to an operator.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns `true` if the hub app rejected the credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status: 401 | 403, .. })
    }
}
