//! Error type for the DAM client layer.

/// Errors from the DAM REST API and its OAuth layer.
#[derive(Debug, thiserror::Error)]
pub enum DamError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The DAM returned a non-2xx status code.
    #[error("DAM API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// Authentication failed or the session can no longer be renewed.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// A refresh was attempted on a manually supplied token. Manual
    /// tokens are never refreshed; hitting this is a programming error
    /// at the call site.
    #[error("refusing to refresh a manually supplied access token")]
    ManualTokenRefresh,

    /// The three-step presigned upload flow failed.
    #[error("Upload failed: {0}")]
    Upload(String),

    /// The response parsed but lacked a field the flow depends on.
    #[error("Unexpected response shape: {0}")]
    Decode(String),
}

impl DamError {
    /// HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            DamError::Api { status, .. } => Some(*status),
            DamError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True for connection-level failures (remote down, DNS, refused).
    pub fn is_connect(&self) -> bool {
        matches!(self, DamError::Request(e) if e.is_connect())
    }

    /// True for client-side request timeouts.
    pub fn is_timeout(&self) -> bool {
        matches!(self, DamError::Request(e) if e.is_timeout())
    }
}
