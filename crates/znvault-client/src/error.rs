//! Error types for the ZN-Vault backend client.

/// All errors that can occur when talking to the vault backend.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Missing or invalid client configuration.
    #[error("znvault config error: {0}")]
    Config(String),

    /// The requested secret does not exist (404).
    #[error("secret \"{resource}\" not found")]
    NotFound {
        /// The alias or id that was looked up.
        resource: String,
    },

    /// Authentication or authorization failed (401/403).
    #[error("znvault auth error: {0}")]
    Auth(String),

    /// The request conflicts with existing state, e.g. a duplicate alias (409).
    #[error("znvault conflict: {0}")]
    Conflict(String),

    /// The backend rejected the request body (400/422).
    #[error("znvault rejected request: {0}")]
    Invalid(String),

    /// Any other non-success HTTP status.
    #[error("znvault API error {status_code}: {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Error message from the API.
        message: String,
    },

    /// Request timed out after exhausting retries.
    #[error("znvault request timed out")]
    Timeout,

    /// Network or HTTP client error.
    #[error("znvault network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("znvault json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend is temporarily unable to serve the request (503).
    #[error("znvault unavailable: {0}")]
    Unavailable(String),
}

impl VaultError {
    /// Whether this error means the looked-up secret does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
