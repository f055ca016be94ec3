//! Backend client for the ZN-Vault secrets API.
//!
//! This crate defines the [`SecretBackend`] trait, the capability set the
//! MCP facade consumes, and two implementations:
//!
//! - [`ZnVault`]: HTTP client with per-request timeout and retry with backoff
//! - [`MemoryBackend`]: in-memory, for tests and offline development
//!
//! # Example
//!
//! ```rust,no_run
//! use znvault_client::{ClientConfig, SecretBackend, ZnVault};
//!
//! # async fn example() -> Result<(), znvault_client::VaultError> {
//! let client = ZnVault::with_config(ClientConfig {
//!     base_url: "https://vault.example.com".to_owned(),
//!     api_key: std::env::var("ZNVAULT_API_KEY").unwrap_or_default(),
//!     ..Default::default()
//! })?;
//! let secret = client.secret_by_alias("api/production/db").await?;
//! println!("{} is at version {}", secret.alias, secret.version);
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod memory;
mod types;

pub use client::has_dot_segment;
pub use error::VaultError;
pub use memory::{BackendCall, BackendOp, Fault, MemoryBackend};
pub use types::{
    DecryptedSecret, HealthStatus, ListQuery, NewSecret, Secret, SecretPage, SecretSubType,
    SecretType, UnknownVariant,
};

use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Configuration for the [`ZnVault`] client.
#[derive(Clone)]
pub struct ClientConfig {
    /// API base URL, e.g. `https://vault.example.com`.
    pub base_url: String,
    /// API key sent as `X-API-Key`.
    pub api_key: String,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    /// Request timeout. Default: 30 seconds.
    pub timeout: Duration,
    /// Max retry attempts after the first. Default: 3.
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            insecure: false,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("insecure", &self.insecure)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// ZN-Vault HTTP client.
pub struct ZnVault {
    api_key: String,
    base_url: String,
    max_retries: u32,
    client: reqwest::Client,
}

/// The secret operations a vault backend provides.
///
/// Every method is a single logical backend call. Retry and timeout policy
/// belong to the implementation; callers treat a returned error as final.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait SecretBackend: Send + Sync + 'static {
    /// Look up secret metadata by alias.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::NotFound`] if no secret has this alias.
    async fn secret_by_alias(&self, alias: &str) -> Result<Secret, VaultError>;

    /// Look up secret metadata by primary key.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::NotFound`] if no secret has this id.
    async fn secret_by_id(&self, id: &str) -> Result<Secret, VaultError>;

    /// Decrypt a secret's payload. The backend records this in its audit trail.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::NotFound`] or [`VaultError::Auth`] when the
    /// secret is missing or the caller may not decrypt it.
    async fn decrypt(&self, id: &str) -> Result<DecryptedSecret, VaultError>;

    /// List secret metadata matching a filter, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    async fn list(&self, query: &ListQuery) -> Result<SecretPage, VaultError>;

    /// Create a new secret.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Conflict`] if the alias is taken, or
    /// [`VaultError::Invalid`] if the backend rejects the request.
    async fn create(&self, secret: &NewSecret) -> Result<Secret, VaultError>;

    /// Report backend health.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable.
    async fn health(&self) -> Result<HealthStatus, VaultError>;
}
