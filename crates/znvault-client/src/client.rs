//! `ZnVault` HTTP client implementation.

use std::time::Duration;

use rand::Rng;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::VaultError;
use crate::types::{
    ApiErrorBody, DecryptedSecret, HealthStatus, ListQuery, NewSecret, Secret, SecretPage,
};
use crate::{ClientConfig, RETRY_BASE_DELAY, SecretBackend, ZnVault};

const USER_AGENT: &str = concat!("znvault-mcp/", env!("CARGO_PKG_VERSION"));

impl ZnVault {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Config` if the base URL or API key is missing, or
    /// the base URL is not an `http(s)` URL.
    #[allow(clippy::needless_pass_by_value)]
    pub fn with_config(cfg: ClientConfig) -> Result<Self, VaultError> {
        let api_key = cfg.api_key.trim();
        if api_key.is_empty() {
            return Err(VaultError::Config(
                "missing API key, set ZNVAULT_API_KEY".to_owned(),
            ));
        }

        let base_url = cfg.base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(VaultError::Config(
                "missing vault URL, set ZNVAULT_URL".to_owned(),
            ));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(VaultError::Config(format!(
                "vault URL must start with http:// or https://, got '{base_url}'"
            )));
        }

        let timeout = if cfg.timeout.is_zero() {
            crate::DEFAULT_TIMEOUT
        } else {
            cfg.timeout
        };

        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT);
        if cfg.insecure {
            warn!(url = %base_url, "TLS certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder.build().map_err(VaultError::Network)?;

        Ok(Self {
            api_key: api_key.to_owned(),
            base_url: base_url.to_owned(),
            max_retries: cfg.max_retries,
            client,
        })
    }

    /// The normalized base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // --- Private ---

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&'static str, String)],
        body: Option<&serde_json::Value>,
        resource: &str,
    ) -> Result<T, VaultError> {
        let url = format!("{}{path}", self.base_url);
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            debug!(method = %method, path, attempt, "vault request");

            let mut req = self
                .client
                .request(method.clone(), &url)
                .header("X-API-Key", &self.api_key);
            if !query.is_empty() {
                req = req.query(query);
            }
            if let Some(b) = body {
                req = req.json(b);
            }

            match req.send().await {
                Ok(resp) => {
                    let status = resp.status();

                    if status.is_success() {
                        let text = resp.text().await.map_err(VaultError::Network)?;
                        return serde_json::from_str(&text).map_err(VaultError::Json);
                    }

                    let error_text = resp.text().await.unwrap_or_default();
                    let msg = serde_json::from_str::<ApiErrorBody>(&error_text)
                        .ok()
                        .and_then(ApiErrorBody::into_message)
                        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

                    match status {
                        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                            return Err(VaultError::Auth(msg));
                        }
                        StatusCode::NOT_FOUND => {
                            return Err(VaultError::NotFound {
                                resource: resource.to_owned(),
                            });
                        }
                        StatusCode::CONFLICT => return Err(VaultError::Conflict(msg)),
                        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                            return Err(VaultError::Invalid(msg));
                        }
                        _ => {}
                    }

                    last_err = Some(if status == StatusCode::SERVICE_UNAVAILABLE {
                        VaultError::Unavailable(msg)
                    } else {
                        VaultError::Api {
                            status_code: status.as_u16(),
                            message: msg,
                        }
                    });

                    if attempt < self.max_retries && is_retryable(status) {
                        warn!(status = status.as_u16(), attempt, path, "retrying vault request");
                        tokio::time::sleep(backoff_delay(attempt)).await;
                        continue;
                    }
                }
                Err(e) => {
                    if e.is_timeout() {
                        last_err = Some(VaultError::Timeout);
                    } else {
                        last_err = Some(VaultError::Network(e));
                    }

                    if attempt < self.max_retries {
                        warn!(attempt, path, "vault request failed, retrying");
                        tokio::time::sleep(backoff_delay(attempt)).await;
                        continue;
                    }
                }
            }

            break;
        }

        Err(last_err.unwrap_or(VaultError::Api {
            status_code: 0,
            message: "unknown error".to_owned(),
        }))
    }
}

#[async_trait::async_trait]
impl SecretBackend for ZnVault {
    async fn secret_by_alias(&self, alias: &str) -> Result<Secret, VaultError> {
        let path = format!("/v1/secrets/alias/{}", encode_alias(path_safe(alias)?));
        self.request(Method::GET, &path, &[], None, alias).await
    }

    async fn secret_by_id(&self, id: &str) -> Result<Secret, VaultError> {
        let path = format!("/v1/secrets/{}", urlencoding::encode(path_safe(id)?));
        self.request(Method::GET, &path, &[], None, id).await
    }

    async fn decrypt(&self, id: &str) -> Result<DecryptedSecret, VaultError> {
        let path = format!("/v1/secrets/{}/decrypt", urlencoding::encode(path_safe(id)?));
        self.request(Method::POST, &path, &[], None, id).await
    }

    async fn list(&self, query: &ListQuery) -> Result<SecretPage, VaultError> {
        let pairs = query.to_query_pairs();
        self.request(Method::GET, "/v1/secrets", &pairs, None, "secrets")
            .await
    }

    async fn create(&self, secret: &NewSecret) -> Result<Secret, VaultError> {
        let body = serde_json::to_value(secret)?;
        self.request(Method::POST, "/v1/secrets", &[], Some(&body), &secret.alias)
            .await
    }

    async fn health(&self) -> Result<HealthStatus, VaultError> {
        self.request(Method::GET, "/v1/health", &[], None, "health")
            .await
    }
}

/// Percent-encode each `/`-separated alias segment, keeping the separators.
fn encode_alias(alias: &str) -> String {
    alias
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Exponential backoff from [`RETRY_BASE_DELAY`] with up to 30% added jitter.
fn backoff_delay(attempt: u32) -> Duration {
    let base = RETRY_BASE_DELAY.saturating_mul(2u32.saturating_pow(attempt));
    base.mul_f64(1.0 + rand::thread_rng().gen_range(0.0..0.3))
}

/// Whether any `/`-separated segment of `value` is `.` or `..`. Percent-encoded
/// dots (`%2e`) count as dots.
///
/// URL normalization collapses such segments, so an identifier containing one
/// would address a different route than the one it is interpolated into.
pub fn has_dot_segment(value: &str) -> bool {
    value.split('/').any(|segment| {
        let segment = segment.to_ascii_lowercase().replace("%2e", ".");
        segment == "." || segment == ".."
    })
}

fn path_safe(identifier: &str) -> Result<&str, VaultError> {
    if has_dot_segment(identifier) {
        return Err(VaultError::Invalid(format!(
            "identifier '{identifier}' contains a '.' or '..' path segment"
        )));
    }
    Ok(identifier)
}
