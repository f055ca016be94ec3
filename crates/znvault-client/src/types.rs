//! Wire types exchanged with the ZN-Vault API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level secret category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretType {
    Opaque,
    Credential,
    Setting,
}

impl SecretType {
    /// Every variant, in declaration order.
    pub const ALL: [Self; 3] = [Self::Opaque, Self::Credential, Self::Setting];

    /// The wire name of this type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Opaque => "opaque",
            Self::Credential => "credential",
            Self::Setting => "setting",
        }
    }
}

/// Finer-grained classification of a secret's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretSubType {
    Password,
    ApiKey,
    Token,
    Certificate,
    PrivateKey,
    Keypair,
    SshKey,
    File,
    Generic,
    Json,
    Yaml,
    Env,
    Properties,
    Toml,
}

impl SecretSubType {
    /// Every variant, in declaration order.
    pub const ALL: [Self; 14] = [
        Self::Password,
        Self::ApiKey,
        Self::Token,
        Self::Certificate,
        Self::PrivateKey,
        Self::Keypair,
        Self::SshKey,
        Self::File,
        Self::Generic,
        Self::Json,
        Self::Yaml,
        Self::Env,
        Self::Properties,
        Self::Toml,
    ];

    /// The wire name of this sub-type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::ApiKey => "api_key",
            Self::Token => "token",
            Self::Certificate => "certificate",
            Self::PrivateKey => "private_key",
            Self::Keypair => "keypair",
            Self::SshKey => "ssh_key",
            Self::File => "file",
            Self::Generic => "generic",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Env => "env",
            Self::Properties => "properties",
            Self::Toml => "toml",
        }
    }
}

/// A string that names no variant of the target enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant '{0}'")]
pub struct UnknownVariant(pub String);

impl FromStr for SecretType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.to_owned()))
    }
}

impl FromStr for SecretSubType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.to_owned()))
    }
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SecretSubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A secret record as returned by the API. Never carries payload data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    /// Backend-generated primary key.
    pub id: String,
    /// Human-chosen unique alias.
    pub alias: String,
    #[serde(rename = "type")]
    pub secret_type: SecretType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<SecretSubType>,
    /// Monotonic version number.
    pub version: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// ISO 8601 expiry timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 last-updated timestamp.
    pub updated_at: String,
}

/// A secret together with its decrypted key-value payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecryptedSecret {
    #[serde(flatten)]
    pub secret: Secret,
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// One page of a secret listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretPage {
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
    #[serde(default)]
    pub items: Vec<Secret>,
}

/// Filter and pagination for a secret listing.
///
/// Bounds on `page` and `page_size` are enforced by the caller before the
/// query is built; the client forwards them as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub secret_type: Option<SecretType>,
    pub alias_prefix: Option<String>,
    /// All tags must be present on a matching secret.
    pub tags: Vec<String>,
    pub page: u32,
    pub page_size: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            secret_type: None,
            alias_prefix: None,
            tags: Vec::new(),
            page: 1,
            page_size: 20,
        }
    }
}

impl ListQuery {
    /// Query-string pairs for the list endpoint. Empty filters are omitted.
    pub(crate) fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(5);
        if let Some(t) = self.secret_type {
            pairs.push(("type", t.as_str().to_owned()));
        }
        if let Some(prefix) = self.alias_prefix.as_deref().filter(|p| !p.is_empty()) {
            pairs.push(("aliasPrefix", prefix.to_owned()));
        }
        if !self.tags.is_empty() {
            pairs.push(("tags", self.tags.join(",")));
        }
        pairs.push(("page", self.page.to_string()));
        pairs.push(("pageSize", self.page_size.to_string()));
        pairs
    }
}

/// Body of a create-secret request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSecret {
    pub alias: String,
    #[serde(rename = "type")]
    pub secret_type: SecretType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<SecretSubType>,
    /// Key-value payload, encrypted by the backend.
    pub data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Health report passed through from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub uptime: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub checks: Value,
}

// --- Internal API response types ---

#[derive(Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: Option<Value>,
    pub message: Option<String>,
}

impl ApiErrorBody {
    /// Accepts `{"error": {"message": ..}}`, `{"message": ..}` and `{"error": ".."}`,
    /// in that order of preference.
    pub(crate) fn into_message(self) -> Option<String> {
        match self.error {
            Some(Value::Object(obj)) => obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .or(self.message),
            Some(Value::String(s)) => self.message.or(Some(s)),
            _ => self.message,
        }
    }
}
