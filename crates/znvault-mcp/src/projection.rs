//! Public shapes of tool results.
//!
//! Each backend entity has exactly one projection into what a tool returns,
//! copied field by field. Nothing the backend adds to its records can reach
//! a caller unless it is named here, and only [`SecretPayload`] has a `data`
//! field.

use serde::Serialize;
use serde_json::{Map, Value};
use znvault_client::{
    DecryptedSecret, HealthStatus, Secret, SecretPage, SecretSubType, SecretType,
};

/// Secret metadata as returned by `get_secret` and `list_secrets`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretMetadata {
    pub id: String,
    pub alias: String,
    #[serde(rename = "type")]
    pub secret_type: SecretType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<SecretSubType>,
    pub version: u64,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Secret> for SecretMetadata {
    fn from(s: &Secret) -> Self {
        Self {
            id: s.id.clone(),
            alias: s.alias.clone(),
            secret_type: s.secret_type,
            sub_type: s.sub_type,
            version: s.version,
            tags: s.tags.clone(),
            file_name: s.file_name.clone(),
            expires_at: s.expires_at.clone(),
            created_at: s.created_at.clone(),
            updated_at: s.updated_at.clone(),
        }
    }
}

/// Metadata plus decrypted data. Only `decrypt_secret` produces this.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecretPayload {
    #[serde(flatten)]
    pub metadata: SecretMetadata,
    pub data: Map<String, Value>,
}

impl From<&DecryptedSecret> for SecretPayload {
    fn from(d: &DecryptedSecret) -> Self {
        Self {
            metadata: SecretMetadata::from(&d.secret),
            data: d.data.clone(),
        }
    }
}

/// One page of `list_secrets` results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult {
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
    pub items: Vec<SecretMetadata>,
}

impl From<&SecretPage> for ListResult {
    fn from(p: &SecretPage) -> Self {
        Self {
            total: p.total,
            page: p.page,
            page_size: p.page_size,
            total_pages: p.total_pages,
            items: p.items.iter().map(SecretMetadata::from).collect(),
        }
    }
}

/// Confirmation returned by `create_secret`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConfirmation {
    pub success: bool,
    pub id: String,
    pub alias: String,
    #[serde(rename = "type")]
    pub secret_type: SecretType,
    pub version: u64,
    pub created_at: String,
}

impl From<&Secret> for CreateConfirmation {
    fn from(s: &Secret) -> Self {
        Self {
            success: true,
            id: s.id.clone(),
            alias: s.alias.clone(),
            secret_type: s.secret_type,
            version: s.version,
            created_at: s.created_at.clone(),
        }
    }
}

/// Backend health, passed through.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub checks: Value,
}

impl From<&HealthStatus> for HealthReport {
    fn from(h: &HealthStatus) -> Self {
        Self {
            status: h.status.clone(),
            version: h.version.clone(),
            uptime: h.uptime,
            timestamp: h.timestamp.clone(),
            checks: h.checks.clone(),
        }
    }
}
