//! The secret tools: typed operations, their MCP definitions, and dispatch.
//!
//! Each operation validates its arguments, talks to the backend, and projects
//! the result into its public shape. [`SecretTools::call`] wraps any of them
//! into a [`ToolOutput`], so no error escapes a tool call.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use znvault_client::SecretBackend;

use crate::envelope::ToolOutput;
use crate::error::ToolError;
use crate::params;
use crate::projection::{CreateConfirmation, HealthReport, ListResult, SecretMetadata, SecretPayload};
use crate::resolver;

pub const GET_SECRET: &str = "get_secret";
pub const DECRYPT_SECRET: &str = "decrypt_secret";
pub const LIST_SECRETS: &str = "list_secrets";
pub const CREATE_SECRET: &str = "create_secret";
pub const HEALTH_CHECK: &str = "health_check";

/// Secret operations over a backend.
///
/// Holds no state of its own besides the backend handle; concurrent calls
/// are independent.
pub struct SecretTools<B> {
    backend: B,
}

impl<B: SecretBackend> SecretTools<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Metadata for an alias or primary key. Never includes `data`.
    ///
    /// # Errors
    ///
    /// [`ToolError::Validation`] for a missing or empty `name`,
    /// [`ToolError::NotFound`] when neither lookup finds it.
    pub async fn fetch_metadata(&self, args: &Value) -> Result<SecretMetadata, ToolError> {
        let identifier = params::fetch_args(args)?;
        let resolved = resolver::resolve(&self.backend, &identifier).await?;
        debug!(identifier = identifier.as_str(), via = ?resolved.via, "secret resolved");
        Ok(SecretMetadata::from(&resolved.secret))
    }

    /// Decrypted payload for a primary key. Aliases are not resolved here.
    ///
    /// # Errors
    ///
    /// [`ToolError::Validation`] for a missing or empty `id`, otherwise
    /// whatever the backend reports.
    pub async fn decrypt(&self, args: &Value) -> Result<SecretPayload, ToolError> {
        let id = params::decrypt_args(args)?;
        info!(id = id.as_str(), "decrypting secret");
        let decrypted = self.backend.decrypt(id.as_str()).await?;
        Ok(SecretPayload::from(&decrypted))
    }

    /// One page of secret metadata.
    ///
    /// # Errors
    ///
    /// [`ToolError::Validation`] for out-of-range paging or an unknown type;
    /// the backend is not called in that case.
    pub async fn list(&self, args: &Value) -> Result<ListResult, ToolError> {
        let filter = params::list_args(args)?;
        let page = self.backend.list(&filter.to_query()).await?;
        Ok(ListResult::from(&page))
    }

    /// Create a secret.
    ///
    /// # Errors
    ///
    /// [`ToolError::Validation`] for bad input (including empty `data`),
    /// [`ToolError::Backend`] for an alias conflict or any other rejection.
    pub async fn create(&self, args: &Value) -> Result<CreateConfirmation, ToolError> {
        let request = params::create_args(args)?;
        let created = self.backend.create(&request.into_new_secret()).await?;
        info!(id = %created.id, alias = %created.alias, "secret created");
        Ok(CreateConfirmation::from(&created))
    }

    /// Backend health.
    ///
    /// # Errors
    ///
    /// Whatever the backend reports.
    pub async fn health(&self) -> Result<HealthReport, ToolError> {
        let status = self.backend.health().await?;
        Ok(HealthReport::from(&status))
    }

    /// Run the named tool and wrap its outcome in an envelope.
    pub async fn call(&self, name: &str, args: &Value) -> ToolOutput {
        match name {
            GET_SECRET => render(name, self.fetch_metadata(args).await),
            DECRYPT_SECRET => render(name, self.decrypt(args).await),
            LIST_SECRETS => render(name, self.list(args).await),
            CREATE_SECRET => render(name, self.create(args).await),
            HEALTH_CHECK => match self.health().await {
                Ok(report) => ToolOutput::success(&report),
                Err(e) => {
                    log_failure(name, &e);
                    ToolOutput::failure_json(&json!({
                        "status": "error",
                        "error": e.to_string(),
                        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                    }))
                }
            },
            _ => render::<()>(name, Err(ToolError::UnknownTool(name.to_owned()))),
        }
    }
}

fn render<T: Serialize>(tool: &str, result: Result<T, ToolError>) -> ToolOutput {
    match result {
        Ok(value) => {
            debug!(tool, "tool call succeeded");
            ToolOutput::success(&value)
        }
        Err(e) => {
            log_failure(tool, &e);
            ToolOutput::failure(&e)
        }
    }
}

fn log_failure(tool: &str, err: &ToolError) {
    match err {
        ToolError::Backend(_) => warn!(tool, kind = err.kind(), error = %err, "tool call failed"),
        _ => info!(tool, kind = err.kind(), error = %err, "tool call rejected"),
    }
}

/// MCP tool definition as listed by `tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// The five tools this server exposes.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    let secret_types = znvault_client::SecretType::ALL.map(znvault_client::SecretType::as_str);
    let sub_types = znvault_client::SecretSubType::ALL.map(znvault_client::SecretSubType::as_str);

    vec![
        ToolDefinition {
            name: GET_SECRET,
            description: "Get secret metadata by alias or ID. Returns metadata only, not the actual secret value.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "minLength": 1,
                        "description": "Secret alias (e.g., 'api/production/db') or UUID"
                    }
                },
                "required": ["name"]
            }),
        },
        ToolDefinition {
            name: DECRYPT_SECRET,
            description: "Decrypt and retrieve the actual secret data. This is a sensitive operation that will be logged in the audit trail.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "string",
                        "minLength": 1,
                        "description": "Secret ID (UUID)"
                    }
                },
                "required": ["id"]
            }),
        },
        ToolDefinition {
            name: LIST_SECRETS,
            description: "List secrets with optional filtering by type, tags, or alias prefix. Returns metadata only.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "type": {
                        "type": "string",
                        "enum": secret_types,
                        "description": "Filter by secret type"
                    },
                    "aliasPrefix": {
                        "type": "string",
                        "description": "Filter by alias prefix (e.g., 'api/' for all API secrets)"
                    },
                    "tags": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Filter by tags (all must match)"
                    },
                    "page": {
                        "type": "integer",
                        "minimum": 1,
                        "default": 1,
                        "description": "Page number"
                    },
                    "pageSize": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 100,
                        "default": 20,
                        "description": "Results per page (max 100)"
                    }
                }
            }),
        },
        ToolDefinition {
            name: CREATE_SECRET,
            description: "Create a new secret in the vault. Supports various types including credentials, settings, and opaque data.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "alias": {
                        "type": "string",
                        "minLength": 1,
                        "description": "Unique alias for the secret (e.g., 'api/production/db')"
                    },
                    "type": {
                        "type": "string",
                        "enum": secret_types,
                        "description": "Secret type"
                    },
                    "subType": {
                        "type": "string",
                        "enum": sub_types,
                        "description": "Secret sub-type for more specific categorization"
                    },
                    "data": {
                        "type": "object",
                        "minProperties": 1,
                        "description": "Secret data as key-value pairs (will be encrypted)"
                    },
                    "tags": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Tags for categorization"
                    },
                    "expiresAt": {
                        "type": "string",
                        "description": "Expiration date in ISO 8601 format"
                    }
                },
                "required": ["alias", "type", "data"]
            }),
        },
        ToolDefinition {
            name: HEALTH_CHECK,
            description: "Check the vault server health and connectivity. Returns server status, version, and component health.",
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
    ]
}
