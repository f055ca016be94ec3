//! Error types for the secret tools.
//!
//! Every failure a tool call can hit ends up as one of these, and every one
//! of them is rendered into a failure envelope. None of them carry secret
//! payload data.

use znvault_client::VaultError;

/// Caller input violated a declared constraint. Raised before any backend call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The arguments were not a JSON object.
    #[error("arguments must be a JSON object")]
    NotAnObject,

    /// A required parameter was absent or null.
    #[error("missing required parameter: {field}")]
    Missing { field: &'static str },

    /// A string parameter was empty.
    #[error("parameter '{field}' must not be empty")]
    Empty { field: &'static str },

    /// An identifier had a `.` or `..` path segment.
    #[error("parameter '{field}' must not contain '.' or '..' path segments")]
    DotSegment { field: &'static str },

    /// A parameter had the wrong JSON type.
    #[error("parameter '{field}' must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    /// A parameter named no member of its enumeration.
    #[error("parameter '{field}' must be one of [{allowed}], got '{value}'")]
    InvalidChoice {
        field: &'static str,
        value: String,
        allowed: String,
    },

    /// An integer parameter that must be positive was not.
    #[error("parameter '{field}' must be a positive integer, got {value}")]
    NotPositive { field: &'static str, value: i64 },

    /// An integer parameter was outside its bounds.
    #[error("parameter '{field}' must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

/// Any failure of a tool call.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The input was rejected before reaching the backend.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// The backend found no matching secret.
    #[error("{0}")]
    NotFound(VaultError),

    /// Any other backend failure: conflict, permission denial, transport.
    #[error("{0}")]
    Backend(VaultError),

    /// No tool is registered under this name.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

impl From<VaultError> for ToolError {
    fn from(err: VaultError) -> Self {
        if err.is_not_found() {
            Self::NotFound(err)
        } else {
            Self::Backend(err)
        }
    }
}

impl ToolError {
    /// Short label used as the `kind` field in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Backend(_) => "backend",
            Self::UnknownTool(_) => "unknown_tool",
        }
    }
}
