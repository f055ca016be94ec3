//! MCP tool server for ZN-Vault.
//!
//! Exposes four secret operations (metadata lookup, decryption, listing,
//! creation) plus a health check as Model Context Protocol tools over stdio.
//!
//! The layers, from the wire inward:
//!
//! - [`server`]: JSON-RPC 2.0 framing on stdin/stdout
//! - [`tools`]: tool definitions, dispatch, and the typed operations
//! - [`params`]: argument validation into typed requests
//! - [`resolver`]: alias-first identifier resolution
//! - [`projection`]: the public shape of every result
//! - [`envelope`]: the success/failure wrapper every tool call returns
//!
//! Backend access goes through [`znvault_client::SecretBackend`], so the
//! whole stack runs unchanged against the in-memory backend in tests.

pub mod config;
pub mod envelope;
pub mod error;
pub mod params;
pub mod projection;
pub mod resolver;
pub mod server;
pub mod tools;

pub use envelope::ToolOutput;
pub use error::{ToolError, ValidationError};
pub use tools::SecretTools;
