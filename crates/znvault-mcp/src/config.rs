//! Command-line and environment configuration.

use std::convert::Infallible;
use std::time::Duration;

use clap::Parser;
use znvault_client::ClientConfig;

/// ZN-Vault MCP server: exposes vault secrets as tools over stdio.
#[derive(Parser)]
#[command(
    name = "znvault-mcp",
    version,
    about = "MCP server exposing ZN-Vault secret operations to AI assistants",
    long_about = None,
    after_help = "Environment variables:\n  \
         ZNVAULT_URL           Vault API base URL\n  \
         ZNVAULT_API_KEY       API key\n  \
         ZNVAULT_INSECURE      Skip TLS certificate verification when \"true\"\n  \
         ZNVAULT_TIMEOUT_SECS  Request timeout in seconds\n  \
         ZNVAULT_RETRIES       Retry attempts for transient failures\n  \
         ZNVAULT_LOG_LEVEL     Log filter when RUST_LOG is unset",
)]
pub struct Cli {
    /// Vault API base URL.
    #[arg(long, env = "ZNVAULT_URL")]
    pub url: String,

    /// API key for the vault.
    #[arg(long, env = "ZNVAULT_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Skip TLS certificate verification. Only `true` enables it; any other
    /// value, including an empty one, leaves verification on.
    #[arg(
        long,
        env = "ZNVAULT_INSECURE",
        action = clap::ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true",
        value_parser = parse_insecure,
    )]
    pub insecure: bool,

    /// Per-request timeout in seconds.
    #[arg(long, env = "ZNVAULT_TIMEOUT_SECS", default_value = "30")]
    pub timeout_secs: u64,

    /// Retry attempts after the first for transient failures.
    #[arg(long, env = "ZNVAULT_RETRIES", default_value = "3")]
    pub retries: u32,

    /// Log filter, overridden by `RUST_LOG`.
    #[arg(long, env = "ZNVAULT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

fn parse_insecure(value: &str) -> Result<bool, Infallible> {
    Ok(value.trim().eq_ignore_ascii_case("true"))
}

impl Cli {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.url.clone(),
            api_key: self.api_key.clone(),
            insecure: self.insecure,
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.retries,
        }
    }
}
