use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use znvault_client::ZnVault;
use znvault_mcp::config::Cli;
use znvault_mcp::{SecretTools, server};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Stdout belongs to the protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let client = ZnVault::with_config(cli.client_config())
        .context("failed to configure vault client")?;
    info!(
        url = client.base_url(),
        version = env!("CARGO_PKG_VERSION"),
        "znvault-mcp starting"
    );

    server::run(SecretTools::new(client)).await
}
