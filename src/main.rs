//! OTRS MCP server.
//!
//! This binary runs as an MCP server using stdio transport, exposing an
//! OTRS GenericTicketConnector webservice as tools.
//!
//! # Configuration
//!
//! Set the following environment variables (or use a `.env` file):
//!
//! - `OTRS_SERVER`: Base URL of your OTRS instance
//! - `OTRS_LOGIN` / `OTRS_PASSWORD`: Agent credentials
//! - `OTRS_WEBSERVICE`: Webservice name (optional)
//!
//! # Usage
//!
//! ```bash
//! OTRS_SERVER=https://otrs.example.com OTRS_LOGIN=agent OTRS_PASSWORD=xxx ./otrs
//! ```

use anyhow::{Context, Result};
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::{fmt, EnvFilter};

use otrs::error::OtrsError;
use otrs::{config, connector, server};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore errors if not found)
    dotenvy::dotenv().ok();

    // stdout is reserved for MCP JSON-RPC messages
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("otrs=info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting OTRS MCP server v{}", env!("CARGO_PKG_VERSION"));

    let config = config::Config::from_env().context("Failed to load configuration")?;

    tracing::debug!(server = %config.server, webservice = %config.webservice, "Configuration loaded");

    let mut connector = connector::GenericTicketConnector::from_config(&config)
        .context("Failed to create OTRS connector")?;

    tracing::debug!(endpoint = %connector.endpoint(), "Connector initialized");

    // A session doubles as the connectivity check.
    tracing::info!("Creating OTRS session...");
    if let Err(e) = connector.session_create(&config.login, &config.password).await {
        tracing::error!(
            error = %OtrsError::sanitize_message(&e.to_string(), &config.password),
            "Session creation failed"
        );
        tracing::warn!(
            "Server will start and authenticate each request with OTRS_LOGIN/OTRS_PASSWORD. \
             Check configuration and network connectivity."
        );
    }

    let server = server::OtrsServer::new(connector);

    tracing::info!("Server initialized, starting stdio transport");

    let service = server
        .serve(stdio())
        .await
        .inspect_err(|e| {
            tracing::error!("serving error: {:?}", e);
        })
        .context("Failed to start server")?;

    tracing::info!("Server running, waiting for requests");

    service
        .waiting()
        .await
        .context("Server error during operation")?;

    tracing::info!("Server shutting down");

    Ok(())
}
