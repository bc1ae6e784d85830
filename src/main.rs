//! MySQL Read-Only MCP Server - Main entry point.
//!
//! Serves the read-only tool and resource surface over stdio (default) or
//! Streamable HTTP.

use mysql_readonly_mcp::config::{Cli, Config, TransportMode};
use mysql_readonly_mcp::db::{QueryExecutor, pool};
use mysql_readonly_mcp::logging::init_tracing;
use mysql_readonly_mcp::mcp::DbService;
use mysql_readonly_mcp::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse_with_env_file();

    init_tracing(&cli.log_level, cli.json_logs);

    let config = match Config::from_process(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            eprintln!("Error: {}", e);
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Hint: {}", suggestion);
            }
            std::process::exit(1);
        }
    };

    info!(
        mode = %config.mode(),
        transport = %config.transport,
        "Starting MySQL Read-Only MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let (pool, _identity) = match pool::connect(
        &config.database,
        config.max_connections,
        config.security.read_only,
    )
    .await
    {
        Ok(connected) => connected,
        Err(e) => {
            error!(error = %e, "Failed to connect to MySQL");
            eprintln!("Error: {}", e);
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Hint: {}", suggestion);
            }
            std::process::exit(1);
        }
    };

    let executor = Arc::new(QueryExecutor::new(pool, config.security.query_timeout));
    let service = DbService::new(
        executor,
        Arc::new(config.security.clone()),
        config.database.database.clone(),
    );

    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            StdioTransport::new(service).run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            HttpTransport::new(
                service,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            )
            .run()
            .await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
