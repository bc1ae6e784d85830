//! Stdio transport for the MCP server.
//!
//! This transport uses standard input/output for communication,
//! which is the standard mode for CLI-based MCP integrations.

use crate::error::{DbError, DbResult};
use crate::mcp::DbService;
use crate::transport::{Transport, wait_for_signal};
use rmcp::{ServiceExt, transport::stdio};
use tracing::{info, warn};

/// Stdio transport implementation.
///
/// This transport reads JSON-RPC messages from stdin and writes
/// responses to stdout as newline-delimited JSON-RPC.
pub struct StdioTransport {
    service: DbService,
}

impl StdioTransport {
    pub fn new(service: DbService) -> Self {
        Self { service }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> DbResult<()> {
        info!("Starting MCP server with stdio transport");

        let running_service = self
            .service
            .clone()
            .serve(stdio())
            .await
            .map_err(|e| DbError::internal(format!("Failed to start stdio transport: {}", e)))?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(_quit_reason) => {
                        info!("Stdio transport completed normally");
                    }
                    Err(e) => {
                        warn!(error = %e, "Stdio transport error");
                        self.service.executor().close().await;
                        return Err(DbError::internal(format!("Stdio transport error: {}", e)));
                    }
                }
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            // Spawn a task to listen for second signal and force exit
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        info!("Closing database pool");
        self.service.executor().close().await;

        if shutdown_requested {
            // Force exit since stdio may still be blocking on stdin
            // tokio::select! cannot interrupt blocking stdin reads
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseMode, DatabaseSettings, SecurityPolicy};
    use crate::db::{QueryExecutor, pool};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_stdio_transport_creation() {
        let settings = DatabaseSettings::from_env(DatabaseMode::Development, |key| match key {
            "MYSQL_DEV_USER" => Some("reader".into()),
            "MYSQL_DEV_PASSWORD" => Some("pw".into()),
            _ => None,
        })
        .unwrap();
        let executor = Arc::new(QueryExecutor::new(
            pool::connect_lazy(&settings, 1, true),
            Duration::from_secs(1),
        ));
        let service = DbService::new(executor, Arc::new(SecurityPolicy::default()), None);
        let transport = StdioTransport::new(service);
        assert_eq!(transport.name(), "stdio");
    }
}
