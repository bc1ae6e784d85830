//! Streamable HTTP transport.
//!
//! Sessions are served by rmcp's `StreamableHttpService` mounted on an axum
//! router. Every session receives a clone of the same [`DbService`], so they
//! all share one pool.

use crate::error::{DbError, DbResult};
use crate::mcp::DbService;
use crate::transport::{Transport, wait_for_signal};
use axum::Router;
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// How long open streams may keep the server alive after the first signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpTransport {
    service: DbService,
    host: String,
    port: u16,
    /// Path the MCP service is mounted on; `/` serves every path.
    endpoint: String,
}

impl HttpTransport {
    pub fn new(
        service: DbService,
        host: impl Into<String>,
        port: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            service,
            host: host.into(),
            port,
            endpoint: endpoint.into(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn router(&self) -> Router {
        let session_service = self.service.clone();
        let mcp = StreamableHttpService::new(
            move || Ok(session_service.clone()),
            LocalSessionManager::default().into(),
            Default::default(),
        );

        // axum refuses to nest at "/"
        match self.endpoint.as_str() {
            "/" | "" => Router::new().fallback_service(mcp),
            path => Router::new().nest_service(path, mcp),
        }
    }
}

/// Resolves once a signal arrived and either the drain window elapsed or a
/// second signal forced the issue.
async fn drain_deadline(signalled: Arc<Notify>) {
    signalled.notified().await;
    info!(
        timeout_secs = DRAIN_TIMEOUT.as_secs(),
        "Draining open streams (signal again to stop now)"
    );
    tokio::select! {
        _ = tokio::time::sleep(DRAIN_TIMEOUT) => warn!("Drain window elapsed, stopping"),
        _ = wait_for_signal() => warn!("Second signal received, stopping now"),
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> DbResult<()> {
        let bind_addr = self.bind_addr();
        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            DbError::connection(
                format!("Failed to bind to {}: {}", bind_addr, e),
                "Choose a free port with --http-port",
            )
        })?;
        info!(addr = %bind_addr, endpoint = %self.endpoint, "Serving MCP over HTTP");

        let signalled = Arc::new(Notify::new());
        let notify = signalled.clone();
        let server = axum::serve(listener, self.router()).with_graceful_shutdown(async move {
            wait_for_signal().await;
            notify.notify_one();
        });

        let outcome = tokio::select! {
            served = server => served.map_err(|e| {
                error!(error = %e, "HTTP server failed");
                DbError::internal(format!("HTTP server error: {}", e))
            }),
            _ = drain_deadline(signalled) => Ok(()),
        };

        info!("Closing database pool");
        self.service.executor().close().await;
        outcome
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
