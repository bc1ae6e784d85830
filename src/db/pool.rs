//! Connection pool construction for the configured MySQL profile.

use crate::config::{
    DEFAULT_ACQUIRE_TIMEOUT_SECS, DEFAULT_CONNECT_TIMEOUT_SECS, DatabaseSettings, SslMode,
};
use crate::error::{DbError, DbResult};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions, MySqlSslMode};
use sqlx::{Executor, MySqlPool, Row};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Statement run on every new pooled session when the pool is read-only.
pub const READ_ONLY_SESSION_SQL: &str = "SET SESSION TRANSACTION READ ONLY";

/// Statement used to verify connectivity at startup.
pub const VERIFY_SQL: &str = "SELECT VERSION() AS version, DATABASE() AS current_database";

/// Server identity reported by the startup check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity {
    pub version: String,
    pub current_database: Option<String>,
}

/// Build connect options from resolved settings.
pub fn connect_options(settings: &DatabaseSettings) -> MySqlConnectOptions {
    let ssl_mode = match settings.ssl_mode {
        SslMode::Disabled => MySqlSslMode::Disabled,
        SslMode::Preferred => MySqlSslMode::Preferred,
        SslMode::Required => MySqlSslMode::Required,
    };

    let mut options = MySqlConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.user)
        .password(&settings.password)
        .charset(&settings.charset)
        .timezone(Some(settings.timezone.clone()))
        .ssl_mode(ssl_mode);

    if let Some(database) = &settings.database {
        options = options.database(database);
    }
    options
}

fn pool_options(max_connections: u32, read_only: bool) -> MySqlPoolOptions {
    let options = MySqlPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS));

    if !read_only {
        return options;
    }

    options.after_connect(|conn, _meta| {
        Box::pin(async move {
            conn.execute(READ_ONLY_SESSION_SQL).await?;
            Ok(())
        })
    })
}

/// Open the pool and verify it with a round trip.
pub async fn connect(
    settings: &DatabaseSettings,
    max_connections: u32,
    read_only: bool,
) -> DbResult<(MySqlPool, ServerIdentity)> {
    info!(
        mode = %settings.mode,
        target = %settings.display_target(),
        max_connections,
        read_only,
        "Connecting to MySQL"
    );

    let pool = tokio::time::timeout(
        Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        pool_options(max_connections, read_only).connect_with(connect_options(settings)),
    )
    .await
    .map_err(|_| {
        DbError::connection(
            format!(
                "Timed out after {}s connecting to {}",
                DEFAULT_CONNECT_TIMEOUT_SECS,
                settings.display_target()
            ),
            connection_suggestion("timed out"),
        )
    })?
    .map_err(|e| {
        DbError::connection(
            format!("Failed to connect: {}", e),
            connection_suggestion(&e.to_string()),
        )
    })?;

    match verify(&pool).await {
        Ok(identity) => {
            info!(
                version = %identity.version,
                database = identity.current_database.as_deref().unwrap_or("(none)"),
                "Connected to MySQL"
            );
            Ok((pool, identity))
        }
        Err(e) => {
            pool.close().await;
            Err(e)
        }
    }
}

/// Lazily connecting pool that never touches the network until used.
pub fn connect_lazy(settings: &DatabaseSettings, max_connections: u32, read_only: bool) -> MySqlPool {
    pool_options(max_connections, read_only).connect_lazy_with(connect_options(settings))
}

/// Run the startup verification query.
pub async fn verify(pool: &MySqlPool) -> DbResult<ServerIdentity> {
    let row = sqlx::query(VERIFY_SQL).fetch_one(pool).await.map_err(|e| {
        DbError::connection(
            format!("Connection check failed: {}", e),
            connection_suggestion(&e.to_string()),
        )
    })?;

    let version: String = row.try_get("version").unwrap_or_else(|e| {
        warn!(error = %e, "Failed to read server version");
        String::from("unknown")
    });
    let current_database: Option<String> = row.try_get("current_database").ok().flatten();
    debug!(version = %version, "Got server version");

    Ok(ServerIdentity {
        version,
        current_database,
    })
}

/// Generate a helpful suggestion for connection errors.
pub fn connection_suggestion(error: &str) -> String {
    let error_str = error.to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("timed out") {
        return "Check that the MySQL server or the local proxy is running and reachable"
            .to_string();
    }

    if error_str.contains("access denied") || error_str.contains("password") {
        return "Verify the MYSQL_*_USER and MYSQL_*_PASSWORD values in your .env file"
            .to_string();
    }

    if error_str.contains("unknown database") {
        return "Check that MYSQL_*_DATABASE names an existing database".to_string();
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check MCP_SSL_MODE; proxied connections normally use --ssl-mode disabled"
            .to_string();
    }

    "Check the MYSQL_* host and port settings".to_string()
}
