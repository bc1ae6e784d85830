//! Connection probing for the diagnostics binaries.

use crate::config::{DatabaseMode, DatabaseSettings};
use crate::db::pool::{self, ServerIdentity};
use crate::db::{QueryExecutor, SchemaInspector, SqlRunner};
use crate::error::DbResult;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Per-statement timeout used while probing.
pub const PROBE_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Variables shown by the connection test, in display order.
pub const DISPLAYED_ENV_VARS: [&str; 13] = [
    "MYSQL_DEV_HOST",
    "MYSQL_DEV_PORT",
    "MYSQL_DEV_DATABASE",
    "MYSQL_DEV_USER",
    "MYSQL_DEV_PASSWORD",
    "MYSQL_TEST_HOST",
    "MYSQL_TEST_PORT",
    "MYSQL_TEST_DATABASE",
    "MYSQL_TEST_USER",
    "MYSQL_TEST_PASSWORD",
    "MCP_SSL_MODE",
    "MCP_READ_ONLY",
    "MCP_MAX_CONNECTIONS",
];

/// `(name, display value)` pairs with secrets masked.
pub fn environment_listing<F>(env: F) -> Vec<(&'static str, String)>
where
    F: Fn(&str) -> Option<String>,
{
    DISPLAYED_ENV_VARS
        .iter()
        .map(|&name| {
            let value = env(name).filter(|v| !v.is_empty());
            let display = match value {
                Some(_) if name.contains("PASSWORD") => "***".to_string(),
                Some(v) => v,
                None => "Not set".to_string(),
            };
            (name, display)
        })
        .collect()
}

/// Facts gathered from a reachable server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerFacts {
    pub version: String,
    pub database: Option<String>,
    pub grants: usize,
    pub table_count: usize,
    /// Set when the table count could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_count_warning: Option<String>,
}

/// Result of probing one profile.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub mode: DatabaseMode,
    pub duration_ms: u64,
    pub outcome: Result<ServerFacts, String>,
}

impl ProbeReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Read grants and table count. Only the grants query is required to succeed.
pub async fn server_facts<R: SqlRunner>(
    runner: &R,
    identity: ServerIdentity,
) -> DbResult<ServerFacts> {
    let grants = runner.fetch_rows("SHOW GRANTS").await?.len();

    let (table_count, table_count_warning) = match runner.fetch_rows("SHOW TABLES").await {
        Ok(rows) => (rows.len(), None),
        Err(e) => {
            warn!(error = %e, "Could not count tables");
            (0, Some(format!("Could not count tables: {}", e.detail())))
        }
    };

    Ok(ServerFacts {
        version: identity.version,
        database: identity.current_database,
        grants,
        table_count,
        table_count_warning,
    })
}

/// Connect with a single-connection pool and collect [`ServerFacts`].
pub async fn probe(settings: &DatabaseSettings) -> ProbeReport {
    let start = Instant::now();
    let outcome = async {
        let (pool, identity) = pool::connect(settings, 1, true).await?;
        let executor = QueryExecutor::new(pool, PROBE_QUERY_TIMEOUT);
        let facts = server_facts(&executor, identity).await;
        executor.close().await;
        facts
    }
    .await
    .map_err(|e| e.to_string());

    let duration_ms = start.elapsed().as_millis() as u64;
    debug!(mode = %settings.mode, duration_ms, success = outcome.is_ok(), "Probe finished");

    ProbeReport {
        mode: settings.mode,
        duration_ms,
        outcome,
    }
}

/// One MCP-style statement check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCheck {
    pub name: String,
    pub outcome: Result<QueryCheckStats, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryCheckStats {
    pub rows: usize,
    pub duration_ms: u64,
}

/// Statements the server issues in normal operation.
pub const MCP_STYLE_QUERIES: [(&str, &str); 3] = [
    ("Show Tables", "SHOW TABLES"),
    (
        "Database Info",
        "SELECT DATABASE() AS current_database, VERSION() AS version, @@character_set_database AS charset",
    ),
    (
        "Table Count",
        "SELECT COUNT(*) AS table_count FROM information_schema.tables WHERE table_schema = DATABASE()",
    ),
];

async fn timed<R: SqlRunner>(runner: &R, name: String, sql: &str) -> QueryCheck {
    let start = Instant::now();
    let outcome = runner
        .fetch_rows(sql)
        .await
        .map(|rows| QueryCheckStats {
            rows: rows.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
        .map_err(|e| e.detail());
    QueryCheck { name, outcome }
}

/// Run the MCP-style statements, then `DESCRIBE` the first table if any.
pub async fn query_checks<R: SqlRunner>(runner: &R) -> Vec<QueryCheck> {
    let mut checks = Vec::with_capacity(MCP_STYLE_QUERIES.len() + 1);
    for (name, sql) in MCP_STYLE_QUERIES {
        checks.push(timed(runner, name.to_string(), sql).await);
    }

    let inspector = SchemaInspector::new(runner);
    match inspector.list_tables().await {
        Ok(tables) => {
            if let Some(first) = tables.first() {
                let start = Instant::now();
                let outcome = inspector
                    .describe_table(first)
                    .await
                    .map(|structure| QueryCheckStats {
                        rows: structure.columns.len(),
                        duration_ms: start.elapsed().as_millis() as u64,
                    })
                    .map_err(|e| e.to_string());
                checks.push(QueryCheck {
                    name: format!("Describe Table ({first})"),
                    outcome,
                });
            }
        }
        Err(e) => checks.push(QueryCheck {
            name: "Describe Table".to_string(),
            outcome: Err(e.to_string()),
        }),
    }
    checks
}

/// Average probe duration, rounded; 0 for no probes.
pub fn average_duration_ms(reports: &[ProbeReport]) -> u64 {
    if reports.is_empty() {
        return 0;
    }
    let total: u64 = reports.iter().map(|r| r.duration_ms).sum();
    (total as f64 / reports.len() as f64).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_listing_masks_passwords() {
        let listing = environment_listing(|key| match key {
            "MYSQL_DEV_HOST" => Some("127.0.0.1".into()),
            "MYSQL_DEV_PASSWORD" => Some("hunter2".into()),
            "MYSQL_TEST_USER" => Some(String::new()),
            _ => None,
        });
        let get = |name: &str| {
            listing
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };
        assert_eq!(get("MYSQL_DEV_HOST"), "127.0.0.1");
        assert_eq!(get("MYSQL_DEV_PASSWORD"), "***");
        assert_eq!(get("MYSQL_TEST_PASSWORD"), "Not set");
        assert_eq!(get("MYSQL_TEST_USER"), "Not set");
        assert!(listing.iter().all(|(_, v)| v != "hunter2"));
    }

    #[test]
    fn test_average_duration() {
        let report = |ms| ProbeReport {
            mode: DatabaseMode::Development,
            duration_ms: ms,
            outcome: Err("x".into()),
        };
        assert_eq!(average_duration_ms(&[]), 0);
        assert_eq!(average_duration_ms(&[report(10), report(15)]), 13);
    }
}
