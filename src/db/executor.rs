//! Query execution engine.
//!
//! Statements run as raw (unprepared) SQL so that `SHOW`/`DESCRIBE` work the
//! same way as `SELECT`. Every call is bounded by the configured query
//! timeout and rows are decoded to ordered JSON objects.

use crate::db::types::{JsonRow, RowToJson};
use crate::error::{DbError, DbResult};
use sqlx::MySqlPool;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

/// Anything that can run a SQL string and hand back decoded rows.
///
/// The live implementation is [`QueryExecutor`]; introspection and the tool
/// handlers only depend on this trait.
pub trait SqlRunner: Send + Sync {
    fn fetch_rows(&self, sql: &str) -> impl Future<Output = DbResult<Vec<JsonRow>>> + Send;
}

impl<T: SqlRunner> SqlRunner for std::sync::Arc<T> {
    fn fetch_rows(&self, sql: &str) -> impl Future<Output = DbResult<Vec<JsonRow>>> + Send {
        (**self).fetch_rows(sql)
    }
}

impl<T: SqlRunner> SqlRunner for &T {
    fn fetch_rows(&self, sql: &str) -> impl Future<Output = DbResult<Vec<JsonRow>>> + Send {
        (**self).fetch_rows(sql)
    }
}

/// Query executor bound to the shared pool.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    pool: MySqlPool,
    query_timeout: Duration,
}

impl QueryExecutor {
    pub fn new(pool: MySqlPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    /// Close the underlying pool. Idempotent.
    pub async fn close(&self) {
        if !self.pool.is_closed() {
            self.pool.close().await;
        }
    }
}

impl SqlRunner for QueryExecutor {
    async fn fetch_rows(&self, sql: &str) -> DbResult<Vec<JsonRow>> {
        use sqlx::Executor;

        let start = Instant::now();
        let rows = match timeout(self.query_timeout, self.pool.fetch_all(sql)).await {
            Ok(result) => result.map_err(DbError::from)?,
            Err(_) => return Err(timeout_error(self.query_timeout)),
        };

        let json_rows: Vec<JsonRow> = rows.iter().map(RowToJson::to_json_map).collect();
        debug!(
            rows = json_rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Statement completed"
        );
        Ok(json_rows)
    }
}

fn timeout_error(query_timeout: Duration) -> DbError {
    DbError::execution_failed(format!(
        "query exceeded timeout of {}ms",
        query_timeout.as_millis()
    ))
}
