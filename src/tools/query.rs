//! Query execution tool.
//!
//! This module implements the `query` MCP tool. Input is checked against the
//! read-only policy before anything reaches the database, and accepted text
//! is executed verbatim.

use crate::config::SecurityPolicy;
use crate::db::SqlRunner;
use crate::error::DbResult;
use crate::models::QueryResult;
use crate::tools::format::{log_preview, query_text};
use crate::tools::sql_validator;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Input for the query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// SQL query to execute (SELECT, SHOW, DESCRIBE, EXPLAIN or DESC only)
    pub sql: String,
}

/// Handler for the `query` tool.
pub struct QueryToolHandler<R> {
    runner: R,
    policy: Arc<SecurityPolicy>,
}

impl<R: SqlRunner> QueryToolHandler<R> {
    pub fn new(runner: R, policy: Arc<SecurityPolicy>) -> Self {
        Self { runner, policy }
    }

    /// Validate and run `sql`, returning the raw result.
    pub async fn run(&self, sql: &str) -> DbResult<QueryResult> {
        if let Err(e) = sql_validator::validate(sql, &self.policy) {
            warn!(error = %e, sql = %log_preview(sql), "Query rejected");
            return Err(e);
        }

        if self.policy.log_queries {
            info!(sql = %log_preview(sql), "Executing query");
        }

        match self.runner.fetch_rows(sql).await {
            Ok(rows) => Ok(QueryResult::new(rows)),
            Err(e) => {
                error!(error = %e, "Query failed");
                Err(e)
            }
        }
    }

    /// Handle a `query` tool call.
    pub async fn query(&self, input: QueryInput) -> DbResult<String> {
        let result = self.run(&input.sql).await?;
        query_text(&result)
    }
}
