//! Schema introspection tools.
//!
//! Implements `describe_table`, `show_tables` and `table_relationships`, plus
//! the JSON bodies behind the `mysql://schema` and `mysql://tables` resources.

use crate::db::{SchemaInspector, SqlRunner};
use crate::error::{DbError, DbResult};
use crate::tools::format::{describe_table_text, pretty_json, relationships_text, show_tables_text};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{error, warn};

/// Input for the describe_table tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DescribeTableInput {
    /// Name of the table to describe
    pub table: String,
}

/// Handler for the introspection tools and resources.
pub struct SchemaToolHandler<R> {
    inspector: SchemaInspector<R>,
    database: Option<String>,
}

impl<R: SqlRunner> SchemaToolHandler<R> {
    /// `database` is the configured database name reported in the schema document.
    pub fn new(runner: R, database: Option<String>) -> Self {
        Self {
            inspector: SchemaInspector::new(runner),
            database,
        }
    }

    pub fn inspector(&self) -> &SchemaInspector<R> {
        &self.inspector
    }

    /// Handle a `describe_table` tool call.
    pub async fn describe_table(&self, input: DescribeTableInput) -> DbResult<String> {
        let table = input.table.as_str();
        if table.is_empty() {
            return Err(DbError::invalid_input("Table name is required"));
        }

        let structure = self
            .inspector
            .describe_table(table)
            .await
            .inspect_err(log_failure)?;
        describe_table_text(table, &structure)
    }

    /// Handle a `show_tables` tool call.
    pub async fn show_tables(&self) -> DbResult<String> {
        let rows = self
            .inspector
            .list_table_rows()
            .await
            .inspect_err(log_failure)?;
        show_tables_text(&rows)
    }

    /// Handle a `table_relationships` tool call.
    pub async fn table_relationships(&self) -> DbResult<String> {
        let relationships = self
            .inspector
            .relationships()
            .await
            .inspect_err(log_failure)?;
        relationships_text(&relationships)
    }

    /// Body of the `mysql://schema` resource.
    pub async fn schema_json(&self) -> DbResult<String> {
        let schema = self.inspector.full_schema(self.database.clone()).await?;
        pretty_json(&schema)
    }

    /// Body of the `mysql://tables` resource.
    pub async fn tables_json(&self) -> DbResult<String> {
        let rows = self.inspector.list_table_rows().await?;
        pretty_json(&rows)
    }
}

fn log_failure(err: &DbError) {
    if err.is_policy_rejection() {
        warn!(error = %err, "Introspection rejected");
    } else {
        error!(error = %err, "Introspection failed");
    }
}
