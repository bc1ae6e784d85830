//! Schema introspection module.
//!
//! All introspection goes through fixed SQL templates. The only interpolated
//! value is a table name, and it passes [`validate_identifier`] first.

use crate::db::executor::SqlRunner;
use crate::db::types::JsonRow;
use crate::error::{DbError, DbResult};
use crate::models::{Relationship, SchemaDocument, TableStructure};
use crate::tools::sql_validator::validate_identifier;
use serde_json::Value as JsonValue;
use tracing::debug;

/// SQL templates used for introspection.
pub mod queries {
    pub const SHOW_TABLES: &str = "SHOW TABLES";

    pub fn describe(table: &str) -> String {
        format!("DESCRIBE {table}")
    }

    pub fn show_index(table: &str) -> String {
        format!("SHOW INDEX FROM {table}")
    }

    /// Foreign keys of the current database, aliased to the relationship field names.
    pub const RELATIONSHIPS: &str = r#"
        SELECT
            TABLE_NAME AS `table`,
            COLUMN_NAME AS `column`,
            CONSTRAINT_NAME AS `constraint`,
            REFERENCED_TABLE_NAME AS `referenced_table`,
            REFERENCED_COLUMN_NAME AS `referenced_column`
        FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE
        WHERE REFERENCED_TABLE_NAME IS NOT NULL
          AND TABLE_SCHEMA = DATABASE()
        ORDER BY TABLE_NAME, COLUMN_NAME
    "#;
}

/// Schema inspector over any [`SqlRunner`].
#[derive(Debug, Clone)]
pub struct SchemaInspector<R> {
    runner: R,
}

impl<R: SqlRunner> SchemaInspector<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// `SHOW TABLES` rows, unmodified (one `Tables_in_<db>` column each).
    pub async fn list_table_rows(&self) -> DbResult<Vec<JsonRow>> {
        self.runner
            .fetch_rows(queries::SHOW_TABLES)
            .await
            .map_err(|e| DbError::introspection_failed("show tables", e.detail()))
    }

    /// Table names in server order.
    pub async fn list_tables(&self) -> DbResult<Vec<String>> {
        let rows = self.list_table_rows().await?;
        Ok(rows.iter().filter_map(first_string).collect())
    }

    /// Columns and indexes of one table.
    pub async fn describe_table(&self, table: &str) -> DbResult<TableStructure> {
        validate_identifier(table)?;
        debug!(table, "Describing table");

        let operation = || format!("describe table {table}");
        let columns = self
            .runner
            .fetch_rows(&queries::describe(table))
            .await
            .map_err(|e| DbError::introspection_failed(operation(), e.detail()))?;
        let indexes = self
            .runner
            .fetch_rows(&queries::show_index(table))
            .await
            .map_err(|e| DbError::introspection_failed(operation(), e.detail()))?;

        Ok(TableStructure { columns, indexes })
    }

    /// Foreign-key listing for the current database.
    pub async fn relationships(&self) -> DbResult<Vec<Relationship>> {
        let rows = self
            .runner
            .fetch_rows(queries::RELATIONSHIPS)
            .await
            .map_err(|e| DbError::introspection_failed("get table relationships", e.detail()))?;

        rows.into_iter()
            .map(|row| {
                serde_json::from_value(JsonValue::Object(row)).map_err(|e| {
                    DbError::introspection_failed("get table relationships", e.to_string())
                })
            })
            .collect()
    }

    /// Every table with its columns and indexes.
    ///
    /// One `describe_table` per listed table. Any failure fails the whole
    /// document.
    pub async fn full_schema(&self, database: Option<String>) -> DbResult<SchemaDocument> {
        let wrap = |e: DbError| DbError::introspection_failed("get complete schema", e.to_string());

        let tables = self.list_tables().await.map_err(wrap)?;
        let mut schema = SchemaDocument::new(database);
        for table in tables {
            let structure = self.describe_table(&table).await.map_err(wrap)?;
            schema.tables.insert(table, structure);
        }

        debug!(tables = schema.table_count(), "Built schema document");
        Ok(schema)
    }
}

fn first_string(row: &JsonRow) -> Option<String> {
    match row.values().next()? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Null => None,
        other => Some(other.to_string()),
    }
}
