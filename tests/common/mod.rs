//! Shared fixtures for integration tests.
//!
//! `FakeRunner` answers SQL from a fixed table of canned responses and
//! records every statement it receives, so tests can assert both results and
//! the exact SQL that would have reached MySQL.

#![allow(dead_code)]

use mysql_readonly_mcp::db::{JsonRow, SqlRunner};
use mysql_readonly_mcp::error::{DbError, DbResult};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeRunner {
    responses: HashMap<String, Result<Vec<JsonRow>, String>>,
    issued: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, sql: impl Into<String>, rows: Value) -> Self {
        self.responses.insert(sql.into(), Ok(rows_from(rows)));
        self
    }

    pub fn with_error(mut self, sql: impl Into<String>, message: impl Into<String>) -> Self {
        self.responses.insert(sql.into(), Err(message.into()));
        self
    }

    /// Statements received so far, in order.
    pub fn issued(&self) -> Vec<String> {
        self.issued.lock().unwrap().clone()
    }
}

impl SqlRunner for FakeRunner {
    async fn fetch_rows(&self, sql: &str) -> DbResult<Vec<JsonRow>> {
        self.issued.lock().unwrap().push(sql.to_string());
        match self.responses.get(sql) {
            Some(Ok(rows)) => Ok(rows.clone()),
            Some(Err(message)) => Err(DbError::execution_failed(message.clone())),
            None => Err(DbError::execution_failed(format!(
                "Table 'billing.{}' doesn't exist",
                sql.split_whitespace().last().unwrap_or_default()
            ))),
        }
    }
}

/// Convert a JSON array of objects into rows, keeping key order.
pub fn rows_from(value: Value) -> Vec<JsonRow> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => map,
                other => panic!("expected object row, got {other}"),
            })
            .collect(),
        other => panic!("expected array of rows, got {other}"),
    }
}

/// Runner seeded with a small billing schema: `customers` and `invoices`,
/// with one foreign key from invoices to customers.
pub fn billing_runner() -> FakeRunner {
    FakeRunner::new()
        .with_rows(
            "SHOW TABLES",
            json!([
                {"Tables_in_billing": "customers"},
                {"Tables_in_billing": "invoices"}
            ]),
        )
        .with_rows(
            "DESCRIBE customers",
            json!([
                {"Field": "id", "Type": "int", "Null": "NO", "Key": "PRI", "Default": null, "Extra": "auto_increment"},
                {"Field": "name", "Type": "varchar(255)", "Null": "YES", "Key": "", "Default": null, "Extra": ""}
            ]),
        )
        .with_rows(
            "SHOW INDEX FROM customers",
            json!([
                {"Table": "customers", "Non_unique": 0, "Key_name": "PRIMARY", "Seq_in_index": 1, "Column_name": "id"}
            ]),
        )
        .with_rows(
            "DESCRIBE invoices",
            json!([
                {"Field": "id", "Type": "int", "Null": "NO", "Key": "PRI", "Default": null, "Extra": "auto_increment"},
                {"Field": "customer_id", "Type": "int", "Null": "NO", "Key": "MUL", "Default": null, "Extra": ""},
                {"Field": "total", "Type": "decimal(10,2)", "Null": "NO", "Key": "", "Default": "0.00", "Extra": ""}
            ]),
        )
        .with_rows(
            "SHOW INDEX FROM invoices",
            json!([
                {"Table": "invoices", "Non_unique": 0, "Key_name": "PRIMARY", "Seq_in_index": 1, "Column_name": "id"},
                {"Table": "invoices", "Non_unique": 1, "Key_name": "fk_invoices_customer", "Seq_in_index": 1, "Column_name": "customer_id"}
            ]),
        )
}

/// Relationship rows as the aliased information-schema query returns them.
pub fn relationship_rows() -> Value {
    json!([
        {
            "table": "invoices",
            "column": "customer_id",
            "constraint": "fk_invoices_customer",
            "referenced_table": "customers",
            "referenced_column": "id"
        }
    ])
}
