//! Schema-related data models.

use crate::db::types::JsonRow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Columns and indexes of one table, exactly as `DESCRIBE` and
/// `SHOW INDEX FROM` return them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableStructure {
    pub columns: Vec<JsonRow>,
    pub indexes: Vec<JsonRow>,
}

/// Full schema snapshot, rebuilt on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub database: Option<String>,
    pub tables: BTreeMap<String, TableStructure>,
}

impl SchemaDocument {
    pub fn new(database: Option<String>) -> Self {
        Self {
            database,
            tables: BTreeMap::new(),
        }
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

/// One foreign-key column reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub table: String,
    pub column: String,
    pub constraint: String,
    pub referenced_table: String,
    pub referenced_column: String,
}
