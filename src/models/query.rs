//! Query-related data models.

use crate::db::types::JsonRow;
use serde::Serialize;

/// Rows returned by one accepted statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub rows: Vec<JsonRow>,
    pub row_count: usize,
}

impl QueryResult {
    pub fn new(rows: Vec<JsonRow>) -> Self {
        let row_count = rows.len();
        Self { rows, row_count }
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }
}
