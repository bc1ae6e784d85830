//! Text rendering for tool results.
//!
//! Every successful tool call answers with a short heading followed by a
//! pretty-printed (2-space) JSON payload.

use crate::error::{DbError, DbResult};
use crate::models::{QueryResult, Relationship, TableStructure};
use crate::db::types::JsonRow;
use serde::Serialize;

/// Longest prefix of a query that is written to the log.
pub const LOG_PREVIEW_CHARS: usize = 100;

/// Serialize `value` as indented JSON.
pub fn pretty_json<T: Serialize + ?Sized>(value: &T) -> DbResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| DbError::internal(format!("Failed to serialize result: {}", e)))
}

pub fn query_text(result: &QueryResult) -> DbResult<String> {
    Ok(format!(
        "Query executed successfully. {} rows returned.\n\nResults:\n{}",
        result.row_count,
        pretty_json(&result.rows)?
    ))
}

pub fn describe_table_text(table: &str, structure: &TableStructure) -> DbResult<String> {
    Ok(format!(
        "Table: {}\n\nStructure:\n{}\n\nIndexes:\n{}",
        table,
        pretty_json(&structure.columns)?,
        pretty_json(&structure.indexes)?
    ))
}

pub fn show_tables_text(rows: &[JsonRow]) -> DbResult<String> {
    Ok(format!("Database Tables:\n{}", pretty_json(rows)?))
}

pub fn relationships_text(relationships: &[Relationship]) -> DbResult<String> {
    Ok(format!(
        "Foreign Key Relationships:\n{}",
        pretty_json(relationships)?
    ))
}

/// Caller-visible rendering of a failure.
pub fn error_text(err: &DbError) -> String {
    format!("Error: {}", err)
}

/// Query text shortened for logging, with `...` when cut.
pub fn log_preview(sql: &str) -> String {
    let mut chars = sql.chars();
    let preview: String = chars.by_ref().take(LOG_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{preview}...")
    } else {
        preview
    }
}
