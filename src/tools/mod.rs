//! MCP tool implementations.
//!
//! This module contains the database tool handlers:
//! - `query`: run a validated read-only statement
//! - `describe_table`: columns and indexes of one table
//! - `show_tables`: raw `SHOW TABLES` listing
//! - `table_relationships`: foreign keys of the current database
//! - `sql_validator`: the read-only gate for statements and identifiers
//!
//! Handlers return `DbResult<String>`; [`into_call_tool_result`] is the one
//! place where that becomes an MCP result.

pub mod format;
pub mod query;
pub mod schema;
pub mod sql_validator;

pub use query::{QueryInput, QueryToolHandler};
pub use schema::{DescribeTableInput, SchemaToolHandler};

use crate::error::{DbError, DbResult};
use rmcp::model::{CallToolResult, Content, JsonObject};
use std::fmt;
use std::str::FromStr;

/// The fixed tool surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    Query,
    DescribeTable,
    ShowTables,
    TableRelationships,
}

impl ToolName {
    pub const ALL: [ToolName; 4] = [
        ToolName::Query,
        ToolName::DescribeTable,
        ToolName::ShowTables,
        ToolName::TableRelationships,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::DescribeTable => "describe_table",
            Self::ShowTables => "show_tables",
            Self::TableRelationships => "table_relationships",
        }
    }

    /// The string argument this tool cannot run without, with the message
    /// reported when it is absent.
    pub fn required_argument(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::Query => Some(("sql", "SQL query is required")),
            Self::DescribeTable => Some(("table", "Table name is required")),
            Self::ShowTables | Self::TableRelationships => None,
        }
    }

    /// Check call arguments before they are deserialized into tool input, so
    /// a missing or non-string argument is reported as tool output.
    pub fn check_arguments(&self, arguments: Option<&JsonObject>) -> DbResult<()> {
        let Some((name, message)) = self.required_argument() else {
            return Ok(());
        };
        match arguments.and_then(|args| args.get(name)) {
            Some(serde_json::Value::String(_)) => Ok(()),
            _ => Err(DbError::invalid_input(message)),
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| DbError::unknown_tool(s))
    }
}

/// Convert a handler result into tool output. Failures become `Error: ...`
/// text with the error flag set; they never become protocol errors.
pub fn into_call_tool_result(result: DbResult<String>) -> CallToolResult {
    match result {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(e) => CallToolResult::error(vec![Content::text(format::error_text(&e))]),
    }
}
