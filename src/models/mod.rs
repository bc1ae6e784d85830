//! Data models for the MySQL read-only MCP server.
//!
//! This module re-exports all model types used throughout the application.

pub mod query;
pub mod schema;

pub use query::QueryResult;
pub use schema::{Relationship, SchemaDocument, TableStructure};
