//! MySQL Read-Only MCP Server Library
//!
//! This library exposes read-only access to a MySQL database over the Model
//! Context Protocol: a validated `query` tool, schema introspection tools and
//! two schema resources. The `diagnostics` module backs the connection-test
//! and setup-validation binaries.

pub mod config;
pub mod db;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::DbService;
