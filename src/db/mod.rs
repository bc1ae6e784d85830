//! Database layer.
//!
//! - `pool`: pool construction and startup verification
//! - `executor`: timed raw-SQL execution behind the `SqlRunner` trait
//! - `schema`: introspection templates
//! - `types`: row to JSON decoding

pub mod executor;
pub mod pool;
pub mod schema;
pub mod types;

pub use executor::{QueryExecutor, SqlRunner};
pub use pool::ServerIdentity;
pub use schema::SchemaInspector;
pub use types::JsonRow;
