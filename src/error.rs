//! Error types for the MySQL read-only MCP server.
//!
//! Every failure the adapter can produce is a `DbError` variant. Startup
//! failures (`MissingCredentials`, `Connection`) end the process; everything
//! else is reported back to the caller as tool output so the calling agent can
//! read the message and react to it.

use crate::config::DatabaseMode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error(
        "Missing required database credentials for {mode} mode. Set {prefix}_USER and {prefix}_PASSWORD."
    )]
    MissingCredentials {
        mode: DatabaseMode,
        prefix: &'static str,
    },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Query not allowed. Only {allowed} operations are permitted.")]
    DisallowedOperation { allowed: String },

    #[error("Query too long. Maximum length is {max} characters (got {length}).")]
    QueryTooLong { length: usize, max: usize },

    #[error("Query contains potentially dangerous patterns ({pattern}).")]
    DangerousPattern { pattern: &'static str },

    #[error(
        "Invalid table name '{identifier}'. Only alphanumeric characters and underscores are allowed."
    )]
    InvalidIdentifier { identifier: String },

    #[error("Failed to {operation}: {message}")]
    IntrospectionFailed { operation: String, message: String },

    #[error("Query execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Unknown resource: {uri}")]
    UnknownResource { uri: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a missing credentials error for the given mode.
    pub fn missing_credentials(mode: DatabaseMode) -> Self {
        Self::MissingCredentials {
            mode,
            prefix: mode.env_prefix(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn disallowed_operation(allowed: &[String]) -> Self {
        Self::DisallowedOperation {
            allowed: allowed.join(", "),
        }
    }

    pub fn query_too_long(length: usize, max: usize) -> Self {
        Self::QueryTooLong { length, max }
    }

    pub fn dangerous_pattern(pattern: &'static str) -> Self {
        Self::DangerousPattern { pattern }
    }

    pub fn invalid_identifier(identifier: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            identifier: identifier.into(),
        }
    }

    /// Wrap a failed introspection call. `operation` reads as a verb phrase,
    /// e.g. "describe table customers" or "get table relationships".
    pub fn introspection_failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::IntrospectionFailed {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            message: message.into(),
        }
    }

    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    pub fn unknown_resource(uri: impl Into<String>) -> Self {
        Self::UnknownResource { uri: uri.into() }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::MissingCredentials { .. } => Some("Check your .env file"),
            Self::InvalidIdentifier { .. } => {
                Some("Call show_tables to get the exact table names")
            }
            _ => None,
        }
    }

    /// True for rejections raised by the read-only policy before any SQL is sent.
    pub fn is_policy_rejection(&self) -> bool {
        matches!(
            self,
            Self::DisallowedOperation { .. }
                | Self::QueryTooLong { .. }
                | Self::DangerousPattern { .. }
                | Self::InvalidIdentifier { .. }
        )
    }

    /// Underlying message without the variant prefix, used when re-wrapping
    /// an execution failure as an introspection failure.
    pub fn detail(&self) -> String {
        match self {
            Self::ExecutionFailed { message } => message.clone(),
            Self::Connection { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the MYSQL_* connection settings and credentials",
            ),
            sqlx::Error::Database(db_err) => DbError::execution_failed(db_err.message()),
            sqlx::Error::PoolTimedOut => DbError::connection(
                "Timed out waiting for a pooled connection",
                "Raise MCP_MAX_CONNECTIONS or check that the server is reachable",
            ),
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "Restart the server")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and that the database proxy is running",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify MCP_SSL_MODE and the server's TLS configuration",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            other => DbError::execution_failed(other.to_string()),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert DbError to MCP ErrorData. Only the resource surface reports errors
/// this way; tool calls turn every error into result text instead.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        let data = suggestion_data(err.suggestion());
        match &err {
            DbError::UnknownResource { .. } => {
                rmcp::ErrorData::resource_not_found(err.to_string(), data)
            }
            DbError::InvalidInput { .. } | DbError::UnknownTool { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), data)
            }
            e if e.is_policy_rejection() => {
                rmcp::ErrorData::invalid_params(err.to_string(), data)
            }
            _ => rmcp::ErrorData::internal_error(err.to_string(), data),
        }
    }
}
