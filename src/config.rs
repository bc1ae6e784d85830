//! Configuration handling for the MySQL read-only MCP server.
//!
//! Process-wide settings come from CLI arguments with environment fallbacks
//! (`clap`). Database endpoint and credentials come from a per-mode set of
//! `MYSQL_DEV_*` / `MYSQL_TEST_*` variables, resolved by [`Config::load`]
//! through an injectable lookup so the derivation stays a pure function.

use crate::error::{DbError, DbResult};
use clap::{ArgAction, Parser, ValueEnum};
use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_QUERY_LENGTH: usize = 10_000;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_CHARSET: &str = "latin1";
/// Session time zone (UTC).
pub const DEFAULT_TIMEZONE: &str = "+00:00";
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Statement prefixes accepted by the `query` tool.
pub const DEFAULT_ALLOWED_PREFIXES: [&str; 5] = ["SELECT", "SHOW", "DESCRIBE", "EXPLAIN", "DESC"];

/// Which database profile the server talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatabaseMode {
    #[default]
    Development,
    Test,
}

impl DatabaseMode {
    /// Select the mode from CLI flags: `--test` wins, anything else is development.
    pub fn from_flags(test: bool) -> Self {
        if test { Self::Test } else { Self::Development }
    }

    pub fn env_prefix(&self) -> &'static str {
        match self {
            Self::Development => "MYSQL_DEV",
            Self::Test => "MYSQL_TEST",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Self::Development => 3307,
            Self::Test => 3308,
        }
    }

    /// Only the test profile has a fallback database name.
    pub fn default_database(&self) -> Option<&'static str> {
        match self {
            Self::Development => None,
            Self::Test => Some("billingdbtest"),
        }
    }

    /// Names of the variables that must be set for this mode.
    pub fn required_env_vars(&self) -> [String; 4] {
        let prefix = self.env_prefix();
        [
            format!("{prefix}_HOST"),
            format!("{prefix}_PORT"),
            format!("{prefix}_USER"),
            format!("{prefix}_PASSWORD"),
        ]
    }
}

impl fmt::Display for DatabaseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Test => write!(f, "test"),
        }
    }
}

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP (for web clients)
    Http,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// TLS mode for the database connection. Defaults to disabled because the
/// database is normally reached through a local proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SslMode {
    #[default]
    Disabled,
    Preferred,
    Required,
}

/// Command line arguments for the server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mysql-readonly-mcp",
    about = "Read-only MCP server for MySQL - lets AI assistants inspect schemas and run SELECT queries",
    version,
    author
)]
pub struct Cli {
    /// Use the test database profile (MYSQL_TEST_* variables)
    #[arg(long, conflicts_with = "dev")]
    pub test: bool,

    /// Use the development database profile (MYSQL_DEV_* variables, the default)
    #[arg(long)]
    pub dev: bool,

    /// Transport mode (stdio or http)
    #[arg(short, long, value_enum, default_value = "stdio", env = "MCP_TRANSPORT")]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(long, default_value = DEFAULT_HTTP_HOST, env = "MCP_HTTP_HOST")]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT, env = "MCP_HTTP_PORT")]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(long, default_value = DEFAULT_MCP_ENDPOINT, env = "MCP_ENDPOINT")]
    pub mcp_endpoint: String,

    /// Maximum pooled database connections
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_CONNECTIONS,
        value_parser = parse_max_connections,
        env = "MCP_MAX_CONNECTIONS"
    )]
    pub max_connections: u32,

    /// Put every pooled session into read-only transaction mode (only
    /// `false` turns it off)
    #[arg(
        long,
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = parse_read_only,
        env = "MCP_READ_ONLY"
    )]
    pub read_only: bool,

    /// Query timeout in milliseconds
    #[arg(
        long,
        default_value_t = DEFAULT_QUERY_TIMEOUT_MS,
        value_parser = parse_query_timeout,
        env = "MCP_QUERY_TIMEOUT"
    )]
    pub query_timeout: u64,

    /// Maximum accepted query length in characters
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_QUERY_LENGTH,
        value_parser = parse_max_query_length,
        env = "MCP_MAX_QUERY_LENGTH"
    )]
    pub max_query_length: usize,

    /// Log every accepted query (truncated to 100 characters)
    #[arg(long, env = "MCP_LOG_QUERIES")]
    pub log_queries: bool,

    /// TLS mode for the database connection
    #[arg(long, value_enum, default_value = "disabled", env = "MCP_SSL_MODE")]
    pub ssl_mode: SslMode,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,

    /// Environment file loaded before configuration is resolved
    #[arg(long, default_value = DEFAULT_ENV_FILE)]
    pub env_file: PathBuf,
}

impl Cli {
    /// Parse arguments, load the env file they name, then parse again so
    /// env-backed options pick up values from the file.
    pub fn parse_with_env_file() -> Self {
        let first = Self::parse();
        if load_env_file(&first.env_file) {
            Self::parse()
        } else {
            first
        }
    }

    pub fn mode(&self) -> DatabaseMode {
        DatabaseMode::from_flags(self.test)
    }
}

/// Leading decimal digits of `raw` as a positive number, or `default` when
/// there are none or they amount to zero.
fn positive_or<T>(raw: &str, default: T) -> T
where
    T: std::str::FromStr + Default + PartialEq,
{
    let trimmed = raw.trim();
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    match trimmed[..digits_end].parse::<T>() {
        Ok(value) if value != T::default() => value,
        _ => default,
    }
}

fn parse_max_connections(raw: &str) -> Result<u32, Infallible> {
    Ok(positive_or(raw, DEFAULT_MAX_CONNECTIONS))
}

fn parse_query_timeout(raw: &str) -> Result<u64, Infallible> {
    Ok(positive_or(raw, DEFAULT_QUERY_TIMEOUT_MS))
}

fn parse_max_query_length(raw: &str) -> Result<usize, Infallible> {
    Ok(positive_or(raw, DEFAULT_MAX_QUERY_LENGTH))
}

fn parse_read_only(raw: &str) -> Result<bool, Infallible> {
    Ok(raw != "false")
}

/// Read-only query policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityPolicy {
    /// Upper-case statement keywords a query must start with.
    pub allowed_prefixes: Vec<String>,
    pub max_query_length: usize,
    pub log_queries: bool,
    pub read_only: bool,
    pub query_timeout: Duration,
}

impl SecurityPolicy {
    /// Build a policy. Prefixes are normalised to trimmed upper case.
    pub fn new(
        allowed_prefixes: impl IntoIterator<Item = impl AsRef<str>>,
        max_query_length: usize,
    ) -> Self {
        Self {
            allowed_prefixes: allowed_prefixes
                .into_iter()
                .map(|p| p.as_ref().trim().to_uppercase())
                .filter(|p| !p.is_empty())
                .collect(),
            max_query_length,
            log_queries: false,
            read_only: true,
            query_timeout: Duration::from_millis(DEFAULT_QUERY_TIMEOUT_MS),
        }
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn with_log_queries(mut self, log_queries: bool) -> Self {
        self.log_queries = log_queries;
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_PREFIXES, DEFAULT_MAX_QUERY_LENGTH)
    }
}

/// Endpoint and credentials for one database profile.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub mode: DatabaseMode,
    pub host: String,
    pub port: u16,
    pub database: Option<String>,
    pub user: String,
    pub password: String,
    pub charset: String,
    pub timezone: String,
    pub ssl_mode: SslMode,
}

impl DatabaseSettings {
    /// Resolve the settings for `mode` from an environment lookup.
    ///
    /// Host, port and (test mode only) database fall back to static defaults;
    /// an unparseable port falls back too. A missing or empty user or
    /// password is a [`DbError::MissingCredentials`].
    pub fn from_env<F>(mode: DatabaseMode, env: F) -> DbResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = mode.env_prefix();
        let var = |suffix: &str| env(&format!("{prefix}_{suffix}")).filter(|v| !v.is_empty());

        let user = var("USER");
        let password = var("PASSWORD");
        let (Some(user), Some(password)) = (user, password) else {
            return Err(DbError::missing_credentials(mode));
        };

        Ok(Self {
            mode,
            host: var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: var("PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or_else(|| mode.default_port()),
            database: var("DATABASE").or_else(|| mode.default_database().map(String::from)),
            user,
            password,
            charset: DEFAULT_CHARSET.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            ssl_mode: SslMode::Disabled,
        })
    }

    pub fn with_ssl_mode(mut self, ssl_mode: SslMode) -> Self {
        self.ssl_mode = ssl_mode;
        self
    }

    /// `host:port/database` for logs.
    pub fn display_target(&self) -> String {
        format!(
            "{}:{}/{}",
            self.host,
            self.port,
            self.database.as_deref().unwrap_or("(none)")
        )
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("mode", &self.mode)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .field("charset", &self.charset)
            .field("timezone", &self.timezone)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Fully resolved server configuration. Immutable after load.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseSettings,
    pub security: SecurityPolicy,
    pub max_connections: u32,
    pub transport: TransportMode,
    pub http_host: String,
    pub http_port: u16,
    pub mcp_endpoint: String,
    pub log_level: String,
    pub json_logs: bool,
}

impl Config {
    /// Derive the configuration from parsed arguments and an environment lookup.
    pub fn load<F>(cli: &Cli, env: F) -> DbResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = DatabaseSettings::from_env(cli.mode(), env)?.with_ssl_mode(cli.ssl_mode);
        let security = SecurityPolicy::new(DEFAULT_ALLOWED_PREFIXES, cli.max_query_length)
            .with_query_timeout(Duration::from_millis(cli.query_timeout))
            .with_log_queries(cli.log_queries)
            .with_read_only(cli.read_only);

        Ok(Self {
            database,
            security,
            max_connections: cli.max_connections,
            transport: cli.transport,
            http_host: cli.http_host.clone(),
            http_port: cli.http_port,
            mcp_endpoint: cli.mcp_endpoint.clone(),
            log_level: cli.log_level.clone(),
            json_logs: cli.json_logs,
        })
    }

    /// Resolve the configuration from the process environment.
    pub fn from_process(cli: &Cli) -> DbResult<Self> {
        Self::load(cli, |key| std::env::var(key).ok())
    }

    pub fn mode(&self) -> DatabaseMode {
        self.database.mode
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

/// Load variables from an env file without overriding ones already set.
/// Returns whether the file was found.
pub fn load_env_file(path: &std::path::Path) -> bool {
    dotenv::from_path(path).is_ok()
}
