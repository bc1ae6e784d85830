//! Connectivity check for the MySQL profiles used by the MCP server.

use clap::Parser;
use mysql_readonly_mcp::config::{self, DatabaseMode, DatabaseSettings, SslMode};
use mysql_readonly_mcp::db::{QueryExecutor, pool};
use mysql_readonly_mcp::diagnostics::probe::{self, PROBE_QUERY_TIMEOUT, ProbeReport};
use mysql_readonly_mcp::logging::init_tracing;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "mysql-test-connection",
    about = "Test MySQL connectivity for the MCP server profiles",
    version
)]
struct Args {
    /// Probe the test profile instead of development
    #[arg(long, conflicts_with = "all")]
    test: bool,

    /// Probe both profiles
    #[arg(long)]
    all: bool,

    /// TLS mode for the probe connections
    #[arg(long, value_enum, default_value = "disabled", env = "MCP_SSL_MODE")]
    ssl_mode: SslMode,

    /// Environment file loaded before probing
    #[arg(long, default_value = config::DEFAULT_ENV_FILE)]
    env_file: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "MCP_LOG_LEVEL")]
    log_level: String,
}

impl Args {
    fn modes(&self) -> Vec<DatabaseMode> {
        if self.all {
            vec![DatabaseMode::Development, DatabaseMode::Test]
        } else {
            vec![DatabaseMode::from_flags(self.test)]
        }
    }
}

fn print_environment() {
    println!("Environment:");
    for (name, value) in probe::environment_listing(|key| std::env::var(key).ok()) {
        println!("  {name}: {value}");
    }
    println!();
}

async fn probe_mode(mode: DatabaseMode, ssl_mode: SslMode) -> (Option<DatabaseSettings>, ProbeReport) {
    println!("Testing {mode} profile");
    let settings = match DatabaseSettings::from_env(mode, |key| std::env::var(key).ok()) {
        Ok(settings) => settings.with_ssl_mode(ssl_mode),
        Err(e) => {
            println!("  FAILED: {e}");
            return (
                None,
                ProbeReport {
                    mode,
                    duration_ms: 0,
                    outcome: Err(e.to_string()),
                },
            );
        }
    };

    println!("  Host:     {}:{}", settings.host, settings.port);
    println!(
        "  Database: {}",
        settings.database.as_deref().unwrap_or("Not specified")
    );
    println!("  User:     {}", settings.user);

    let report = probe::probe(&settings).await;
    match &report.outcome {
        Ok(facts) => {
            println!("  OK in {}ms", report.duration_ms);
            println!("  Version:  {}", facts.version);
            println!(
                "  Current database: {}",
                facts.database.as_deref().unwrap_or("none")
            );
            println!("  Grants:   {}", facts.grants);
            println!("  Tables:   {}", facts.table_count);
            if let Some(warning) = &facts.table_count_warning {
                println!("  Warning:  {warning}");
            }
        }
        Err(e) => println!("  FAILED after {}ms: {e}", report.duration_ms),
    }
    println!();
    (Some(settings), report)
}

async fn run_query_checks(settings: &DatabaseSettings) {
    println!("MCP-style queries ({} profile)", settings.mode);
    let pool = match pool::connect(settings, 1, true).await {
        Ok((pool, _)) => pool,
        Err(e) => {
            println!("  FAILED to connect: {e}");
            return;
        }
    };
    let executor = QueryExecutor::new(pool, PROBE_QUERY_TIMEOUT);
    for check in probe::query_checks(&executor).await {
        match check.outcome {
            Ok(stats) => println!(
                "  {}: {} rows in {}ms",
                check.name, stats.rows, stats.duration_ms
            ),
            Err(e) => println!("  {}: FAILED ({e})", check.name),
        }
    }
    executor.close().await;
    println!();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if config::load_env_file(&args.env_file) {
        println!("Loaded {}", args.env_file.display());
    }
    init_tracing(&args.log_level, false);

    print_environment();

    let mut reports = Vec::new();
    let mut first_success = None;
    for mode in args.modes() {
        let (settings, report) = probe_mode(mode, args.ssl_mode).await;
        if first_success.is_none() && report.is_success() {
            first_success = settings;
        }
        reports.push(report);
    }

    if let Some(settings) = &first_success {
        run_query_checks(settings).await;
    }

    let succeeded = reports.iter().filter(|r| r.is_success()).count();
    println!("Summary");
    println!("  Successful: {}/{}", succeeded, reports.len());
    let failed: Vec<String> = reports
        .iter()
        .filter(|r| !r.is_success())
        .map(|r| r.mode.to_string())
        .collect();
    if !failed.is_empty() {
        println!("  Failed:     {}", failed.join(", "));
    }
    println!(
        "  Average connection time: {}ms",
        probe::average_duration_ms(&reports)
    );

    if !failed.is_empty() {
        std::process::exit(1);
    }
}
