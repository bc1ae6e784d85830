//! Validates a local installation of the MySQL read-only MCP server and
//! writes a JSON report.

use clap::Parser;
use mysql_readonly_mcp::config::{self, Cli, DatabaseMode, SecurityPolicy};
use mysql_readonly_mcp::db::{QueryExecutor, pool};
use mysql_readonly_mcp::diagnostics::probe::PROBE_QUERY_TIMEOUT;
use mysql_readonly_mcp::diagnostics::report::{DEFAULT_REPORT_PATH, ValidationReport};
use mysql_readonly_mcp::diagnostics::setup::{self, SERVER_BINARY, SetupValidator};
use mysql_readonly_mcp::diagnostics::{Category, CheckResult};
use mysql_readonly_mcp::logging::init_tracing;
use std::path::{Path, PathBuf};
use tracing::error;

#[derive(Parser, Debug)]
#[command(
    name = "mysql-validate-setup",
    about = "Validate the MySQL read-only MCP server setup",
    version
)]
struct Args {
    /// Validate the test profile instead of development
    #[arg(long)]
    test: bool,

    /// Where to write the JSON report
    #[arg(long, default_value = DEFAULT_REPORT_PATH)]
    report: PathBuf,

    /// Environment file to check and load
    #[arg(long, default_value = config::DEFAULT_ENV_FILE)]
    env_file: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "MCP_LOG_LEVEL")]
    log_level: String,
}

fn server_binary_path() -> PathBuf {
    let name = format!("{SERVER_BINARY}{}", std::env::consts::EXE_SUFFIX);
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&name)))
        .unwrap_or_else(|| PathBuf::from(name))
}

/// Server arguments equivalent to this run, so env-backed options resolve
/// exactly as they would for the server.
fn server_cli(args: &Args) -> Result<Cli, clap::Error> {
    let mut argv = vec![
        SERVER_BINARY.to_string(),
        "--env-file".to_string(),
        args.env_file.display().to_string(),
    ];
    if args.test {
        argv.push("--test".to_string());
    }
    Cli::try_parse_from(argv)
}

async fn run(args: &Args, base_dir: &Path) -> ValidationReport {
    let mode = DatabaseMode::from_flags(args.test);
    let mut validator = SetupValidator::new(mode, base_dir);

    validator.check_prerequisites(&server_binary_path());

    let env_file = base_dir.join(&args.env_file);
    config::load_env_file(&env_file);

    let config = match server_cli(args) {
        Ok(cli) => {
            validator.check_configuration(&args.env_file, &cli, |key| std::env::var(key).ok())
        }
        Err(e) => {
            validator.record(
                Category::Configuration,
                CheckResult::fail("Configuration load", e.to_string()),
            );
            None
        }
    };

    let connected = match &config {
        Some(config) => validator.check_connection(&config.database).await,
        None => {
            validator.record(
                Category::Connections,
                CheckResult::warning(
                    format!("{mode} connection"),
                    "Skipped because the configuration could not be loaded",
                ),
            );
            false
        }
    };

    let policy = config
        .as_ref()
        .map(|c| c.security.clone())
        .unwrap_or_else(SecurityPolicy::default);
    validator.check_validator(&policy);

    if let (Some(config), true) = (&config, connected) {
        match pool::connect(&config.database, 1, true).await {
            Ok((pool, _)) => {
                let executor = QueryExecutor::new(pool, PROBE_QUERY_TIMEOUT);
                validator.check_introspection(&executor).await;
                executor.close().await;
            }
            Err(e) => validator.record(
                Category::Functionality,
                CheckResult::warning("Show tables", e.to_string()),
            ),
        }
    }

    validator.into_report()
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(&args.log_level, false);

    let base_dir = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            error!(error = %e, "Cannot resolve working directory");
            eprintln!("Error: cannot resolve working directory: {e}");
            std::process::exit(1);
        }
    };

    let report = run(&args, &base_dir).await;

    if let Err(e) = report.write_to(&args.report) {
        error!(error = %e, "Failed to write report");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    println!("{}", setup::render_summary(&report, &args.report));

    if report.has_failures() {
        std::process::exit(1);
    }
}
