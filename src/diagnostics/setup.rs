//! Setup validation: prerequisites, configuration, connectivity and a
//! functional smoke test, collected into a [`ValidationReport`].

use crate::config::{Cli, Config, DatabaseMode, DatabaseSettings, SecurityPolicy};
use crate::db::{SchemaInspector, SqlRunner};
use crate::diagnostics::probe::{self, ProbeReport, ServerFacts};
use crate::diagnostics::report::{Category, CheckResult, CheckStatus, ValidationReport};
use crate::error::DbError;
use crate::tools::sql_validator::{validate, validate_identifier};
use serde_json::json;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the server binary expected next to the validator.
pub const SERVER_BINARY: &str = "mysql-readonly-mcp";
pub const ENV_EXAMPLE_FILE: &str = ".env.example";

/// Expected outcome of a canonical validator case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    Accept,
    DisallowedOperation,
    QueryTooLong,
    DangerousPattern,
    InvalidIdentifier,
}

impl Expectation {
    fn matches(&self, outcome: &Result<(), DbError>) -> bool {
        match (self, outcome) {
            (Self::Accept, Ok(())) => true,
            (Self::DisallowedOperation, Err(DbError::DisallowedOperation { .. })) => true,
            (Self::QueryTooLong, Err(DbError::QueryTooLong { .. })) => true,
            (Self::DangerousPattern, Err(DbError::DangerousPattern { .. })) => true,
            (Self::InvalidIdentifier, Err(DbError::InvalidIdentifier { .. })) => true,
            _ => false,
        }
    }
}

/// A canonical input for the validator self-test.
#[derive(Debug, Clone)]
pub struct ValidatorCase {
    pub label: &'static str,
    pub input: String,
    pub identifier: bool,
    pub expected: Expectation,
}

impl ValidatorCase {
    fn query(label: &'static str, sql: impl Into<String>, expected: Expectation) -> Self {
        Self {
            label,
            input: sql.into(),
            identifier: false,
            expected,
        }
    }

    fn run(&self, policy: &SecurityPolicy) -> Result<(), DbError> {
        if self.identifier {
            validate_identifier(&self.input)
        } else {
            validate(&self.input, policy)
        }
    }
}

/// Canonical accept/reject cases, sized against `policy`.
pub fn validator_cases(policy: &SecurityPolicy) -> Vec<ValidatorCase> {
    vec![
        ValidatorCase::query(
            "Plain SELECT",
            "SELECT * FROM customers",
            Expectation::Accept,
        ),
        ValidatorCase::query("SHOW TABLES", "SHOW TABLES", Expectation::Accept),
        ValidatorCase::query(
            "Stacked DROP",
            "select * from customers; DROP TABLE customers",
            Expectation::DangerousPattern,
        ),
        ValidatorCase::query(
            "UPDATE",
            "UPDATE customers SET x=1",
            Expectation::DisallowedOperation,
        ),
        ValidatorCase::query(
            "Oversized SELECT",
            format!("SELECT {}", "x".repeat(policy.max_query_length.saturating_mul(2).max(1))),
            Expectation::QueryTooLong,
        ),
        ValidatorCase::query(
            "Line comment",
            "SELECT * FROM customers -- trailing",
            Expectation::DangerousPattern,
        ),
        ValidatorCase::query(
            "UNION SELECT",
            "SELECT id FROM a UNION SELECT password FROM users",
            Expectation::DangerousPattern,
        ),
        ValidatorCase {
            label: "Injected table name",
            input: "customers; DROP".to_string(),
            identifier: true,
            expected: Expectation::InvalidIdentifier,
        },
    ]
}

/// Collects setup checks into a report.
pub struct SetupValidator {
    mode: DatabaseMode,
    base_dir: PathBuf,
    report: ValidationReport,
}

impl SetupValidator {
    /// `base_dir` is where `.env` and `.env.example` are looked up.
    pub fn new(mode: DatabaseMode, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            base_dir: base_dir.into(),
            report: ValidationReport::new(),
        }
    }

    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    pub fn into_report(self) -> ValidationReport {
        self.report
    }

    pub fn record(&mut self, category: Category, result: CheckResult) {
        debug!(
            category = category.as_str(),
            test = %result.test,
            status = ?result.status,
            "Check recorded"
        );
        self.report.record(category, result);
    }

    pub fn check_prerequisites(&mut self, server_binary: &Path) {
        info!("Checking prerequisites");
        let binary = if server_binary.is_file() {
            CheckResult::pass(
                "Server binary",
                format!("Found {}", server_binary.display()),
            )
        } else {
            CheckResult::fail(
                "Server binary",
                format!(
                    "{} not found. Build it with `cargo build --release`",
                    server_binary.display()
                ),
            )
        };
        self.record(Category::Prerequisites, binary);

        let example = self.base_dir.join(ENV_EXAMPLE_FILE);
        let example_check = if example.is_file() {
            CheckResult::pass("Environment template", format!("Found {}", ENV_EXAMPLE_FILE))
        } else {
            CheckResult::warning(
                "Environment template",
                format!("{} not found", ENV_EXAMPLE_FILE),
            )
        };
        self.record(Category::Prerequisites, example_check);
    }

    /// Check the env file, required variables and the full configuration.
    /// Returns the loaded configuration when it is usable.
    pub fn check_configuration<F>(&mut self, env_file: &Path, cli: &Cli, env: F) -> Option<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        info!("Checking configuration");
        let env_file = if env_file.is_absolute() {
            env_file.to_path_buf()
        } else {
            self.base_dir.join(env_file)
        };
        let env_check = if env_file.is_file() {
            CheckResult::pass("Environment file", format!("Found {}", env_file.display()))
        } else {
            CheckResult::fail(
                "Environment file",
                format!(
                    "{} not found. Copy {} and fill in the credentials",
                    env_file.display(),
                    ENV_EXAMPLE_FILE
                ),
            )
        };
        self.record(Category::Configuration, env_check);

        let mut missing = Vec::new();
        let mut empty = Vec::new();
        for var in self.mode.required_env_vars() {
            match env(&var) {
                None => missing.push(var),
                Some(value) if value.trim().is_empty() => empty.push(var),
                Some(_) => {}
            }
        }
        let vars_check = if missing.is_empty() && empty.is_empty() {
            CheckResult::pass(
                "Required variables",
                format!("All {} variables are set", self.mode.env_prefix()),
            )
        } else {
            let mut message = String::new();
            if !missing.is_empty() {
                let _ = write!(message, "Missing: {}", missing.join(", "));
            }
            if !empty.is_empty() {
                if !message.is_empty() {
                    message.push_str("; ");
                }
                let _ = write!(message, "Empty: {}", empty.join(", "));
            }
            CheckResult::fail("Required variables", message)
                .with_details(json!({ "missing": missing, "empty": empty }))
        };
        self.record(Category::Configuration, vars_check);

        match Config::load(cli, env) {
            Ok(config) => {
                self.record(
                    Category::Configuration,
                    CheckResult::pass(
                        "Configuration load",
                        format!("{} profile targets {}", self.mode, config.database.display_target()),
                    ),
                );
                Some(config)
            }
            Err(e) => {
                let mut result = CheckResult::fail("Configuration load", e.to_string());
                if let Some(suggestion) = e.suggestion() {
                    result = result.with_details(json!({ "suggestion": suggestion }));
                }
                self.record(Category::Configuration, result);
                None
            }
        }
    }

    /// Record the outcome of a connection probe. Returns whether it succeeded.
    pub fn record_probe(&mut self, probe: &ProbeReport) -> bool {
        let name = format!("{} connection", probe.mode);
        let result = match &probe.outcome {
            Ok(facts) => {
                let mut details = serde_json::to_value(facts).unwrap_or_default();
                if let Some(map) = details.as_object_mut() {
                    map.insert("duration_ms".into(), json!(probe.duration_ms));
                }
                CheckResult::pass(
                    name,
                    format!("Connected to MySQL {} in {}ms", facts.version, probe.duration_ms),
                )
                .with_details(details)
            }
            Err(message) => CheckResult::fail(name, message.clone()),
        };
        self.record(Category::Connections, result);

        if let Ok(ServerFacts {
            table_count_warning: Some(warning),
            ..
        }) = &probe.outcome
        {
            self.record(
                Category::Connections,
                CheckResult::warning("Table count", warning.clone()),
            );
        }
        probe.is_success()
    }

    pub async fn check_connection(&mut self, settings: &DatabaseSettings) -> bool {
        info!(target = %settings.display_target(), "Checking connection");
        let report = probe::probe(settings).await;
        self.record_probe(&report)
    }

    /// Run every canonical case through the validator.
    pub fn check_validator(&mut self, policy: &SecurityPolicy) {
        info!("Running validator self-test");
        for case in validator_cases(policy) {
            let outcome = case.run(policy);
            let name = format!("Validator: {}", case.label);
            let result = if case.expected.matches(&outcome) {
                CheckResult::pass(name, format!("{:?} as expected", case.expected))
            } else {
                let got = match &outcome {
                    Ok(()) => "accepted".to_string(),
                    Err(e) => e.to_string(),
                };
                CheckResult::fail(name, format!("Expected {:?}, got {}", case.expected, got))
            };
            self.record(Category::Functionality, result);
        }
    }

    /// List tables and describe the first one through the introspector.
    pub async fn check_introspection<R: SqlRunner>(&mut self, runner: R) {
        info!("Checking schema introspection");
        let inspector = SchemaInspector::new(runner);
        let tables = match inspector.list_tables().await {
            Ok(tables) => {
                self.record(
                    Category::Functionality,
                    CheckResult::pass("Show tables", format!("Found {} tables", tables.len())),
                );
                tables
            }
            Err(e) => {
                self.record(
                    Category::Functionality,
                    CheckResult::warning("Show tables", e.to_string()),
                );
                return;
            }
        };

        let Some(first) = tables.first() else {
            self.record(
                Category::Functionality,
                CheckResult::warning("Describe table", "No tables to describe"),
            );
            return;
        };
        let result = match inspector.describe_table(first).await {
            Ok(structure) => CheckResult::pass(
                "Describe table",
                format!(
                    "{} has {} columns and {} index entries",
                    first,
                    structure.columns.len(),
                    structure.indexes.len()
                ),
            ),
            Err(e) => CheckResult::warning("Describe table", e.to_string()),
        };
        self.record(Category::Functionality, result);
    }
}

/// Human-readable summary of a finished report.
pub fn render_summary(report: &ValidationReport, report_path: &Path) -> String {
    let s = &report.summary;
    let mut out = String::new();
    let _ = writeln!(out, "Validation summary");
    let _ = writeln!(out, "  Total:    {}", s.total_tests);
    let _ = writeln!(out, "  Passed:   {}", s.passed);
    let _ = writeln!(out, "  Failed:   {}", s.failed);
    let _ = writeln!(out, "  Warnings: {}", s.warnings);
    let _ = writeln!(out, "  Success rate: {}%", s.success_rate);

    let (heading, status) = if report.has_failures() {
        ("Failures", CheckStatus::Fail)
    } else {
        ("Warnings", CheckStatus::Warning)
    };
    let listed: Vec<_> = Category::ALL
        .iter()
        .map(|c| (c, report.with_status(*c, status)))
        .filter(|(_, checks)| !checks.is_empty())
        .collect();
    if !listed.is_empty() {
        let _ = writeln!(out, "\n{heading}:");
        for (category, checks) in listed {
            let _ = writeln!(out, "  [{}]", category.as_str());
            for check in checks {
                let _ = writeln!(out, "    - {}: {}", check.test, check.message);
            }
        }
    }

    let _ = write!(out, "\nReport written to {}", report_path.display());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["mysql-readonly-mcp"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_validator_cases_all_pass() {
        let policy = SecurityPolicy::default();
        let mut validator = SetupValidator::new(DatabaseMode::Development, ".");
        validator.check_validator(&policy);
        let report = validator.into_report();
        assert!(!report.details.functionality.is_empty());
        assert!(!report.has_failures(), "{:?}", report.details.functionality);
    }

    #[test]
    fn test_missing_and_empty_vars_are_distinguished() {
        let dir = tempfile::tempdir().unwrap();
        let mut validator = SetupValidator::new(DatabaseMode::Development, dir.path());
        let config = validator.check_configuration(
            Path::new(".env"),
            &cli(&[]),
            |key| match key {
                "MYSQL_DEV_HOST" => Some("db".into()),
                "MYSQL_DEV_USER" => Some("  ".into()),
                _ => None,
            },
        );
        assert!(config.is_none());

        let report = validator.into_report();
        let failures = report.with_status(Category::Configuration, CheckStatus::Fail);
        assert_eq!(failures.len(), 3);
        let vars = failures
            .iter()
            .find(|c| c.test == "Required variables")
            .unwrap();
        assert!(vars.message.contains("Missing: MYSQL_DEV_PORT, MYSQL_DEV_PASSWORD"));
        assert!(vars.message.contains("Empty: MYSQL_DEV_USER"));
    }

    #[test]
    fn test_zero_limits_fall_back_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "").unwrap();
        let mut validator = SetupValidator::new(DatabaseMode::Test, dir.path());
        let config = validator.check_configuration(
            Path::new(".env"),
            &cli(&["--test", "--query-timeout", "0", "--max-query-length", "0"]),
            |key| match key {
                "MYSQL_TEST_HOST" => Some("db".into()),
                "MYSQL_TEST_PORT" => Some("3308".into()),
                "MYSQL_TEST_USER" => Some("reader".into()),
                "MYSQL_TEST_PASSWORD" => Some("pw".into()),
                _ => None,
            },
        );
        let config = config.unwrap();
        assert_eq!(
            config.security.max_query_length,
            crate::config::DEFAULT_MAX_QUERY_LENGTH
        );
        let report = validator.into_report();
        assert!(!report.has_failures());
        assert_eq!(report.summary.warnings, 0);
    }

    #[test]
    fn test_prerequisites() {
        let dir = tempfile::tempdir().unwrap();
        let mut validator = SetupValidator::new(DatabaseMode::Development, dir.path());
        validator.check_prerequisites(&dir.path().join(SERVER_BINARY));
        let report = validator.into_report();
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.warnings, 1);
    }

    #[test]
    fn test_record_probe() {
        let mut validator = SetupValidator::new(DatabaseMode::Development, ".");
        let ok = validator.record_probe(&ProbeReport {
            mode: DatabaseMode::Development,
            duration_ms: 12,
            outcome: Ok(ServerFacts {
                version: "8.0.36".into(),
                database: Some("billing".into()),
                grants: 2,
                table_count: 0,
                table_count_warning: Some("Could not count tables: denied".into()),
            }),
        });
        assert!(ok);
        let failed = validator.record_probe(&ProbeReport {
            mode: DatabaseMode::Test,
            duration_ms: 3,
            outcome: Err("Connection refused".into()),
        });
        assert!(!failed);

        let report = validator.into_report();
        let connections = &report.details.connections;
        assert_eq!(connections.len(), 3);
        assert_eq!(connections[0].details.as_ref().unwrap()["duration_ms"], 12);
        assert_eq!(connections[2].test, "test connection");
    }

    #[test]
    fn test_render_summary_lists_failures() {
        let mut report = ValidationReport::new();
        report.record(Category::Prerequisites, CheckResult::pass("Server binary", "ok"));
        report.record(Category::Configuration, CheckResult::fail("Environment file", "missing"));
        report.record(Category::Functionality, CheckResult::warning("Describe table", "none"));

        let text = render_summary(&report, Path::new("validation-report.json"));
        assert!(text.contains("Failures:"));
        assert!(text.contains("[configuration]"));
        assert!(text.contains("Environment file: missing"));
        assert!(!text.contains("Describe table"));
        assert!(text.contains("Success rate: 50%"));
    }
}
