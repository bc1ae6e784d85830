//! Query logging as seen by a `tracing` subscriber.

mod common;

use common::FakeRunner;
use mysql_readonly_mcp::config::SecurityPolicy;
use mysql_readonly_mcp::tools::QueryToolHandler;
use serde_json::json;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing::subscriber::DefaultGuard;

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Route events on this thread into the buffer until the guard drops.
    fn install(&self) -> DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || sink.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    fn lines_containing(&self, needle: &str) -> Vec<String> {
        self.text()
            .lines()
            .filter(|line| line.contains(needle))
            .map(str::to_owned)
            .collect()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn long_select() -> String {
    format!("SELECT {} FROM customers", "x".repeat(150))
}

fn handler(sql: &str, log_queries: bool) -> QueryToolHandler<Arc<FakeRunner>> {
    let runner = FakeRunner::new().with_rows(sql, json!([{"x": 1}]));
    let policy = SecurityPolicy::default().with_log_queries(log_queries);
    QueryToolHandler::new(Arc::new(runner), Arc::new(policy))
}

#[tokio::test]
async fn test_accepted_query_logged_as_truncated_preview() {
    let sql = long_select();
    let logs = CapturedLogs::default();
    let _guard = logs.install();

    handler(&sql, true).run(&sql).await.unwrap();

    let lines = logs.lines_containing("Executing query");
    assert_eq!(lines.len(), 1, "{}", logs.text());
    assert!(lines[0].contains(" INFO "), "{}", lines[0]);
    let preview: String = sql.chars().take(100).collect();
    assert!(lines[0].contains(&format!("{preview}...")), "{}", lines[0]);
    assert!(!lines[0].contains("FROM customers"), "{}", lines[0]);
}

#[tokio::test]
async fn test_accepted_query_not_logged_when_disabled() {
    let sql = long_select();
    let logs = CapturedLogs::default();
    let _guard = logs.install();

    handler(&sql, false).run(&sql).await.unwrap();

    assert!(logs.lines_containing("Executing query").is_empty(), "{}", logs.text());
    assert!(!logs.text().contains("SELECT xxx"));
}

#[tokio::test]
async fn test_rejection_is_warning_and_failure_is_error() {
    let logs = CapturedLogs::default();
    let _guard = logs.install();

    let runner = FakeRunner::new().with_error("SELECT * FROM gone", "Table 'billing.gone' doesn't exist");
    let handler = QueryToolHandler::new(Arc::new(runner), Arc::new(SecurityPolicy::default()));
    handler.run("DROP TABLE customers").await.unwrap_err();
    handler.run("SELECT * FROM gone").await.unwrap_err();

    let rejected = logs.lines_containing("Query rejected");
    assert_eq!(rejected.len(), 1, "{}", logs.text());
    assert!(rejected[0].contains(" WARN "), "{}", rejected[0]);

    let failed = logs.lines_containing("Query failed");
    assert_eq!(failed.len(), 1, "{}", logs.text());
    assert!(failed[0].contains("ERROR "), "{}", failed[0]);
    assert!(failed[0].contains("doesn't exist"), "{}", failed[0]);
}
