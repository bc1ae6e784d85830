//! End-to-end JSON-RPC sessions against `DbService` over an in-memory pipe.
//!
//! Only calls that are answered before any SQL is sent are exercised here;
//! the pool points at a closed port.

use mysql_readonly_mcp::config::{DatabaseMode, DatabaseSettings, SecurityPolicy};
use mysql_readonly_mcp::db::{QueryExecutor, pool};
use mysql_readonly_mcp::mcp::DbService;
use rmcp::ServiceExt;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, WriteHalf};

struct Session {
    lines: Lines<BufReader<tokio::io::ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
    next_id: u64,
}

impl Session {
    async fn start() -> Self {
        let settings = DatabaseSettings::from_env(DatabaseMode::Test, |key| match key {
            "MYSQL_TEST_HOST" => Some("127.0.0.1".into()),
            "MYSQL_TEST_PORT" => Some("9".into()),
            "MYSQL_TEST_USER" => Some("reader".into()),
            "MYSQL_TEST_PASSWORD" => Some("pw".into()),
            _ => None,
        })
        .unwrap();
        let executor = Arc::new(QueryExecutor::new(
            pool::connect_lazy(&settings, 1, true),
            Duration::from_millis(500),
        ));
        let service = DbService::new(executor, Arc::new(SecurityPolicy::default()), None);

        let (client, server) = tokio::io::duplex(64 * 1024);
        tokio::spawn(async move {
            if let Ok(running) = service.serve(tokio::io::split(server)).await {
                let _ = running.waiting().await;
            }
        });

        let (reader, writer) = tokio::io::split(client);
        let mut session = Session {
            lines: BufReader::new(reader).lines(),
            writer,
            next_id: 0,
        };
        session
            .request(
                "initialize",
                json!({
                    "protocolVersion": "2025-03-26",
                    "capabilities": {},
                    "clientInfo": {"name": "session-test", "version": "0.0.0"}
                }),
            )
            .await;
        session
            .send(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await;
        session
    }

    async fn send(&mut self, message: Value) {
        let mut line = serde_json::to_vec(&message).unwrap();
        line.push(b'\n');
        self.writer.write_all(&line).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    /// Send a request and wait for the response carrying its id.
    async fn request(&mut self, method: &str, params: Value) -> Value {
        self.next_id += 1;
        let id = self.next_id;
        self.send(json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}))
            .await;

        loop {
            let line = tokio::time::timeout(Duration::from_secs(5), self.lines.next_line())
                .await
                .expect("response within timeout")
                .unwrap()
                .expect("server closed the pipe");
            let message: Value = serde_json::from_str(&line).unwrap();
            if message["id"] == json!(id) {
                return message;
            }
        }
    }

    async fn call_tool(&mut self, name: &str, arguments: Option<Value>) -> Value {
        let mut params = json!({ "name": name });
        if let Some(arguments) = arguments {
            params["arguments"] = arguments;
        }
        self.request("tools/call", params).await
    }
}

fn error_text(response: &Value) -> &str {
    assert!(response.get("error").is_none(), "protocol error: {response}");
    assert_eq!(response["result"]["isError"], true, "{response}");
    response["result"]["content"][0]["text"].as_str().unwrap()
}

#[tokio::test]
async fn test_describe_table_without_table_is_tool_error() {
    let mut session = Session::start().await;

    let response = session.call_tool("describe_table", Some(json!({}))).await;
    assert_eq!(
        error_text(&response),
        "Error: Invalid input: Table name is required"
    );

    let response = session
        .call_tool("describe_table", Some(json!({"table": 42})))
        .await;
    assert_eq!(
        error_text(&response),
        "Error: Invalid input: Table name is required"
    );
}

#[tokio::test]
async fn test_query_without_sql_is_tool_error() {
    let mut session = Session::start().await;

    let response = session.call_tool("query", None).await;
    assert_eq!(
        error_text(&response),
        "Error: Invalid input: SQL query is required"
    );

    let response = session
        .call_tool("query", Some(json!({"sql": ["SELECT 1"]})))
        .await;
    assert_eq!(
        error_text(&response),
        "Error: Invalid input: SQL query is required"
    );
}

#[tokio::test]
async fn test_rejected_query_is_tool_error() {
    let mut session = Session::start().await;
    let response = session
        .call_tool("query", Some(json!({"sql": "DROP TABLE customers"})))
        .await;
    assert!(error_text(&response).starts_with("Error: Query not allowed."));
}

#[tokio::test]
async fn test_unknown_tool_is_tool_error() {
    let mut session = Session::start().await;
    let response = session.call_tool("execute_sql", Some(json!({}))).await;
    assert_eq!(error_text(&response), "Error: Unknown tool: execute_sql");
}

#[tokio::test]
async fn test_tools_list_names_the_four_tools() {
    let mut session = Session::start().await;
    let response = session.request("tools/list", json!({})).await;
    let mut names: Vec<&str> = response["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    names.sort_unstable();
    assert_eq!(
        names,
        vec!["describe_table", "query", "show_tables", "table_relationships"]
    );
}
