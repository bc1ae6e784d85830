//! MCP service implementation using rmcp.
//!
//! `DbService` owns the shared executor and exposes the four read-only tools
//! and two resources. Tool failures are returned as error-flagged tool
//! output, never as JSON-RPC faults.

use crate::config::SecurityPolicy;
use crate::db::QueryExecutor;
use crate::error::DbResult;
use crate::mcp::resources::{self, ResourceUri};
use crate::tools::query::{QueryInput, QueryToolHandler};
use crate::tools::schema::{DescribeTableInput, SchemaToolHandler};
use crate::tools::{ToolName, into_call_tool_result};
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::tool::{ToolCallContext, ToolRouter},
    handler::server::wrapper::Parameters,
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListResourcesResult,
        ListToolsResult, PaginatedRequestParam, ProtocolVersion, ReadResourceRequestParam,
        ReadResourceResult, ResourceContents, ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
    tool, tool_router,
};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct DbService {
    /// Shared executor over the single pool
    executor: Arc<QueryExecutor>,
    /// Read-only policy applied to the `query` tool
    policy: Arc<SecurityPolicy>,
    /// Configured database name, reported in the schema resource
    database: Option<String>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl DbService {
    pub fn new(
        executor: Arc<QueryExecutor>,
        policy: Arc<SecurityPolicy>,
        database: Option<String>,
    ) -> Self {
        Self {
            executor,
            policy,
            database,
            tool_router: Self::tool_router(),
        }
    }

    pub fn executor(&self) -> &Arc<QueryExecutor> {
        &self.executor
    }

    fn query_handler(&self) -> QueryToolHandler<Arc<QueryExecutor>> {
        QueryToolHandler::new(self.executor.clone(), self.policy.clone())
    }

    fn schema_handler(&self) -> SchemaToolHandler<Arc<QueryExecutor>> {
        SchemaToolHandler::new(self.executor.clone(), self.database.clone())
    }

    /// JSON body for a resource URI.
    async fn resource_text(&self, uri: &str) -> DbResult<String> {
        match uri.parse::<ResourceUri>()? {
            ResourceUri::Schema => self.schema_handler().schema_json().await,
            ResourceUri::Tables => self.schema_handler().tables_json().await,
        }
    }
}

#[tool_router]
impl DbService {
    #[tool(
        description = "Execute a read-only SQL query (SELECT, SHOW, DESCRIBE, EXPLAIN or DESC) and return the rows as JSON."
    )]
    async fn query(
        &self,
        Parameters(input): Parameters<QueryInput>,
    ) -> Result<CallToolResult, McpError> {
        Ok(into_call_tool_result(self.query_handler().query(input).await))
    }

    #[tool(description = "Get the structure and indexes of a table.")]
    async fn describe_table(
        &self,
        Parameters(input): Parameters<DescribeTableInput>,
    ) -> Result<CallToolResult, McpError> {
        Ok(into_call_tool_result(
            self.schema_handler().describe_table(input).await,
        ))
    }

    #[tool(description = "List all tables in the database.")]
    async fn show_tables(&self) -> Result<CallToolResult, McpError> {
        Ok(into_call_tool_result(self.schema_handler().show_tables().await))
    }

    #[tool(description = "Get the foreign key relationships between tables.")]
    async fn table_relationships(&self) -> Result<CallToolResult, McpError> {
        Ok(into_call_tool_result(
            self.schema_handler().table_relationships().await,
        ))
    }
}

impl ServerHandler for DbService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_owned(),
                title: Some("MySQL Read-Only MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Read-only access to a MySQL database.\n\
                \n\
                ## Workflow\n\
                1. Call `show_tables` to see the available tables\n\
                2. Call `describe_table` for columns and indexes, `table_relationships` for foreign keys\n\
                3. Use `query` for SELECT, SHOW, DESCRIBE, EXPLAIN or DESC statements\n\
                \n\
                ## Restrictions\n\
                - Write statements are rejected before they reach the database\n\
                - Comments (`--`, `/*`) and `UNION SELECT` are rejected\n\
                - Table names may only contain letters, digits and underscores\n\
                \n\
                ## Resources\n\
                - `mysql://schema`: every table with columns and indexes\n\
                - `mysql://tables`: the table list"
                    .to_string(),
            ),
        }
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool = match request.name.parse::<ToolName>() {
            Ok(tool) => tool,
            Err(e) => {
                warn!(tool = %request.name, "Unknown tool requested");
                return Ok(into_call_tool_result(Err(e)));
            }
        };
        if let Err(e) = tool.check_arguments(request.arguments.as_ref()) {
            warn!(tool = %tool, error = %e, "Tool call rejected");
            return Ok(into_call_tool_result(Err(e)));
        }

        debug!(tool = %request.name, "Dispatching tool call");
        let ctx = ToolCallContext::new(self, request, context);
        self.tool_router.call(ctx).await
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tool_router.list_all()))
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult::with_all_items(resources::list()))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let uri = request.uri;
        match self.resource_text(&uri).await {
            Ok(text) => {
                let mut contents = ResourceContents::text(text, uri);
                if let ResourceContents::TextResourceContents { mime_type, .. } = &mut contents {
                    *mime_type = Some(resources::JSON_MIME_TYPE.to_string());
                }
                Ok(ReadResourceResult {
                    contents: vec![contents],
                })
            }
            Err(e) => {
                warn!(uri = %uri, error = %e, "Resource read failed");
                Err(resources::read_error(&uri, e))
            }
        }
    }
}
