//! MCP stdio server for the knowledge base.
//!
//! Exposes three tools — `search`, `get_file`, `list_files` — over the
//! Model Context Protocol. Tool failures are returned as tool-result
//! errors, never as transport errors. Logging stays on stderr; stdout
//! belongs to the JSON-RPC framing.

use std::fmt::Write as _;
use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::schemars;
use rmcp::transport::stdio;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::kwb::Service;

pub const SERVER_NAME: &str = "kwb";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchRequest {
    /// Search query
    #[schemars(description = "Search query")]
    pub query: Option<String>,

    /// Maximum results (default: 10)
    #[schemars(description = "Maximum results (default: 10)")]
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetFileRequest {
    /// File path
    #[schemars(description = "File path")]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListFilesRequest {
    /// Filter by type: code, documentation, config
    #[schemars(description = "Filter by type: code, documentation, config")]
    pub r#type: Option<String>,
}

/// Tool dispatcher over a shared [`Service`].
///
/// Every session clones this handler; tool calls serialize through the
/// mutex so the index handle stays exclusively owned.
#[derive(Clone)]
pub struct KwbServer {
    service: Arc<Mutex<Service>>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl KwbServer {
    pub fn new(service: Service) -> Self {
        Self {
            service: Arc::new(Mutex::new(service)),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Search the knowledge base")]
    pub async fn search(
        &self,
        Parameters(request): Parameters<SearchRequest>,
    ) -> Result<CallToolResult, McpError> {
        let Some(query) = request.query.filter(|q| !q.is_empty()) else {
            return Ok(CallToolResult::error(vec![Content::text(
                "Missing query parameter",
            )]));
        };
        let limit = request.limit.filter(|l| *l > 0).unwrap_or(10);

        let mut service = self.service.lock().await;
        let results = match service.search(&query, limit).await {
            Ok(r) => r,
            Err(err) => {
                return Ok(CallToolResult::error(vec![Content::text(format!(
                    "Search error: {err}"
                ))]));
            }
        };

        Ok(CallToolResult::success(vec![Content::text(
            format_search_results(&results),
        )]))
    }

    #[tool(description = "Get full content of a specific file")]
    pub async fn get_file(
        &self,
        Parameters(request): Parameters<GetFileRequest>,
    ) -> Result<CallToolResult, McpError> {
        let Some(path) = request.path.filter(|p| !p.is_empty()) else {
            return Ok(CallToolResult::error(vec![Content::text(
                "Missing path parameter",
            )]));
        };

        let service = self.service.lock().await;
        match service.get_file(&path) {
            Ok(content) => Ok(CallToolResult::success(vec![Content::text(content)])),
            Err(err) => Ok(CallToolResult::error(vec![Content::text(format!(
                "Error reading file: {err}"
            ))])),
        }
    }

    #[tool(description = "List all indexed files")]
    pub async fn list_files(
        &self,
        Parameters(request): Parameters<ListFilesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let file_type = request.r#type.unwrap_or_default();

        let mut service = self.service.lock().await;
        let files = match service.list_files(&file_type).await {
            Ok(f) => f,
            Err(err) => {
                return Ok(CallToolResult::error(vec![Content::text(format!(
                    "Error listing files: {err}"
                ))]));
            }
        };

        Ok(CallToolResult::success(vec![Content::text(
            format_file_list(&files),
        )]))
    }
}

fn format_search_results(results: &[crate::kwb::SearchResult]) -> String {
    let mut output = format!("Found {} results:\n\n", results.len());
    for (i, result) in results.iter().enumerate() {
        let _ = writeln!(
            output,
            "{}. {} (score: {:.2}, type: {})",
            i + 1,
            result.path,
            result.score,
            result.doc_type
        );
        if !result.preview.is_empty() {
            let _ = writeln!(output, "   Preview: {}", result.preview);
        }
        output.push('\n');
    }
    output
}

fn format_file_list(files: &[String]) -> String {
    let mut output = format!("Total files: {}\n\n", files.len());
    for file in files {
        let _ = writeln!(output, "- {}", file);
    }
    output
}

#[tool_handler]
impl ServerHandler for KwbServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Knowledge base over the indexed source tree. Use 'search' to find \
                 relevant files, 'get_file' to read one, and 'list_files' to list \
                 indexed paths by type."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                title: Some("Knowledge Base".to_string()),
                version: SERVER_VERSION.to_string(),
                icons: None,
                website_url: None,
            },
            ..Default::default()
        }
    }
}

/// Serve the knowledge base over stdio until the client disconnects.
pub async fn serve(service: Service) -> anyhow::Result<()> {
    tracing::info!("starting kwb MCP server");
    let server = KwbServer::new(service).serve(stdio()).await?;
    server.waiting().await?;
    tracing::info!("kwb MCP server stopped");
    Ok(())
}
