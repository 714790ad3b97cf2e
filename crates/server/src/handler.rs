//! MCP server handler implementation.
//!
//! This module defines the server handler that hosts the offline worker
//! and routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::cache::{CacheListParams, list_impl};
use crate::tools::sw_fetch::{SwFetchParams, fetch_impl};
use crate::tools::sw_message::{SwMessageParams, message_impl};
use crate::tools::sw_status::status_impl;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use swcache_client::{Registration, WorkerConfig};
use swcache_core::CacheDb;

/// Everything the tools act on: the registration, its cache and the worker configuration.
pub struct WorkerHost {
    pub registration: Registration,
    pub cache: CacheDb,
    pub config: WorkerConfig,
}

/// The MCP server handler for swcache.
#[derive(Clone)]
pub struct SwCacheServer {
    host: Arc<WorkerHost>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SwCacheServer {
    /// Create a new server handler around a registered worker.
    pub fn new(host: WorkerHost) -> Self {
        Self { host: Arc::new(host), tool_router: Self::tool_router() }
    }

    /// Fetch a URL as a page would, through the active offline worker.
    #[tool(
        description = "Fetch a URL through the offline worker. Relative URLs resolve against the app scope. \
                       Reports whether the answer came from the cache, the network, or the offline shell page."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.host, params.0).await
    }

    /// Post a message to the worker, e.g. `{"type": "SKIP_WAITING"}`.
    #[tool(
        description = "Post a message to the waiting (or active) worker. \
                       {\"type\": \"SKIP_WAITING\"} activates a waiting worker."
    )]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.host, params.0).await
    }

    /// Report worker versions and lifecycle states.
    #[tool(description = "Show the active and waiting worker versions, their lifecycle states, and open clients.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.host).await
    }

    /// List cache stores, or the request keys of one store.
    #[tool(description = "List cache stores with entry counts; pass `store` to list the requests cached in it.")]
    async fn cache_list(&self, params: Parameters<CacheListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.host.cache, params.0).await
    }
}

impl ServerHandler for SwCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
