//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::context::ServerContext;
use crate::tools::cache::{CacheGetParams, CacheKeysParams, get_impl, keys_impl};
use crate::tools::sw_fetch::{SwFetchParams, fetch_impl};
use crate::tools::sw_lifecycle::{SwUpdateParams, activate_impl, status_impl, update_impl};

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

/// The main MCP server handler for shellcache.
#[derive(Clone)]
pub struct ShellCacheServer {
    tool_router: ToolRouter<Self>,
    ctx: Arc<ServerContext>,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl ShellCacheServer {
    /// Create a new server handler.
    pub fn new(ctx: Arc<ServerContext>) -> Self {
        Self { tool_router: Self::tool_router(), ctx }
    }

    /// Dispatch a request through the active cache proxy.
    #[tool(
        description = "Fetch a URL through the offline cache proxy (navigations network-first, other GETs cache-first)."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.ctx, params.0).await
    }

    /// Install a new cache generation and activate it.
    #[tool(
        description = "Install and pre-cache a new app shell generation; activates it unless skip_waiting is false."
    )]
    async fn sw_update(&self, params: Parameters<SwUpdateParams>) -> Result<CallToolResult, McpError> {
        update_impl(&self.ctx, params.0).await
    }

    #[tool(description = "Activate the waiting cache generation, if any, and delete every other generation.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.ctx).await
    }

    #[tool(description = "Report the active and waiting cache generations and whether clients are controlled.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.ctx).await
    }

    #[tool(description = "Read a cached response by URL from a cache generation (default: the active one).")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.ctx, params.0).await
    }

    #[tool(description = "List the entries stored in a cache generation (default: the active one).")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(&self.ctx, params.0).await
    }
}

impl ServerHandler for ShellCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shellcache".into(),
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
