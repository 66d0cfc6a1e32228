//! sw_fetch tool implementation.
//!
//! Dispatches a request through the service host as a controlled client
//! would issue it.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::resolve;
use shellcache_core::{Error, ProxyRequest, RequestMode};
use url::Url;

use crate::context::ServerContext;
use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL or path relative to the configured origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Issue the request as a top-level navigation (default: false).
    #[serde(default)]
    pub navigate: bool,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub content_type: Option<String>,
    /// Which path produced the response (network, cache, fallback, ...).
    pub source: String,
    pub body_bytes: usize,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(ctx: &ServerContext, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let method = params.method.trim();
    if method.is_empty() {
        return Err(ToolError::InvalidInput("method must not be empty".into()).into());
    }

    let origin = Url::parse(&ctx.config().origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let url = resolve(&origin, &params.url).map_err(|e| ToolError::InvalidInput(format!("{}: {e}", params.url)))?;
    let mode = if params.navigate { RequestMode::Navigate } else { RequestMode::NoCors };
    let request = ProxyRequest::new(method, url, mode);

    tracing::info!(method = %request.method, url = %request.url, navigate = params.navigate, "sw_fetch");
    let dispatched = ctx.host().dispatch_fetch(&request).await?;
    let response = dispatched.response;

    json_result(&SwFetchOutput {
        url: request.url.to_string(),
        status: response.status,
        status_text: response.status_text.clone(),
        content_type: response.content_type().map(str::to_string),
        source: dispatched.source.as_str().to_string(),
        body_bytes: response.body.len(),
        body: response.text(),
    })
}
