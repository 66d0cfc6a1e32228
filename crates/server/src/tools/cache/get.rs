//! cache_get tool implementation.
//!
//! Retrieves a cached response by URL.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::resolve;
use shellcache_core::{Error, ProxyRequest};
use url::Url;

use crate::context::ServerContext;
use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// URL or origin-relative path of the cached GET request.
    pub url: String,

    /// Generation to read from. Defaults to the active generation, or to
    /// every stored generation (oldest first) when none is active.
    #[serde(default)]
    pub generation: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub url: String,
    pub generation: Option<String>,
    pub status: u16,
    pub content_type: Option<String>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(ctx: &ServerContext, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let origin = Url::parse(&ctx.config().origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let url = resolve(&origin, &params.url).map_err(|e| ToolError::InvalidInput(format!("{}: {e}", params.url)))?;
    let request = ProxyRequest::get(url);

    let (generation, hit) = match params.generation {
        Some(generation) => {
            let hit = ctx.db().store(&generation).match_request(&request).await?;
            (Some(generation), hit)
        }
        None => match ctx.host().active().await {
            Some(proxy) => (Some(proxy.generation_id().to_string()), proxy.store().match_request(&request).await?),
            None => (None, ctx.db().match_any(&request).await?),
        },
    };

    let response = hit.ok_or_else(|| Error::CacheMiss(request.url.to_string()))?;

    json_result(&CacheGetOutput {
        url: request.url.to_string(),
        generation,
        status: response.status,
        content_type: response.content_type().map(str::to_string),
        body: response.text(),
    })
}
