//! cache_keys tool implementation.
//!
//! Lists the entries stored in a cache generation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::EntryMeta;

use super::target_generation;
use crate::context::ServerContext;
use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// Generation to list. Defaults to the active generation.
    #[serde(default)]
    pub generation: Option<String>,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    pub generation: String,
    pub entries: Vec<EntryMeta>,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(ctx: &ServerContext, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    let generation = target_generation(ctx, params.generation).await?;
    let entries = ctx.db().store(&generation).keys().await?;

    json_result(&CacheKeysOutput { generation, entries })
}
