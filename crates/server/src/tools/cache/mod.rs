//! Cache inspection MCP tools.
//!
//! This module provides read access to the generation-tagged SQLite cache.

pub mod get;
pub mod keys;

pub use get::{CacheGetParams, get_impl};
pub use keys::{CacheKeysParams, keys_impl};

use crate::context::ServerContext;
use crate::error::ToolError;

/// The generation named by the caller, else the active one.
pub(crate) async fn target_generation(ctx: &ServerContext, generation: Option<String>) -> Result<String, ToolError> {
    match generation {
        Some(generation) => Ok(generation),
        None => ctx
            .host()
            .active()
            .await
            .map(|proxy| proxy.generation_id().to_string())
            .ok_or(ToolError::NoActiveGeneration),
    }
}
