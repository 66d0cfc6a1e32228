//! sw_update, sw_activate and sw_status tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::HostStatus;

use crate::context::ServerContext;
use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the sw_update tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwUpdateParams {
    /// Identifier of the new cache generation (e.g. "da360-admin-v2").
    pub generation_id: String,

    /// Activate right after install (default: the deployment's setting).
    /// When false the generation waits for sw_activate.
    #[serde(default)]
    pub skip_waiting: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
struct SwStatusOutput {
    host: HostStatus,
    generations: Vec<String>,
}

/// Implementation of the sw_update tool.
pub async fn update_impl(ctx: &ServerContext, params: SwUpdateParams) -> Result<CallToolResult, McpError> {
    let generation_id = params.generation_id.trim();
    if generation_id.is_empty() {
        return Err(ToolError::InvalidInput("generation_id must not be empty".into()).into());
    }

    let proxy = ctx.proxy_for(generation_id, params.skip_waiting)?;
    let registered = ctx.host().register(proxy).await?;
    json_result(&registered)
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(ctx: &ServerContext) -> Result<CallToolResult, McpError> {
    let activation = ctx.host().activate_waiting().await?;
    json_result(&activation)
}

/// Implementation of the sw_status tool.
pub async fn status_impl(ctx: &ServerContext) -> Result<CallToolResult, McpError> {
    let host = ctx.host().status().await;
    let generations = ctx.db().generation_ids().await?;
    json_result(&SwStatusOutput { host, generations })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::offline_context;
    use crate::tools::result_text;
    use serde_json::Value;

    #[tokio::test]
    async fn test_status_before_install() {
        let ctx = offline_context().await;

        let result = status_impl(&ctx).await.unwrap();
        let output: Value = serde_json::from_str(&result_text(&result)).unwrap();

        assert!(output["host"]["active"].is_null());
        assert_eq!(output["host"]["controlling"], false);
        assert_eq!(output["generations"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_update_replaces_generation() {
        let ctx = offline_context().await;
        ctx.install_configured().await.unwrap();

        let params = SwUpdateParams { generation_id: "da360-admin-v2".into(), skip_waiting: None };
        let result = update_impl(&ctx, params).await.unwrap();
        let output: Value = serde_json::from_str(&result_text(&result)).unwrap();

        assert_eq!(output["install"]["generation"], "da360-admin-v2");
        assert_eq!(output["activation"]["removed"], serde_json::json!(["da360-admin-v1"]));

        let status = status_impl(&ctx).await.unwrap();
        let status: Value = serde_json::from_str(&result_text(&status)).unwrap();
        assert_eq!(status["host"]["active"]["generation_id"], "da360-admin-v2");
        assert_eq!(status["host"]["active"]["state"], "activated");
        assert_eq!(status["generations"], serde_json::json!(["da360-admin-v2"]));
    }

    #[tokio::test]
    async fn test_update_rejects_empty_generation() {
        let ctx = offline_context().await;
        let params = SwUpdateParams { generation_id: " ".into(), skip_waiting: None };
        let err = update_impl(&ctx, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_update_can_wait_for_activate() {
        let ctx = offline_context().await;
        ctx.install_configured().await.unwrap();

        let params = SwUpdateParams { generation_id: "da360-admin-v2".into(), skip_waiting: Some(false) };
        let result = update_impl(&ctx, params).await.unwrap();
        let output: Value = serde_json::from_str(&result_text(&result)).unwrap();
        assert!(output["activation"].is_null());

        let status = status_impl(&ctx).await.unwrap();
        let status: Value = serde_json::from_str(&result_text(&status)).unwrap();
        assert_eq!(status["host"]["active"]["generation_id"], "da360-admin-v1");
        assert_eq!(status["host"]["waiting"]["generation_id"], "da360-admin-v2");

        let result = activate_impl(&ctx).await.unwrap();
        let output: Value = serde_json::from_str(&result_text(&result)).unwrap();
        assert_eq!(output["generation"], "da360-admin-v2");
        assert_eq!(output["removed"], serde_json::json!(["da360-admin-v1"]));
    }

    #[tokio::test]
    async fn test_activate_without_waiting_generation() {
        let ctx = offline_context().await;
        let result = activate_impl(&ctx).await.unwrap();
        assert_eq!(result_text(&result), "null");
    }
}
