//! Structured errors for the shellcache MCP tools.
//!
//! Failures of the cache or network surface as `shellcache_core::Error`;
//! these cover problems with the tool call itself.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Structured errors for tool arguments and server state.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid tool arguments (e.g., unresolvable URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No generation has been activated yet.
    #[error("NO_ACTIVE_GENERATION")]
    NoActiveGeneration,
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::NoActiveGeneration => (-32013, "No cache generation is active".to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_codes() {
        let invalid: McpError = ToolError::InvalidInput("bad url".into()).into();
        assert_eq!(invalid.code.0, -32602);

        let inactive: McpError = ToolError::NoActiveGeneration.into();
        assert_eq!(inactive.code.0, -32013);
    }
}
