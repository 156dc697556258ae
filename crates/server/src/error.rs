//! Structured errors for the swcache server tools.
//!
//! Core failures convert through `swcache_core::Error`; these cover what only
//! the tool layer can get wrong.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use swcache_client::NetworkError;

/// Structured errors for the swcache server tools.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., an update that changes nothing).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The request reached the network and failed there.
    #[error("FETCH_FAILED: {0}")]
    FetchFailed(String),
}

impl From<NetworkError> for ToolError {
    fn from(err: NetworkError) -> Self {
        ToolError::FetchFailed(err.to_string())
    }
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::FetchFailed(msg) => (-32008, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
