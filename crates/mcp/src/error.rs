//! Transport and protocol errors for MCP communication.

use agentbridge_core::error::ActionError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum McpError {
    /// The request never reached the server, or the reply never came back.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The server answered with something that is not valid MCP.
    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// The server answered with a JSON-RPC error object.
    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Failed to start MCP server process: {0}")]
    Spawn(String),

    #[error("Transport is closed")]
    Closed,
}

impl McpError {
    /// Whether this failure means the underlying connection is unusable.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, McpError::Transport(_) | McpError::Closed)
    }
}

impl From<McpError> for ActionError {
    fn from(err: McpError) -> Self {
        if err.is_disconnect() {
            ActionError::Disconnected(err.to_string())
        } else {
            ActionError::Protocol(err.to_string())
        }
    }
}
