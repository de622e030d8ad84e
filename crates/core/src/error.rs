//! Error types for the agentbridge domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all agentbridge operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model backend errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool/resource provider errors ---
    #[error("Action provider error: {0}")]
    Action(#[from] ActionError),

    // --- Shared connection errors ---
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    // --- In-process tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of the language-model backend. Always fatal for the request.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures reported by the tool/resource provider.
///
/// Listing failures are fatal for a request; call and read failures are
/// recovered by the dispatcher and fed back to the model.
#[derive(Debug, Clone, Error)]
pub enum ActionError {
    #[error("Listing {what} failed: {reason}")]
    ListFailed { what: &'static str, reason: String },

    #[error("Tool '{tool_name}' failed: {reason}")]
    ToolFailed { tool_name: String, reason: String },

    #[error("Reading resource '{uri}' failed: {reason}")]
    ResourceFailed { uri: String, reason: String },

    #[error("Not connected: {0}")]
    Disconnected(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

impl ActionError {
    /// The shared connection could not be (re)established. Unlike a failing
    /// tool or resource, this ends the request.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, ActionError::Connection(_))
    }
}

/// Failures establishing or re-establishing the shared provider connection.
#[derive(Debug, Clone, Error)]
pub enum ConnectionError {
    #[error("Failed to connect to {target}: {reason}")]
    ConnectFailed { target: String, reason: String },

    #[error("Connection to {target} was lost and reconnecting failed: {reason}")]
    ReconnectFailed { target: String, reason: String },

    #[error("Connection is shut down")]
    ShutDown,
}

/// Failures of tools executed in-process (served by the bundled MCP server).
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),
}
