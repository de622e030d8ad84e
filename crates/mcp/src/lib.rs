//! Model Context Protocol plumbing for agentbridge.
//!
//! - [`client::McpClient`]: the concrete `ActionProvider`
//! - [`transport`]: streamable HTTP, stdio, and in-process transports
//! - [`connection::ConnectionManager`]: lazy connect, liveness, reconnect
//! - [`server::McpServer`]: serves tool and resource registries over MCP

pub mod client;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod server;
pub mod transport;

pub use client::McpClient;
pub use connection::{
    Connect, ConnectionManager, ConnectionStatus, HttpConnector, InProcessConnector,
    StdioConnector,
};
pub use error::McpError;
pub use server::McpServer;
pub use transport::{HttpTransport, InProcessTransport, McpTransport, StdioTransport};
