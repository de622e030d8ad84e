//! Connection manager: the shared, lazily established provider handle.
//!
//! The first request to need the provider connects; later requests reuse the
//! handle after a liveness check. A dead handle is torn down and rebuilt. All
//! transitions happen under one async mutex, so racing requests never see a
//! half-initialized connection.

use crate::client::McpClient;
use crate::error::McpError;
use crate::server::McpServer;
use crate::transport::{HttpTransport, InProcessTransport, McpTransport, StdioTransport};
use agentbridge_core::action::{ActionProvider, RawResource, RawTool};
use agentbridge_core::error::{ActionError, ConnectionError};
use agentbridge_core::event::{DomainEvent, EventBus};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Something able to establish a fresh provider connection.
#[async_trait]
pub trait Connect: Send + Sync {
    /// Human-readable description of where this connects (for logs and errors).
    fn target(&self) -> String;

    async fn connect(&self) -> Result<Arc<dyn ActionProvider>, McpError>;
}

/// Streamable HTTP connector.
pub struct HttpConnector {
    pub url: String,
    pub timeout: Duration,
}

#[async_trait]
impl Connect for HttpConnector {
    fn target(&self) -> String {
        self.url.clone()
    }

    async fn connect(&self) -> Result<Arc<dyn ActionProvider>, McpError> {
        let transport: Arc<dyn McpTransport> = Arc::new(HttpTransport::new(&self.url, self.timeout));
        Ok(Arc::new(McpClient::connect(transport).await?))
    }
}

/// Child-process connector.
pub struct StdioConnector {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub timeout: Duration,
}

#[async_trait]
impl Connect for StdioConnector {
    fn target(&self) -> String {
        format!("stdio:{}", self.command)
    }

    async fn connect(&self) -> Result<Arc<dyn ActionProvider>, McpError> {
        let transport: Arc<dyn McpTransport> =
            Arc::new(StdioTransport::spawn(&self.command, &self.args, &self.env)?.with_timeout(self.timeout));
        Ok(Arc::new(McpClient::connect(transport).await?))
    }
}

/// In-process connector bound to a bundled server.
pub struct InProcessConnector {
    pub server: Arc<McpServer>,
}

#[async_trait]
impl Connect for InProcessConnector {
    fn target(&self) -> String {
        format!("in-process:{}", self.server.name())
    }

    async fn connect(&self) -> Result<Arc<dyn ActionProvider>, McpError> {
        let transport: Arc<dyn McpTransport> = Arc::new(InProcessTransport::new(self.server.clone()));
        Ok(Arc::new(McpClient::connect(transport).await?))
    }
}

enum ConnectionState {
    Uninitialized,
    Connected(Arc<dyn ActionProvider>),
    Failed(String),
    ShutDown,
}

/// Externally visible connection status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ConnectionStatus {
    Uninitialized,
    Connected,
    Failed(String),
    ShutDown,
}

impl ConnectionStatus {
    fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Uninitialized => "uninitialized",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Failed(_) => "failed",
            ConnectionStatus::ShutDown => "shut_down",
        }
    }
}

pub struct ConnectionManager {
    connector: Box<dyn Connect>,
    state: Mutex<ConnectionState>,
    events: Option<Arc<EventBus>>,
}

impl ConnectionManager {
    pub fn new(connector: Box<dyn Connect>) -> Self {
        Self {
            connector,
            state: Mutex::new(ConnectionState::Uninitialized),
            events: None,
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn target(&self) -> String {
        self.connector.target()
    }

    fn publish(&self, status: &ConnectionStatus) {
        if let Some(bus) = &self.events {
            bus.publish(DomainEvent::ConnectionStateChanged {
                target: self.connector.target(),
                state: status.label().to_string(),
                timestamp: chrono::Utc::now(),
            });
        }
    }

    /// Get a live handle, connecting or reconnecting as needed.
    pub async fn acquire(&self) -> Result<Arc<dyn ActionProvider>, ConnectionError> {
        let mut state = self.state.lock().await;

        let reconnecting = match &*state {
            ConnectionState::Connected(handle) => {
                if handle.is_connected().await {
                    return Ok(handle.clone());
                }
                warn!(endpoint = %self.connector.target(), "Provider connection lost, reconnecting");
                handle.close().await;
                true
            }
            ConnectionState::ShutDown => return Err(ConnectionError::ShutDown),
            ConnectionState::Uninitialized | ConnectionState::Failed(_) => false,
        };

        match self.connector.connect().await {
            Ok(handle) => {
                info!(endpoint = %self.connector.target(), "Provider connection established");
                *state = ConnectionState::Connected(handle.clone());
                self.publish(&ConnectionStatus::Connected);
                Ok(handle)
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(endpoint = %self.connector.target(), error = %reason, "Provider connection failed");
                *state = ConnectionState::Failed(reason.clone());
                self.publish(&ConnectionStatus::Failed(reason.clone()));

                let target = self.connector.target();
                Err(if reconnecting {
                    ConnectionError::ReconnectFailed { target, reason }
                } else {
                    ConnectionError::ConnectFailed { target, reason }
                })
            }
        }
    }

    /// Current status without attempting to connect.
    pub async fn status(&self) -> ConnectionStatus {
        let state = self.state.lock().await;
        match &*state {
            ConnectionState::Uninitialized => ConnectionStatus::Uninitialized,
            ConnectionState::Connected(handle) => {
                if handle.is_connected().await {
                    ConnectionStatus::Connected
                } else {
                    ConnectionStatus::Failed("connection lost".into())
                }
            }
            ConnectionState::Failed(reason) => ConnectionStatus::Failed(reason.clone()),
            ConnectionState::ShutDown => ConnectionStatus::ShutDown,
        }
    }

    /// Close the handle and refuse further use.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        if let ConnectionState::Connected(handle) = &*state {
            handle.close().await;
        }
        *state = ConnectionState::ShutDown;
        info!(endpoint = %self.connector.target(), "Provider connection shut down");
        self.publish(&ConnectionStatus::ShutDown);
    }
}

#[async_trait]
impl ActionProvider for ConnectionManager {
    async fn list_tools(&self) -> Result<Vec<RawTool>, ActionError> {
        self.acquire().await?.list_tools().await
    }

    async fn list_resources(&self) -> Result<Vec<RawResource>, ActionError> {
        self.acquire().await?.list_resources().await
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<Value, ActionError> {
        self.acquire().await?.call_tool(name, arguments).await
    }

    async fn read_resource(&self, uri: &str) -> Result<Value, ActionError> {
        self.acquire().await?.read_resource(uri).await
    }

    async fn is_connected(&self) -> bool {
        self.status().await == ConnectionStatus::Connected
    }

    async fn close(&self) {
        self.shutdown().await;
    }
}
