//! Builds the shared subsystems from configuration.

use std::sync::Arc;
use std::time::Duration;

use agentbridge_config::{AppConfig, McpTransportKind};
use agentbridge_core::error::Error;
use agentbridge_core::event::EventBus;
use agentbridge_mcp::{
    Connect, ConnectionManager, HttpConnector, InProcessConnector, McpServer, StdioConnector,
};

/// The bundled MCP server with every demonstration tool and resource.
pub fn demo_server(name: &str) -> McpServer {
    McpServer::new(name, env!("CARGO_PKG_VERSION"))
        .with_tools(agentbridge_tools::default_registry())
        .with_resources(agentbridge_tools::default_resources())
}

/// Pick the connector for the configured `[mcp]` transport.
pub fn connector_from_config(config: &AppConfig) -> Result<Box<dyn Connect>, Error> {
    let mcp = &config.mcp;
    let connector: Box<dyn Connect> = match mcp.transport {
        McpTransportKind::Http => Box::new(HttpConnector {
            url: mcp.url.clone(),
            timeout: Duration::from_secs(mcp.request_timeout_secs),
        }),
        McpTransportKind::Stdio => {
            let command = mcp.command.clone().ok_or_else(|| Error::Config {
                message: "mcp.command is required for the stdio transport".into(),
            })?;
            Box::new(StdioConnector {
                command,
                args: mcp.args.clone(),
                env: mcp.env.clone(),
                timeout: Duration::from_secs(mcp.request_timeout_secs),
            })
        }
        McpTransportKind::Embedded => Box::new(InProcessConnector {
            server: Arc::new(demo_server(&config.mcp_server.name)),
        }),
    };
    Ok(connector)
}

/// A connection manager for the configured transport. Nothing connects
/// until the first request needs the provider.
pub fn connection_from_config(
    config: &AppConfig,
    event_bus: Arc<EventBus>,
) -> Result<Arc<ConnectionManager>, Error> {
    let connector = connector_from_config(config)?;
    Ok(Arc::new(ConnectionManager::new(connector).with_events(event_bus)))
}
