use std::path::Path;
use std::sync::Arc;

use agentbridge_gateway::wiring::demo_server;
use tracing::{info, warn};

use super::{CliResult, load_config};
use crate::ServeTransport;

pub async fn run(
    config_path: Option<&Path>,
    host: Option<String>,
    port: Option<u16>,
    transport: ServeTransport,
) -> CliResult {
    let config = load_config(config_path)?;
    let server = Arc::new(demo_server(&config.mcp_server.name));
    info!(name = %server.name(), ?transport, "Starting bundled MCP server");

    match transport {
        // stdout carries the protocol; logs already go to stderr.
        ServeTransport::Stdio => agentbridge_mcp::server::serve_stdio(server).await?,
        ServeTransport::Http => {
            let host = host.unwrap_or(config.mcp_server.host);
            let port = port.unwrap_or(config.mcp_server.port);
            agentbridge_mcp::server::serve(server, &host, port, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "Could not install Ctrl-C handler");
                    std::future::pending::<()>().await;
                }
            })
            .await?
        }
    }
    Ok(())
}
