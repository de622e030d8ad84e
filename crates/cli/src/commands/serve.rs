use std::path::Path;
use std::sync::Arc;

use agentbridge_core::event::{DomainEvent, EventBus};
use agentbridge_gateway::GatewayState;
use tracing::{debug, info, warn};

use super::{CliResult, load_config};

pub async fn run(
    config_path: Option<&Path>,
    host: Option<String>,
    port: Option<u16>,
    mcp_url: Option<String>,
) -> CliResult {
    let mut config = load_config(config_path)?;
    if let Some(host) = host {
        config.gateway.host = host;
    }
    if let Some(port) = port {
        config.gateway.port = port;
    }
    if let Some(url) = mcp_url {
        config.mcp.url = url;
    }
    config
        .validate()
        .map_err(|e| format!("Invalid configuration: {e}"))?;

    if !config.has_api_key() {
        warn!(provider = %config.model.provider, "No API key configured; model calls will likely fail");
    }

    let event_bus = Arc::new(EventBus::default());
    spawn_event_logger(&event_bus);

    let host = config.gateway.host.clone();
    let port = config.gateway.port;
    info!(
        model = %config.model.model,
        transport = ?config.mcp.transport,
        "Starting agentbridge gateway"
    );

    let state = Arc::new(GatewayState::from_config(config, event_bus)?);
    agentbridge_gateway::start(state, &host, port).await?;
    Ok(())
}

/// Log every domain event at debug level until the bus closes.
fn spawn_event_logger(event_bus: &EventBus) {
    let mut rx = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => log_event(&event),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event logger lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

fn log_event(event: &DomainEvent) {
    match event {
        DomainEvent::ModelResponded {
            iteration,
            model,
            tool_calls,
            ..
        } => debug!(iteration, model = %model, tool_calls, "Model responded"),
        DomainEvent::ToolExecuted {
            tool_name,
            success,
            duration_ms,
            ..
        } => debug!(tool = %tool_name, success, duration_ms, "Tool executed"),
        DomainEvent::ResourceRead { uri, success, .. } => {
            debug!(uri = %uri, success, "Resource read")
        }
        DomainEvent::IterationBudgetExhausted { max_iterations, .. } => {
            debug!(max_iterations, "Iteration budget exhausted")
        }
        DomainEvent::ConnectionStateChanged { target, state, .. } => {
            debug!(endpoint = %target, state = %state, "Connection state changed")
        }
    }
}
