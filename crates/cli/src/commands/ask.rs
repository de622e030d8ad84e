use std::path::Path;
use std::sync::Arc;

use agentbridge_agent::{AgentLoop, AgentRequest};
use agentbridge_core::event::EventBus;
use agentbridge_gateway::wiring::connection_from_config;

use super::{CliResult, apply_embedded, load_config};

pub struct AskArgs {
    pub prompt: String,
    pub system: Option<String>,
    pub max_iterations: Option<u32>,
    pub resources: bool,
    pub embedded: bool,
}

/// Run one orchestration and print the outcome as pretty JSON.
pub async fn run(config_path: Option<&Path>, args: AskArgs) -> CliResult {
    let mut config = load_config(config_path)?;
    apply_embedded(&mut config, args.embedded);

    if args.prompt.trim().is_empty() {
        return Err("prompt must not be empty".into());
    }
    let max_iterations = args
        .max_iterations
        .unwrap_or(config.agent.default_max_iterations);
    if max_iterations > config.agent.max_iterations_limit {
        return Err(format!(
            "--max-iterations must be at most {}",
            config.agent.max_iterations_limit
        )
        .into());
    }

    let event_bus = Arc::new(EventBus::default());
    let provider = agentbridge_providers::build_from_config(&config.model);
    let connection = connection_from_config(&config, event_bus.clone())?;

    let mut request = AgentRequest::new(args.prompt)
        .with_max_iterations(max_iterations)
        .with_resources(args.resources && config.agent.resource_reads);
    if let Some(system) = args.system {
        request = request.with_system_message(system);
    }

    let agent = AgentLoop::from_config(provider, connection.clone(), &config)
        .with_event_bus(event_bus);
    let result = agent.run(request).await;
    connection.shutdown().await;

    let outcome = result?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
