//! `tools` and `resources`: print what the provider currently advertises.

use std::path::Path;
use std::sync::Arc;

use agentbridge_agent::Catalog;
use agentbridge_core::event::EventBus;
use agentbridge_gateway::wiring::connection_from_config;

use super::{CliResult, apply_embedded, load_config};

pub async fn tools(config_path: Option<&Path>, embedded: bool) -> CliResult {
    let mut config = load_config(config_path)?;
    apply_embedded(&mut config, embedded);

    let connection = connection_from_config(&config, Arc::new(EventBus::default()))?;
    let result = Catalog::fetch_tools(connection.as_ref()).await;
    connection.shutdown().await;

    let tools = result?;
    println!("{}", serde_json::to_string_pretty(&tools)?);
    Ok(())
}

pub async fn resources(config_path: Option<&Path>, embedded: bool) -> CliResult {
    let mut config = load_config(config_path)?;
    apply_embedded(&mut config, embedded);

    let connection = connection_from_config(&config, Arc::new(EventBus::default()))?;
    let result = Catalog::fetch_resources(connection.as_ref()).await;
    connection.shutdown().await;

    let resources = result?;
    println!("{}", serde_json::to_string_pretty(&resources)?);
    Ok(())
}
