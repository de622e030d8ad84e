pub mod ask;
pub mod catalog;
pub mod mcp_server;
pub mod serve;

use std::path::Path;

use agentbridge_config::{AppConfig, McpTransportKind};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Load the config file (or defaults) with environment overrides applied.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let default_path = AppConfig::config_dir().join("config.toml");
    let path = path.unwrap_or(&default_path);
    AppConfig::load_with_env(path).map_err(|e| format!("Failed to load config: {e}").into())
}

/// Switch to the bundled in-process server when asked.
pub fn apply_embedded(config: &mut AppConfig, embedded: bool) {
    if embedded {
        config.mcp.transport = McpTransportKind::Embedded;
    }
}
