//! Demonstration tools and resources for the bundled MCP server.
//!
//! Small, deterministic capabilities that make the orchestration loop easy to
//! exercise end to end: arithmetic, greetings, the clock, a mock web search,
//! a random image link, and two static `data://` resources.

pub mod add;
pub mod cat_image;
pub mod clock;
pub mod greet;
pub mod resources;
pub mod web_search;

use agentbridge_core::tool::{ResourceRegistry, ToolRegistry};

/// Create a registry with every demonstration tool.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(add::AddTool));
    registry.register(Box::new(greet::GreetTool));
    registry.register(Box::new(clock::GetTimeTool));
    registry.register(Box::new(clock::GetTimeZoneTool));
    registry.register(Box::new(web_search::WebSearchTool));
    registry.register(Box::new(cat_image::CatImageTool));
    registry
}

/// Create a registry with the demonstration resources.
pub fn default_resources() -> ResourceRegistry {
    let mut registry = ResourceRegistry::new();
    registry.register(Box::new(resources::GreetingResource));
    registry.register(Box::new(resources::HighTemperaturePromptResource));
    registry
}
