//! Static `data://` resources.

use async_trait::async_trait;
use agentbridge_core::error::ToolError;
use agentbridge_core::tool::Resource;
use serde_json::json;

/// `data://example/greeting`: a small JSON document.
pub struct GreetingResource;

#[async_trait]
impl Resource for GreetingResource {
    fn uri(&self) -> &str {
        "data://example/greeting"
    }

    fn name(&self) -> &str {
        "greeting"
    }

    fn mime_type(&self) -> &str {
        "application/json"
    }

    async fn read(&self) -> Result<String, ToolError> {
        Ok(json!({
            "message": "Welcome to agentbridge!",
            "version": env!("CARGO_PKG_VERSION"),
        })
        .to_string())
    }
}

/// `data://example/high_temperature_prompt`: a canned prompt.
pub struct HighTemperaturePromptResource;

#[async_trait]
impl Resource for HighTemperaturePromptResource {
    fn uri(&self) -> &str {
        "data://example/high_temperature_prompt"
    }

    fn name(&self) -> &str {
        "high_temperature_prompt"
    }

    fn mime_type(&self) -> &str {
        "text/plain"
    }

    async fn read(&self) -> Result<String, ToolError> {
        Ok("You are an imaginative assistant. Favour surprising, vivid answers over safe ones.".into())
    }
}
