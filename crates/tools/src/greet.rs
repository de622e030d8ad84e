//! Localised greeting.

use async_trait::async_trait;
use agentbridge_core::error::ToolError;
use agentbridge_core::tool::Tool;
use serde_json::{Value, json};

pub struct GreetTool;

const DEFAULT_LANGUAGE: &str = "English";

#[async_trait]
impl Tool for GreetTool {
    fn name(&self) -> &str {
        "greet"
    }

    fn description(&self) -> &str {
        "Greet a user by name in the requested language (English, Chinese, or Japanese)"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Who to greet" },
                "language": {
                    "type": "string",
                    "description": "Language of the greeting",
                    "default": DEFAULT_LANGUAGE
                }
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let name = arguments["name"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'name' argument".into()))?;
        let language = arguments["language"].as_str().unwrap_or(DEFAULT_LANGUAGE);

        Ok(Value::String(greeting(name, language)))
    }
}

/// Unknown languages fall back to English.
fn greeting(name: &str, language: &str) -> String {
    match language.to_lowercase().as_str() {
        "chinese" | "中文" => format!("你好，{name}！"),
        "japanese" | "日本語" => format!("こんにちは、{name}さん！"),
        _ => format!("Hello, {name}!"),
    }
}
