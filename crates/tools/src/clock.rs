//! Local clock tools.

use async_trait::async_trait;
use agentbridge_core::error::ToolError;
use agentbridge_core::tool::Tool;
use chrono::Local;
use serde_json::{Value, json};

fn no_parameters() -> Value {
    json!({ "type": "object", "properties": {} })
}

pub struct GetTimeTool;

#[async_trait]
impl Tool for GetTimeTool {
    fn name(&self) -> &str {
        "get_time"
    }

    fn description(&self) -> &str {
        "Get the current local date and time (YYYY-MM-DD HH:MM:SS)"
    }

    fn parameters_schema(&self) -> Value {
        no_parameters()
    }

    async fn execute(&self, _arguments: Value) -> Result<Value, ToolError> {
        Ok(Value::String(Local::now().format("%Y-%m-%d %H:%M:%S").to_string()))
    }
}

pub struct GetTimeZoneTool;

#[async_trait]
impl Tool for GetTimeZoneTool {
    fn name(&self) -> &str {
        "get_time_zone"
    }

    fn description(&self) -> &str {
        "Get the server's current UTC offset"
    }

    fn parameters_schema(&self) -> Value {
        no_parameters()
    }

    async fn execute(&self, _arguments: Value) -> Result<Value, ToolError> {
        Ok(Value::String(format!("UTC{}", Local::now().format("%:z"))))
    }
}
