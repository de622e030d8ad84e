//! Integer addition.

use async_trait::async_trait;
use agentbridge_core::error::ToolError;
use agentbridge_core::tool::Tool;
use serde_json::{Value, json};

pub struct AddTool;

#[async_trait]
impl Tool for AddTool {
    fn name(&self) -> &str {
        "add"
    }

    fn description(&self) -> &str {
        "Add two numbers together"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "a": { "type": "integer", "description": "First addend" },
                "b": { "type": "integer", "description": "Second addend" }
            },
            "required": ["a", "b"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let a = integer_arg(&arguments, "a")?;
        let b = integer_arg(&arguments, "b")?;
        let sum = a.checked_add(b).ok_or_else(|| ToolError::ExecutionFailed {
            tool_name: "add".into(),
            reason: format!("{a} + {b} overflows"),
        })?;
        Ok(json!(sum))
    }
}

/// Accepts integers, or strings holding integers (models sometimes quote numbers).
fn integer_arg(arguments: &Value, key: &str) -> Result<i64, ToolError> {
    match arguments.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| ToolError::InvalidArguments(format!("'{key}' must be an integer"))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| ToolError::InvalidArguments(format!("'{key}' must be an integer"))),
        _ => Err(ToolError::InvalidArguments(format!("Missing '{key}' argument"))),
    }
}
