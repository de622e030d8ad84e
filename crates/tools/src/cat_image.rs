use async_trait::async_trait;
use agentbridge_core::error::ToolError;
use agentbridge_core::tool::Tool;
use serde_json::{Value, json};

const IMAGE_URL: &str = "https://picsum.photos/200";

pub struct CatImageTool;

#[async_trait]
impl Tool for CatImageTool {
    fn name(&self) -> &str {
        "get_cat_image"
    }

    fn description(&self) -> &str {
        "Get a link to a random image"
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _arguments: Value) -> Result<Value, ToolError> {
        Ok(Value::String(IMAGE_URL.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_image_link() {
        let result = CatImageTool.execute(json!({})).await.unwrap();
        assert_eq!(result, IMAGE_URL);
    }
}
