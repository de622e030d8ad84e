//! ActionProvider trait: the abstraction over the tool/resource provider.
//!
//! The provider exposes callable tools and readable resources. Its native
//! descriptors are loosely shaped (`RawTool`, `RawResource`); the agent's
//! catalog adapter turns them into the explicit `ToolSpec` / `ResourceSpec`
//! structures used for the rest of a request.

use crate::error::ActionError;
use crate::message::MessageToolCall;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Native descriptors ──────────────────────────────────────────────────

/// A tool as the provider describes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTool {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema for the tool's input, when the provider publishes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

/// A resource as the provider describes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResource {
    pub uri: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

// ── Catalog structures ──────────────────────────────────────────────────

/// One parameter of a tool, flattened out of its input schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,

    #[serde(rename = "type")]
    pub param_type: String,

    pub description: String,

    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// A tool with its parameter list. Immutable for the lifetime of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
}

/// A readable resource, projected to the two fields the loop needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub uri: String,

    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

// ── Requests and results ────────────────────────────────────────────────

/// An action the model asked for, parsed out of its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    /// A structured function call. Arguments are still the raw JSON text.
    ToolCall {
        id: String,
        name: String,
        arguments_json: String,
    },
    /// A resource read requested via the textual trigger.
    ResourceRead { uri: String },
}

impl From<&MessageToolCall> for ActionRequest {
    fn from(call: &MessageToolCall) -> Self {
        ActionRequest::ToolCall {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments_json: call.arguments.clone(),
        }
    }
}

/// The outcome of one dispatched action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    /// Wrap a provider return value. Strings pass through untouched, every
    /// other shape is rendered as JSON text.
    pub fn from_value(value: &Value) -> Self {
        Self {
            success: true,
            payload: coerce_to_string(value),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: details.into(),
            error: Some(error.into()),
        }
    }

    /// The single textual form fed back to the model and recorded in traces.
    pub fn to_message_content(&self) -> String {
        if self.success {
            return self.payload.clone();
        }
        let mut body = Map::new();
        body.insert(
            "error".into(),
            Value::String(self.error.clone().unwrap_or_else(|| "unknown error".into())),
        );
        if !self.payload.is_empty() {
            body.insert("details".into(), Value::String(self.payload.clone()));
        }
        Value::Object(body).to_string()
    }
}

/// String coercion used for every provider return shape.
pub fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ── Provider trait ──────────────────────────────────────────────────────

/// The system exposing callable tools and readable resources.
///
/// Every operation is independently failable. Implementations include the
/// MCP client and the connection manager wrapping it.
#[async_trait]
pub trait ActionProvider: Send + Sync {
    async fn list_tools(&self) -> std::result::Result<Vec<RawTool>, ActionError>;

    async fn list_resources(&self) -> std::result::Result<Vec<RawResource>, ActionError>;

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> std::result::Result<Value, ActionError>;

    async fn read_resource(&self, uri: &str) -> std::result::Result<Value, ActionError>;

    /// Liveness check used before reusing a shared connection.
    async fn is_connected(&self) -> bool;

    /// Release the underlying connection.
    async fn close(&self) {}
}
