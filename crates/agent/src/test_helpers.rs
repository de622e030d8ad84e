//! Shared test doubles for the model backend and the action provider.

use agentbridge_core::action::{ActionProvider, RawResource, RawTool};
use agentbridge_core::error::{ActionError, ConnectionError, ProviderError};
use agentbridge_core::message::{Message, MessageToolCall};
use agentbridge_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use serde_json::{Map, Value, json};
use std::sync::Mutex;

/// A model backend that replays a queue of scripted outcomes.
///
/// Each call to `complete` returns the next entry and records the request.
/// Panics if more calls are made than entries provided.
pub struct ScriptedProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::with_outcomes(responses.into_iter().map(Ok).collect())
    }

    pub fn with_outcomes(outcomes: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(outcomes),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that requests the same tool call on every turn.
    pub fn always_tool_call(name: &str, args: Value, turns: usize) -> Self {
        Self::new(
            (0..turns)
                .map(|i| {
                    let mut call = make_tool_call(name, args.clone());
                    call.id = format!("call_{name}_{i}");
                    make_tool_call_response(vec![call], "")
                })
                .collect(),
        )
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            panic!(
                "ScriptedProvider: no more responses (call #{})",
                requests.len() + 1
            );
        }
        requests.push(request);
        responses.remove(0)
    }
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Create a response with tool calls and optional text content.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text).with_tool_calls(tool_calls),
        usage: None,
        model: "mock-model".into(),
    }
}

pub fn make_tool_call(name: &str, args: Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: args.to_string(),
    }
}

pub fn make_raw_tool_call(id: &str, name: &str, arguments: &str) -> MessageToolCall {
    MessageToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }
}

/// In-memory action provider with an `add` tool and one greeting resource.
/// Any other tool name fails. Every call is recorded.
#[derive(Default)]
pub struct FakeActions {
    pub tool_calls: Mutex<Vec<(String, Map<String, Value>)>>,
    pub resource_reads: Mutex<Vec<String>>,
    pub fail_listing: bool,
    /// Listing works, but every call and read reports a failed reconnect.
    pub connection_lost: bool,
}

impl FakeActions {
    pub fn failing_listing() -> Self {
        Self {
            fail_listing: true,
            ..Self::default()
        }
    }

    pub fn connection_lost() -> Self {
        Self {
            connection_lost: true,
            ..Self::default()
        }
    }

    fn reconnect_failure() -> ActionError {
        ActionError::Connection(ConnectionError::ReconnectFailed {
            target: "fake".into(),
            reason: "connection refused".into(),
        })
    }

    pub fn tool_call_count(&self) -> usize {
        self.tool_calls.lock().unwrap().len()
    }

    pub fn read_uris(&self) -> Vec<String> {
        self.resource_reads.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ActionProvider for FakeActions {
    async fn list_tools(&self) -> Result<Vec<RawTool>, ActionError> {
        if self.fail_listing {
            return Err(ActionError::ListFailed {
                what: "tools",
                reason: "server exploded".into(),
            });
        }
        Ok(vec![RawTool {
            name: "add".into(),
            title: None,
            description: Some("Add two numbers".into()),
            input_schema: Some(json!({
                "type": "object",
                "properties": {
                    "a": {"type": "integer"},
                    "b": {"type": "integer"}
                },
                "required": ["a", "b"]
            })),
        }])
    }

    async fn list_resources(&self) -> Result<Vec<RawResource>, ActionError> {
        Ok(vec![RawResource {
            uri: "data://example/greeting".into(),
            name: Some("greeting".into()),
            description: None,
            mime_type: Some("application/json".into()),
        }])
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, ActionError> {
        if self.connection_lost {
            return Err(Self::reconnect_failure());
        }
        self.tool_calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));
        match name {
            "add" => {
                let a = arguments.get("a").and_then(Value::as_i64).unwrap_or(0);
                let b = arguments.get("b").and_then(Value::as_i64).unwrap_or(0);
                Ok(json!([{"type": "text", "text": (a + b).to_string()}]))
            }
            other => Err(ActionError::ToolFailed {
                tool_name: other.to_string(),
                reason: "unknown tool".into(),
            }),
        }
    }

    async fn read_resource(&self, uri: &str) -> Result<Value, ActionError> {
        if self.connection_lost {
            return Err(Self::reconnect_failure());
        }
        self.resource_reads.lock().unwrap().push(uri.to_string());
        if uri == "data://example/greeting" {
            Ok(json!(r#"{"message": "hello"}"#))
        } else {
            Err(ActionError::ResourceFailed {
                uri: uri.to_string(),
                reason: "not found".into(),
            })
        }
    }

    async fn is_connected(&self) -> bool {
        true
    }
}
