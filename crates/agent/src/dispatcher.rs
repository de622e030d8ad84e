//! Action dispatcher: runs one tool call or resource read against the
//! provider and turns the outcome into conversation messages and trace
//! records.
//!
//! Tool and resource failures never escape from here. They are rendered as
//! result text so the model can adapt on its next turn. Losing the shared
//! provider connection is the exception and is returned as an error.

use agentbridge_core::action::{ActionProvider, ActionRequest, ActionResult};
use agentbridge_core::error::ActionError;
use agentbridge_core::event::{DomainEvent, EventBus};
use agentbridge_core::message::{Conversation, Message};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

pub const ARGUMENT_PARSE_FAILURE: &str = "argument parse failure";
pub const TOOL_EXECUTION_FAILURE: &str = "tool execution failed";

/// One executed tool call, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRecord {
    pub tool_name: String,
    /// Parsed arguments, or the raw string when it was not valid JSON.
    pub arguments: Value,
    pub result: String,
}

/// One successful resource read, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceReadRecord {
    pub uri: String,
    pub content: String,
}

/// What applying one request added to the trace.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    ToolCall(ToolCallRecord),
    /// `None` when the read failed; the model was told, nothing is recorded.
    ResourceRead(Option<ResourceReadRecord>),
}

/// Executes actions on behalf of one request.
pub struct Dispatcher<'a> {
    actions: &'a dyn ActionProvider,
    event_bus: Option<&'a Arc<EventBus>>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(actions: &'a dyn ActionProvider, event_bus: Option<&'a Arc<EventBus>>) -> Self {
        Self { actions, event_bus }
    }

    /// Execute a request, returning the result without touching any
    /// conversation.
    pub async fn dispatch(&self, request: &ActionRequest) -> Result<ActionResult, ActionError> {
        match request {
            ActionRequest::ToolCall {
                name,
                arguments_json,
                ..
            } => self.call_tool(name, parse_arguments(arguments_json)).await,
            ActionRequest::ResourceRead { uri } => self.read_resource(uri).await,
        }
    }

    /// Execute a request and append its outcome to the conversation.
    ///
    /// A tool call always answers with a tool-result message keyed to its
    /// call id. A resource read answers with a user message either way, and
    /// only a successful read yields a record.
    pub async fn apply(
        &self,
        request: &ActionRequest,
        conversation: &mut Conversation,
    ) -> Result<Dispatched, ActionError> {
        match request {
            ActionRequest::ToolCall {
                id,
                name,
                arguments_json,
            } => {
                let parsed = parse_arguments(arguments_json);
                let arguments = match &parsed {
                    Ok(map) => Value::Object(map.clone()),
                    Err(_) => Value::String(arguments_json.clone()),
                };

                let content = self.call_tool(name, parsed).await?.to_message_content();
                conversation.push(Message::tool_result(id, name, content.clone()));

                Ok(Dispatched::ToolCall(ToolCallRecord {
                    tool_name: name.clone(),
                    arguments,
                    result: content,
                }))
            }
            ActionRequest::ResourceRead { uri } => {
                let result = self.read_resource(uri).await?;
                if result.success {
                    conversation.push(Message::user(format!(
                        "Content of resource {uri}:\n{}",
                        result.payload
                    )));
                    Ok(Dispatched::ResourceRead(Some(ResourceReadRecord {
                        uri: uri.clone(),
                        content: result.payload,
                    })))
                } else {
                    let reason = result.error.unwrap_or_default();
                    conversation.push(Message::user(format!(
                        "Reading resource {uri} failed: {reason}. \
                         Try a different resource or answer without it."
                    )));
                    Ok(Dispatched::ResourceRead(None))
                }
            }
        }
    }

    async fn call_tool(
        &self,
        name: &str,
        parsed: Result<Map<String, Value>, String>,
    ) -> Result<ActionResult, ActionError> {
        let arguments = match parsed {
            Ok(arguments) => arguments,
            Err(details) => {
                warn!(tool = %name, error = %details, "Could not parse tool arguments");
                return Ok(ActionResult::failure(ARGUMENT_PARSE_FAILURE, details));
            }
        };

        debug!(tool = %name, "Calling tool");
        let start = Instant::now();
        let outcome = self.actions.call_tool(name, arguments).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(value) => Ok(ActionResult::from_value(&value)),
            Err(e) if e.is_connection_failure() => {
                error!(tool = %name, error = %e, "Provider connection unavailable");
                Err(e)
            }
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool execution failed");
                Ok(ActionResult::failure(TOOL_EXECUTION_FAILURE, e.to_string()))
            }
        };

        self.publish(DomainEvent::ToolExecuted {
            tool_name: name.to_string(),
            success: matches!(&result, Ok(r) if r.success),
            duration_ms,
            timestamp: Utc::now(),
        });
        result
    }

    async fn read_resource(&self, uri: &str) -> Result<ActionResult, ActionError> {
        debug!(uri = %uri, "Reading resource");
        let result = match self.actions.read_resource(uri).await {
            Ok(value) => Ok(ActionResult::from_value(&value)),
            Err(e) if e.is_connection_failure() => {
                error!(uri = %uri, error = %e, "Provider connection unavailable");
                Err(e)
            }
            Err(e) => {
                warn!(uri = %uri, error = %e, "Resource read failed");
                Ok(ActionResult::failure(e.to_string(), ""))
            }
        };

        self.publish(DomainEvent::ResourceRead {
            uri: uri.to_string(),
            success: matches!(&result, Ok(r) if r.success),
            timestamp: Utc::now(),
        });
        result
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(bus) = self.event_bus {
            bus.publish(event);
        }
    }
}

/// Empty input means no arguments. Anything other than a JSON object is
/// rejected.
fn parse_arguments(arguments_json: &str) -> Result<Map<String, Value>, String> {
    if arguments_json.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(arguments_json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got: {other}")),
        Err(e) => Err(e.to_string()),
    }
}
