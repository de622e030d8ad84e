//! The orchestration loop.

use std::sync::Arc;

use agentbridge_config::AppConfig;
use agentbridge_core::action::{ActionProvider, ActionRequest, ActionResult};
use agentbridge_core::event::{DomainEvent, EventBus};
use agentbridge_core::message::{Conversation, Message, MessageToolCall};
use agentbridge_core::provider::{Provider, ProviderRequest, ToolChoice, ToolDefinition};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::conversation::{self, ResourceTrigger};
use crate::dispatcher::{Dispatched, Dispatcher, ResourceReadRecord, ToolCallRecord};
use crate::fallback;

pub const DEFAULT_TRIGGER_TOKEN: &str = "READ_RESOURCE:";
pub const DEFAULT_RESOURCE_SCHEME: &str = "data://";
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;

/// One inbound orchestration request.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub prompt: String,
    pub system_message: Option<String>,
    pub max_iterations: u32,
    /// Advertise resources and honour the textual read trigger.
    pub enable_resources: bool,
}

impl AgentRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_message: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            enable_resources: false,
        }
    }

    pub fn with_system_message(mut self, system: impl Into<String>) -> Self {
        self.system_message = Some(system.into());
        self
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_resources(mut self, enabled: bool) -> Self {
        self.enable_resources = enabled;
        self
    }
}

/// What a finished orchestration reports back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOutcome {
    pub final_response: String,
    pub tool_calls_executed: Vec<ToolCallRecord>,
    pub resources_read: Vec<ResourceReadRecord>,
    pub iterations: u32,
    /// The budget ran out and `final_response` came from the fallback.
    #[serde(skip)]
    pub exhausted: bool,
}

/// Per-request bookkeeping. Never shared between requests.
#[derive(Debug)]
struct LoopState {
    iteration: u32,
    max_iterations: u32,
    executed_tool_calls: Vec<ToolCallRecord>,
    read_resources: Vec<ResourceReadRecord>,
}

impl LoopState {
    fn new(max_iterations: u32) -> Self {
        Self {
            iteration: 0,
            max_iterations,
            executed_tool_calls: Vec::new(),
            read_resources: Vec::new(),
        }
    }

    fn budget_left(&self) -> bool {
        self.iteration < self.max_iterations
    }

    fn finish(self, final_response: String, exhausted: bool) -> AgentOutcome {
        AgentOutcome {
            final_response,
            tool_calls_executed: self.executed_tool_calls,
            resources_read: self.read_resources,
            iterations: self.iteration,
            exhausted,
        }
    }
}

/// Drives the turn-taking between the model backend and the action
/// provider until the model answers or the iteration budget runs out.
pub struct AgentLoop {
    /// The model backend
    provider: Arc<dyn Provider>,

    /// Tools and resources
    actions: Arc<dyn ActionProvider>,

    model: String,

    temperature: f32,

    max_tokens: Option<u32>,

    /// Literal prefix the model emits to request a resource read
    trigger_token: String,

    /// Scheme prepended to bare resource paths
    resource_scheme: String,

    event_bus: Option<Arc<EventBus>>,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        actions: Arc<dyn ActionProvider>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            provider,
            actions,
            model: model.into(),
            temperature,
            max_tokens: None,
            trigger_token: DEFAULT_TRIGGER_TOKEN.into(),
            resource_scheme: DEFAULT_RESOURCE_SCHEME.into(),
            event_bus: None,
        }
    }

    /// Build a loop from the `[model]` and `[agent]` configuration sections.
    pub fn from_config(
        provider: Arc<dyn Provider>,
        actions: Arc<dyn ActionProvider>,
        config: &AppConfig,
    ) -> Self {
        let mut agent = Self::new(
            provider,
            actions,
            config.model.model.clone(),
            config.model.temperature,
        )
        .with_trigger_token(config.agent.trigger_token.clone())
        .with_resource_scheme(config.agent.resource_scheme.clone());
        agent.max_tokens = config.model.max_tokens;
        agent
    }

    /// Set the default max tokens per model response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_trigger_token(mut self, token: impl Into<String>) -> Self {
        self.trigger_token = token.into();
        self
    }

    pub fn with_resource_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.resource_scheme = scheme.into();
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Run one orchestration to completion.
    ///
    /// Fails when the catalog cannot be listed, the model backend errors, or
    /// the provider connection cannot be re-established. Tool and resource
    /// failures are fed back to the model, and an exhausted budget still
    /// produces an answer.
    pub async fn run(&self, request: AgentRequest) -> agentbridge_core::Result<AgentOutcome> {
        let trigger = if request.enable_resources {
            Some(ResourceTrigger::new(&self.trigger_token)?)
        } else {
            None
        };

        // The catalog is rebuilt from the live provider for every request.
        let (mut conversation, menu) = match &trigger {
            Some(trigger) => {
                let catalog = Catalog::fetch(self.actions.as_ref()).await?;
                let conversation = conversation::seed_with_resources(
                    &request.prompt,
                    request.system_message.as_deref(),
                    &catalog.resources,
                    trigger,
                );
                (conversation, catalog.action_menu())
            }
            None => {
                let catalog = Catalog {
                    tools: Catalog::fetch_tools(self.actions.as_ref()).await?,
                    resources: Vec::new(),
                };
                let conversation = conversation::seed_tools_only(
                    &request.prompt,
                    request.system_message.as_deref(),
                );
                (conversation, catalog.action_menu())
            }
        };

        info!(
            conversation_id = %conversation.id,
            tools = menu.len(),
            max_iterations = request.max_iterations,
            resources = request.enable_resources,
            "Starting orchestration"
        );

        let dispatcher = Dispatcher::new(self.actions.as_ref(), self.event_bus.as_ref());
        let mut state = LoopState::new(request.max_iterations);

        while state.budget_left() {
            state.iteration += 1;
            debug!(
                conversation_id = %conversation.id,
                iteration = state.iteration,
                "Agent loop iteration"
            );

            let response = self
                .provider
                .complete(self.build_request(&conversation, &menu))
                .await?;

            self.publish(DomainEvent::ModelResponded {
                conversation_id: conversation.id.to_string(),
                iteration: state.iteration,
                model: response.model.clone(),
                tool_calls: response.message.tool_calls.len(),
                timestamp: Utc::now(),
            });

            let text = response.message.content.clone();
            let tool_calls = response.message.tool_calls.clone();
            conversation.push(response.message);

            let requests = match trigger.as_ref().and_then(|t| t.detect(&text)) {
                Some(uri) => {
                    let uri = conversation::normalize_resource_uri(&uri, &self.resource_scheme);
                    debug!(uri = %uri, "Model requested a resource read");
                    answer_skipped(&tool_calls, &mut conversation);
                    vec![ActionRequest::ResourceRead { uri }]
                }
                None => tool_calls.iter().map(ActionRequest::from).collect::<Vec<_>>(),
            };

            if !requests.is_empty() {
                debug!(action_count = requests.len(), "Dispatching actions");
                for request in &requests {
                    match dispatcher.apply(request, &mut conversation).await? {
                        Dispatched::ToolCall(record) => state.executed_tool_calls.push(record),
                        Dispatched::ResourceRead(Some(record)) => state.read_resources.push(record),
                        Dispatched::ResourceRead(None) => {}
                    }
                }
                continue;
            }

            info!(
                conversation_id = %conversation.id,
                iterations = state.iteration,
                tool_calls = state.executed_tool_calls.len(),
                "Orchestration finished"
            );
            return Ok(state.finish(text, false));
        }

        warn!(
            conversation_id = %conversation.id,
            max_iterations = state.max_iterations,
            "Iteration budget exhausted, falling back to last assistant text"
        );
        self.publish(DomainEvent::IterationBudgetExhausted {
            conversation_id: conversation.id.to_string(),
            max_iterations: state.max_iterations,
            timestamp: Utc::now(),
        });

        let final_response = fallback::resolve(&conversation);
        Ok(state.finish(final_response, true))
    }

    fn build_request(&self, conversation: &Conversation, menu: &[ToolDefinition]) -> ProviderRequest {
        ProviderRequest {
            model: self.model.clone(),
            messages: conversation.messages().to_vec(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: menu.to_vec(),
            tool_choice: ToolChoice::Auto,
        }
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

/// A resource read takes precedence over structured tool calls in the same
/// turn. Each call still needs a tool-result answer for the transcript to
/// stay valid for the backend.
fn answer_skipped(tool_calls: &[MessageToolCall], conversation: &mut Conversation) {
    for call in tool_calls {
        let skipped = ActionResult::failure(
            "skipped",
            "a resource read was requested in the same turn",
        );
        conversation.push(Message::tool_result(
            &call.id,
            &call.name,
            skipped.to_message_content(),
        ));
    }
}
