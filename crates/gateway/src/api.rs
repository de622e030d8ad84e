//! REST API for the orchestration loop and the provider catalog.
//!
//! Endpoints:
//!
//! - `POST /api/agent/process`: Run one orchestration
//! - `GET  /api/tools`: List tools (flattened catalog)
//! - `POST /api/tools/{name}`: Call a tool directly
//! - `GET  /api/tools/health`: Provider connection status
//! - `GET  /api/resources`: List resources
//! - `GET  /api/resources/{*path}`: Read a resource

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use agentbridge_agent::{AgentLoop, AgentOutcome, AgentRequest, Catalog, normalize_resource_uri};
use agentbridge_core::action::{ActionProvider, ResourceSpec, ToolSpec};
use agentbridge_core::error::{ActionError, Error};
use agentbridge_core::message::Message;
use agentbridge_core::provider::ProviderRequest;
use agentbridge_mcp::ConnectionStatus;

use crate::{ApiError, SharedState, api_error};

// ── Router ────────────────────────────────────────────────────────────────

pub fn api_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/agent/process", post(process_handler))
        .route("/api/tools", get(list_tools_handler))
        .route("/api/tools/health", get(tools_health_handler))
        .route("/api/tools/{name}", post(call_tool_handler))
        .route("/api/resources", get(list_resources_handler))
        .route("/api/resources/{*path}", get(read_resource_handler))
        .with_state(state)
}

// ── Error mapping ─────────────────────────────────────────────────────────

fn action_status(e: &ActionError) -> StatusCode {
    match e {
        ActionError::Connection(_) | ActionError::Disconnected(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn from_action_error(context: &str, e: ActionError) -> ApiError {
    error!(error = %e, "{context}");
    api_error(action_status(&e), format!("{context}: {e}"))
}

fn from_agent_error(e: Error) -> ApiError {
    error!(error = %e, "Agent processing failed");
    let status = match &e {
        Error::Action(inner) => action_status(inner),
        Error::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, e.to_string())
}

// ── Agent ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub prompt: String,
    #[serde(default)]
    pub system_message: Option<String>,
    #[serde(default)]
    pub max_iterations: Option<u32>,
    #[serde(default)]
    pub enable_resources: Option<bool>,
}

async fn process_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ProcessRequest>,
) -> Result<Json<AgentOutcome>, ApiError> {
    let agent_config = &state.config.agent;

    if payload.prompt.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "prompt must not be empty"));
    }
    let max_iterations = payload
        .max_iterations
        .unwrap_or(agent_config.default_max_iterations);
    if max_iterations > agent_config.max_iterations_limit {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!(
                "maxIterations must be at most {}",
                agent_config.max_iterations_limit
            ),
        ));
    }

    let mut request = AgentRequest::new(payload.prompt)
        .with_max_iterations(max_iterations)
        .with_resources(payload.enable_resources.unwrap_or(agent_config.resource_reads));
    if let Some(system) = payload.system_message {
        request = request.with_system_message(system);
    }

    info!(
        max_iterations,
        resources = request.enable_resources,
        "Agent request"
    );

    let agent = AgentLoop::from_config(
        state.provider.clone(),
        state.connection.clone(),
        &state.config,
    )
    .with_event_bus(state.event_bus.clone());

    let outcome = agent.run(request).await.map_err(from_agent_error)?;
    if outcome.exhausted {
        warn!(iterations = outcome.iterations, "Agent hit the iteration budget");
    }
    Ok(Json(outcome))
}

// ── Tools ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolListResponse {
    pub tools: Vec<ToolSpec>,
}

async fn list_tools_handler(
    State(state): State<SharedState>,
) -> Result<Json<ToolListResponse>, ApiError> {
    let tools = Catalog::fetch_tools(state.connection.as_ref())
        .await
        .map_err(|e| from_action_error("Failed to list tools", e))?;
    Ok(Json(ToolListResponse { tools }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRequest {
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub use_llm: bool,
    #[serde(default)]
    pub system_message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResponse {
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_response: Option<String>,
}

async fn call_tool_handler(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Json(payload): Json<ToolCallRequest>,
) -> Result<Json<ToolCallResponse>, ApiError> {
    info!(tool = %name, use_llm = payload.use_llm, "Direct tool call");

    let result = state
        .connection
        .call_tool(&name, payload.params.clone())
        .await
        .map_err(|e| from_action_error("Tool call failed", e))?;

    let llm_response = if payload.use_llm {
        Some(explain_result(&state, &name, &payload, &result).await)
    } else {
        None
    };

    Ok(Json(ToolCallResponse {
        result,
        llm_response,
    }))
}

/// Ask the model once to explain a tool result. Failures are reported in
/// the returned text, never as an error.
async fn explain_result(
    state: &SharedState,
    name: &str,
    payload: &ToolCallRequest,
    result: &Value,
) -> String {
    let description = match Catalog::fetch_tools(state.connection.as_ref()).await {
        Ok(tools) => tools
            .into_iter()
            .find(|t| t.name == name)
            .map(|t| t.description)
            .unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "Could not fetch tool description for explanation");
            String::new()
        }
    };

    let prompt = format!(
        "You called the tool '{name}'.\n\
         Tool description: {}\n\n\
         Arguments: {}\n\n\
         Result: {result}\n\n\
         Explain this result and add any relevant analysis or suggestions.",
        if description.is_empty() { "(none)" } else { &description },
        Value::Object(payload.params.clone()),
    );

    let mut messages = Vec::new();
    if let Some(system) = payload.system_message.as_deref().filter(|s| !s.is_empty()) {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(prompt));

    let mut request = ProviderRequest::text_only(
        state.config.model.model.clone(),
        messages,
        state.config.model.temperature,
    );
    request.max_tokens = state.config.model.max_tokens;

    match state.provider.complete(request).await {
        Ok(response) => response.message.content,
        Err(e) => {
            warn!(tool = %name, error = %e, "Result explanation failed");
            format!("LLM processing failed: {e}")
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolsHealthResponse {
    pub status: String,
    pub connected: bool,
}

async fn tools_health_handler(State(state): State<SharedState>) -> Json<ToolsHealthResponse> {
    let status = state.connection.status().await;
    let connected = status == ConnectionStatus::Connected;
    let status = match status {
        ConnectionStatus::Uninitialized => "not connected".to_string(),
        ConnectionStatus::Connected => "connected".to_string(),
        ConnectionStatus::Failed(reason) => format!("disconnected: {reason}"),
        ConnectionStatus::ShutDown => "shut down".to_string(),
    };
    Json(ToolsHealthResponse { status, connected })
}

// ── Resources ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ResourceListResponse {
    pub resources: Vec<ResourceSpec>,
}

async fn list_resources_handler(
    State(state): State<SharedState>,
) -> Result<Json<ResourceListResponse>, ApiError> {
    let resources = Catalog::fetch_resources(state.connection.as_ref())
        .await
        .map_err(|e| from_action_error("Failed to list resources", e))?;
    Ok(Json(ResourceListResponse { resources }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResourceResponse {
    pub resource: Value,
    pub uri: String,
}

async fn read_resource_handler(
    State(state): State<SharedState>,
    Path(path): Path<String>,
) -> Result<Json<ResourceResponse>, ApiError> {
    let uri = normalize_resource_uri(&path, &state.config.agent.resource_scheme);
    let resource = state
        .connection
        .read_resource(&uri)
        .await
        .map_err(|e| from_action_error("Failed to read resource", e))?;
    Ok(Json(ResourceResponse { resource, uri }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use agentbridge_core::error::ProviderError;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    #[test]
    fn failed_reconnect_maps_to_service_unavailable() {
        let err = Error::Action(ActionError::Connection(
            agentbridge_core::error::ConnectionError::ReconnectFailed {
                target: "http://127.0.0.1:8001/mcp".into(),
                reason: "connection refused".into(),
            },
        ));
        let (status, Json(body)) = from_agent_error(err);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.error.contains("reconnecting failed"));
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn process_runs_tool_then_answers() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(tool_call("add", r#"{"a": 2, "b": 3}"#)),
            Ok(Message::assistant("2 + 3 = 5")),
        ]));
        let app = api_router(embedded_state(provider.clone()));

        let response = app
            .oneshot(post_json(
                "/api/agent/process",
                json!({"prompt": "What is 2+3?", "enableResources": false}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["finalResponse"], "2 + 3 = 5");
        assert_eq!(json["iterations"], 2);
        assert_eq!(json["toolCallsExecuted"][0]["toolName"], "add");
        assert_eq!(json["toolCallsExecuted"][0]["arguments"], json!({"a": 2, "b": 3}));
        assert!(json["toolCallsExecuted"][0]["result"].as_str().unwrap().contains('5'));
        assert_eq!(json["resourcesRead"], json!([]));
    }

    #[tokio::test]
    async fn process_reads_resource_when_enabled() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(Message::assistant("READ_RESOURCE: example/greeting")),
            Ok(Message::assistant("It says welcome.")),
        ]));
        let app = api_router(embedded_state(provider.clone()));

        let response = app
            .oneshot(post_json(
                "/api/agent/process",
                json!({"prompt": "What does the greeting say?", "systemMessage": "Be brief."}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["iterations"], 2);
        assert_eq!(json["resourcesRead"][0]["uri"], "data://example/greeting");
        assert!(
            json["resourcesRead"][0]["content"]
                .as_str()
                .unwrap()
                .contains("Welcome")
        );

        let requests = provider.requests.lock().unwrap();
        assert!(requests[0].messages[0].content.starts_with("Be brief."));
    }

    #[tokio::test]
    async fn process_rejects_budget_over_limit() {
        let app = api_router(embedded_state(Arc::new(ScriptedProvider::new(vec![]))));

        let response = app
            .oneshot(post_json(
                "/api/agent/process",
                json!({"prompt": "hi", "maxIterations": 26}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("25"));
    }

    #[tokio::test]
    async fn process_rejects_empty_prompt() {
        let app = api_router(embedded_state(Arc::new(ScriptedProvider::new(vec![]))));

        let response = app
            .oneshot(post_json("/api/agent/process", json!({"prompt": "  "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn process_model_failure_is_500() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(
            ProviderError::AuthenticationFailed("bad key".into()),
        )]));
        let app = api_router(embedded_state(provider));

        let response = app
            .oneshot(post_json("/api/agent/process", json!({"prompt": "hi"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("bad key"));
    }

    #[tokio::test]
    async fn process_without_provider_connection_is_503() {
        let app = api_router(unreachable_state());

        let response = app
            .oneshot(post_json("/api/agent/process", json!({"prompt": "hi"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert!(!json["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_tools_returns_flattened_catalog() {
        let app = api_router(embedded_state(Arc::new(ScriptedProvider::new(vec![]))));

        let response = app.oneshot(get("/api/tools")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: ToolListResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(json.tools.len(), 6);
        let greet = json.tools.iter().find(|t| t.name == "greet").unwrap();
        let language = greet.parameters.iter().find(|p| p.name == "language").unwrap();
        assert!(!language.required);
        assert_eq!(language.default, Some(json!("English")));
    }

    #[tokio::test]
    async fn call_tool_directly() {
        let app = api_router(embedded_state(Arc::new(ScriptedProvider::new(vec![]))));

        let response = app
            .oneshot(post_json("/api/tools/add", json!({"params": {"a": 4, "b": 5}})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["result"][0]["text"], "9");
        assert!(json.get("llmResponse").is_none());
    }

    #[tokio::test]
    async fn call_tool_with_explanation() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(Message::assistant(
            "The sum of 4 and 5 is 9.",
        ))]));
        let app = api_router(embedded_state(provider.clone()));

        let response = app
            .oneshot(post_json(
                "/api/tools/add",
                json!({"params": {"a": 4, "b": 5}, "useLlm": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["llmResponse"], "The sum of 4 and 5 is 9.");

        let requests = provider.requests.lock().unwrap();
        assert!(requests[0].tools.is_empty());
        assert!(requests[0].messages[0].content.contains("Add two numbers"));
    }

    #[tokio::test]
    async fn explanation_failure_is_reported_inline() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::Timeout(
            "30s".into(),
        ))]));
        let app = api_router(embedded_state(provider));

        let response = app
            .oneshot(post_json(
                "/api/tools/add",
                json!({"params": {"a": 1, "b": 1}, "useLlm": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json["llmResponse"].as_str().unwrap().starts_with("LLM processing failed"));
    }

    #[tokio::test]
    async fn failing_tool_is_500_with_cause() {
        let app = api_router(embedded_state(Arc::new(ScriptedProvider::new(vec![]))));

        let response = app
            .oneshot(post_json("/api/tools/add", json!({"params": {"a": "x", "b": 1}})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("add"));
    }

    #[tokio::test]
    async fn tools_health_reports_connection() {
        let state = embedded_state(Arc::new(ScriptedProvider::new(vec![])));

        let response = api_router(state.clone())
            .oneshot(get("/api/tools/health"))
            .await
            .unwrap();
        let json: ToolsHealthResponse =
            serde_json::from_slice(&response.into_body().collect().await.unwrap().to_bytes())
                .unwrap();
        assert!(!json.connected);
        assert_eq!(json.status, "not connected");

        state.connection.acquire().await.unwrap();
        let response = api_router(state).oneshot(get("/api/tools/health")).await.unwrap();
        let json = body_json(response).await;
        assert_eq!(json["connected"], true);
        assert_eq!(json["status"], "connected");
    }

    #[tokio::test]
    async fn list_resources_projects_uri_and_mime_type() {
        let app = api_router(embedded_state(Arc::new(ScriptedProvider::new(vec![]))));

        let response = app.oneshot(get("/api/resources")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(
            json["resources"][0],
            json!({"uri": "data://example/greeting", "mimeType": "application/json"})
        );
    }

    #[tokio::test]
    async fn read_resource_normalizes_path() {
        let app = api_router(embedded_state(Arc::new(ScriptedProvider::new(vec![]))));

        let response = app.oneshot(get("/api/resources/example/greeting")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["uri"], "data://example/greeting");
        assert!(json["resource"].as_str().unwrap().contains("Welcome"));
    }

    #[tokio::test]
    async fn missing_resource_is_500() {
        let app = api_router(embedded_state(Arc::new(ScriptedProvider::new(vec![]))));

        let response = app.oneshot(get("/api/resources/example/nothing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("data://example/nothing"));
    }
}
