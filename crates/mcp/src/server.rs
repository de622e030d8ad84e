//! MCP server: exposes a [`ToolRegistry`] and [`ResourceRegistry`] over JSON-RPC.
//!
//! [`McpServer::handle_message`] is transport-agnostic; [`router`] mounts it
//! as a streamable HTTP endpoint at `POST /mcp`, and [`serve_stdio`] speaks
//! newline-delimited JSON-RPC on stdin/stdout.

use crate::protocol::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, IncomingMessage, JsonRpcResponse,
    METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION, RESOURCE_NOT_FOUND,
};
use agentbridge_core::action::coerce_to_string;
use agentbridge_core::error::ToolError;
use agentbridge_core::tool::{Resource, ResourceRegistry, Tool, ToolRegistry};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

pub struct McpServer {
    name: String,
    version: String,
    tools: ToolRegistry,
    resources: ResourceRegistry,
}

impl McpServer {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            tools: ToolRegistry::new(),
            resources: ResourceRegistry::new(),
        }
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_resources(mut self, resources: ResourceRegistry) -> Self {
        self.resources = resources;
        self
    }

    pub fn register_tool(&mut self, tool: Box<dyn Tool>) {
        self.tools.register(tool);
    }

    pub fn register_resource(&mut self, resource: Box<dyn Resource>) {
        self.resources.register(resource);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle one JSON-RPC message. Returns `None` for notifications.
    pub async fn handle_message(&self, message: Value) -> Option<Value> {
        let incoming: IncomingMessage = match serde_json::from_value(message) {
            Ok(m) => m,
            Err(e) => {
                let reply = JsonRpcResponse::failure(None, INVALID_REQUEST, e.to_string());
                return serde_json::to_value(reply).ok();
            }
        };

        let Some(id) = incoming.id else {
            debug!(method = %incoming.method, "MCP notification");
            return None;
        };

        let params = incoming.params.unwrap_or(Value::Null);
        let reply = match self.dispatch(&incoming.method, params).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err((code, message)) => {
                debug!(method = %incoming.method, code, %message, "MCP request failed");
                JsonRpcResponse::failure(Some(id), code, message)
            }
        };
        serde_json::to_value(reply).ok()
    }

    async fn dispatch(&self, method: &str, params: Value) -> Result<Value, (i64, String)> {
        match method {
            "initialize" => Ok(self.initialize_result()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.list_tools()),
            "tools/call" => self.call_tool(params).await,
            "resources/list" => Ok(self.list_resources()),
            "resources/read" => self.read_resource(params).await,
            other => Err((METHOD_NOT_FOUND, format!("Method not found: {other}"))),
        }
    }

    fn initialize_result(&self) -> Value {
        let mut capabilities = json!({ "tools": { "listChanged": false } });
        if !self.resources.is_empty() {
            capabilities["resources"] = json!({ "subscribe": false, "listChanged": false });
        }
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": capabilities,
            "serverInfo": { "name": self.name, "version": self.version },
        })
    }

    fn list_tools(&self) -> Value {
        let tools: Vec<Value> = self
            .tools
            .definitions()
            .into_iter()
            .map(|d| {
                json!({
                    "name": d.name,
                    "description": d.description,
                    "inputSchema": d.parameters,
                })
            })
            .collect();
        json!({ "tools": tools })
    }

    async fn call_tool(&self, params: Value) -> Result<Value, (i64, String)> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or((INVALID_PARAMS, "tools/call requires a 'name'".to_string()))?;
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        match self.tools.execute(name, arguments).await {
            Ok(value) => Ok(json!({
                "content": [{ "type": "text", "text": coerce_to_string(&value) }],
                "isError": false,
            })),
            Err(ToolError::NotFound(name)) => Err((INVALID_PARAMS, format!("Unknown tool: {name}"))),
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool execution failed");
                Ok(json!({
                    "content": [{ "type": "text", "text": e.to_string() }],
                    "isError": true,
                }))
            }
        }
    }

    fn list_resources(&self) -> Value {
        let resources: Vec<Value> = self
            .resources
            .iter()
            .map(|r| {
                json!({
                    "uri": r.uri(),
                    "name": r.name(),
                    "mimeType": r.mime_type(),
                })
            })
            .collect();
        json!({ "resources": resources })
    }

    async fn read_resource(&self, params: Value) -> Result<Value, (i64, String)> {
        let uri = params
            .get("uri")
            .and_then(Value::as_str)
            .ok_or((INVALID_PARAMS, "resources/read requires a 'uri'".to_string()))?;

        let resource = self
            .resources
            .get(uri)
            .ok_or_else(|| (RESOURCE_NOT_FOUND, format!("Resource not found: {uri}")))?;

        let text = resource
            .read()
            .await
            .map_err(|e| (INTERNAL_ERROR, e.to_string()))?;

        Ok(json!({
            "contents": [{ "uri": uri, "mimeType": resource.mime_type(), "text": text }]
        }))
    }
}

/// Mount the server at `POST /mcp`.
pub fn router(server: Arc<McpServer>) -> Router {
    Router::new()
        .route("/mcp", post(handle_post))
        .with_state(server)
}

async fn handle_post(State(server): State<Arc<McpServer>>, Json(message): Json<Value>) -> Response {
    match server.handle_message(message).await {
        Some(reply) => (StatusCode::OK, Json(reply)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Serve `server` over HTTP until `shutdown` resolves.
pub async fn serve(
    server: Arc<McpServer>,
    host: &str,
    port: u16,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(name = %server.name(), "MCP server listening on http://{addr}/mcp");
    axum::serve(listener, router(server))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Serve `server` over newline-delimited JSON-RPC until `reader` hits EOF.
///
/// One message per line in, one reply per line out. Notifications get no
/// reply; unparsable lines get a JSON-RPC parse error.
pub async fn serve_lines<R, W>(server: Arc<McpServer>, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<Value>(line) {
            Ok(message) => server.handle_message(message).await,
            Err(e) => {
                warn!(error = %e, "Unparsable MCP message on stdin");
                serde_json::to_value(JsonRpcResponse::failure(None, PARSE_ERROR, e.to_string())).ok()
            }
        };

        if let Some(reply) = reply {
            let mut out = reply.to_string();
            out.push('\n');
            writer.write_all(out.as_bytes()).await?;
            writer.flush().await?;
        }
    }
    Ok(())
}

/// Serve `server` on the process's stdin/stdout until stdin closes.
pub async fn serve_stdio(server: Arc<McpServer>) -> std::io::Result<()> {
    info!(name = %server.name(), "MCP server listening on stdio");
    serve_lines(server, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    struct Add;

    #[async_trait]
    impl Tool for Add {
        fn name(&self) -> &str {
            "add"
        }
        fn description(&self) -> &str {
            "Add two numbers"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}}, "required": ["a", "b"]})
        }
        async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
            let a = arguments["a"].as_i64().ok_or_else(|| ToolError::InvalidArguments("a".into()))?;
            let b = arguments["b"].as_i64().ok_or_else(|| ToolError::InvalidArguments("b".into()))?;
            Ok(json!(a + b))
        }
    }

    struct Greeting;

    #[async_trait]
    impl Resource for Greeting {
        fn uri(&self) -> &str {
            "data://example/greeting"
        }
        fn name(&self) -> &str {
            "greeting"
        }
        fn mime_type(&self) -> &str {
            "text/plain"
        }
        async fn read(&self) -> Result<String, ToolError> {
            Ok("hello".into())
        }
    }

    fn server() -> McpServer {
        let mut server = McpServer::new("test", "1.0.0");
        server.register_tool(Box::new(Add));
        server.register_resource(Box::new(Greeting));
        server
    }

    async fn call(server: &McpServer, method: &str, params: Value) -> Value {
        server
            .handle_message(json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params}))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn initialize_advertises_capabilities() {
        let reply = call(&server(), "initialize", json!({})).await;
        assert_eq!(reply["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert!(reply["result"]["capabilities"]["resources"].is_object());
        assert_eq!(reply["result"]["serverInfo"]["name"], "test");
    }

    #[tokio::test]
    async fn no_resources_means_no_resources_capability() {
        let reply = call(&McpServer::new("bare", "1"), "initialize", json!({})).await;
        assert!(reply["result"]["capabilities"].get("resources").is_none());
    }

    #[tokio::test]
    async fn notifications_get_no_reply() {
        let reply = server()
            .handle_message(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await;
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn tools_list_and_call() {
        let server = server();
        let listed = call(&server, "tools/list", Value::Null).await;
        assert_eq!(listed["result"]["tools"][0]["name"], "add");
        assert!(listed["result"]["tools"][0]["inputSchema"]["properties"]["a"].is_object());

        let called = call(&server, "tools/call", json!({"name": "add", "arguments": {"a": 2, "b": 3}})).await;
        assert_eq!(called["result"]["isError"], false);
        assert_eq!(called["result"]["content"][0]["text"], "5");
    }

    #[tokio::test]
    async fn tool_failure_is_reported_in_band() {
        let called = call(&server(), "tools/call", json!({"name": "add", "arguments": {"a": 2}})).await;
        assert_eq!(called["result"]["isError"], true);
        assert!(called["result"]["content"][0]["text"].as_str().unwrap().contains("Invalid tool arguments"));
    }

    #[tokio::test]
    async fn unknown_tool_is_rpc_error() {
        let called = call(&server(), "tools/call", json!({"name": "nope"})).await;
        assert_eq!(called["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn resources_list_and_read() {
        let server = server();
        let listed = call(&server, "resources/list", Value::Null).await;
        assert_eq!(listed["result"]["resources"][0]["uri"], "data://example/greeting");
        assert_eq!(listed["result"]["resources"][0]["mimeType"], "text/plain");

        let read = call(&server, "resources/read", json!({"uri": "data://example/greeting"})).await;
        assert_eq!(read["result"]["contents"][0]["text"], "hello");

        let missing = call(&server, "resources/read", json!({"uri": "data://nope"})).await;
        assert_eq!(missing["error"]["code"], RESOURCE_NOT_FOUND);
    }

    #[tokio::test]
    async fn line_transport_answers_requests_in_order() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            "not json\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"add","arguments":{"a":2,"b":3}}}"#,
            "\n",
        );
        let mut output = Vec::new();

        serve_lines(Arc::new(server()), input.as_bytes(), &mut output)
            .await
            .unwrap();

        let replies: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0]["id"], 1);
        assert_eq!(replies[0]["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(replies[1]["error"]["code"], PARSE_ERROR);
        assert_eq!(replies[2]["id"], 2);
        assert!(replies[2]["result"]["content"].to_string().contains('5'));
    }

    #[tokio::test]
    async fn unknown_method() {
        let reply = call(&server(), "prompts/list", Value::Null).await;
        assert_eq!(reply["error"]["code"], METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn http_endpoint_replies_and_accepts_notifications() {
        let app = router(Arc::new(server()));

        let request = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"jsonrpc":"2.0","id":4,"method":"ping"}"#))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["id"], 4);

        let request = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
