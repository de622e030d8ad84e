//! MCP client: the concrete tool/resource provider.
//!
//! Performs the `initialize` handshake on connect and then serves the
//! [`ActionProvider`] operations over any [`McpTransport`].

use crate::error::McpError;
use crate::protocol::{
    CallToolResult, Implementation, InitializeResult, JsonRpcRequest, ListResourcesResult,
    ListToolsResult, PROTOCOL_VERSION, ReadResourceResult, ServerCapabilities,
};
use crate::transport::McpTransport;
use agentbridge_core::action::{ActionProvider, RawResource, RawTool};
use agentbridge_core::error::ActionError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

pub struct McpClient {
    transport: Arc<dyn McpTransport>,
    request_id: AtomicU64,
    server_info: Implementation,
    capabilities: ServerCapabilities,
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient")
            .field("server", &self.server_info.name)
            .field("connected", &self.transport.is_connected())
            .finish()
    }
}

impl McpClient {
    /// Initialize a session over `transport`.
    pub async fn connect(transport: Arc<dyn McpTransport>) -> Result<Self, McpError> {
        let request_id = AtomicU64::new(1);
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "agentbridge",
                "version": env!("CARGO_PKG_VERSION"),
            },
        });

        let init: InitializeResult = request(
            transport.as_ref(),
            request_id.fetch_add(1, Ordering::SeqCst),
            "initialize",
            Some(params),
        )
        .await?;

        transport
            .send_notification("notifications/initialized", None)
            .await?;

        info!(
            server = %init.server_info.name,
            protocol = %init.protocol_version,
            "MCP session initialized"
        );

        Ok(Self {
            transport,
            request_id,
            server_info: init.server_info,
            capabilities: init.capabilities,
        })
    }

    pub fn server_info(&self) -> &Implementation {
        &self.server_info
    }

    pub fn capabilities(&self) -> &ServerCapabilities {
        &self.capabilities
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Option<Value>) -> Result<T, McpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        request(self.transport.as_ref(), id, method, params).await
    }

    /// Round-trip a `ping`.
    pub async fn ping(&self) -> Result<(), McpError> {
        let _: Value = self.request("ping", None).await?;
        Ok(())
    }

    async fn fetch_tools(&self) -> Result<Vec<RawTool>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen = HashSet::new();

        loop {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let page: ListToolsResult = self.request("tools/list", params).await?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if seen.insert(next.clone()) => cursor = Some(next),
                Some(next) => {
                    warn!(cursor = %next, "tools/list repeated a cursor, stopping");
                    break;
                }
                None => break,
            }
        }

        Ok(tools)
    }

    async fn fetch_resources(&self) -> Result<Vec<RawResource>, McpError> {
        let mut resources = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen = HashSet::new();

        loop {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let page: ListResourcesResult = self.request("resources/list", params).await?;
            resources.extend(page.resources);

            match page.next_cursor {
                Some(next) if seen.insert(next.clone()) => cursor = Some(next),
                Some(next) => {
                    warn!(cursor = %next, "resources/list repeated a cursor, stopping");
                    break;
                }
                None => break,
            }
        }

        Ok(resources)
    }
}

/// Send one request and decode its result.
async fn request<T: DeserializeOwned>(
    transport: &dyn McpTransport,
    id: u64,
    method: &str,
    params: Option<Value>,
) -> Result<T, McpError> {
    let response = transport
        .send_request(JsonRpcRequest::new(id, method, params))
        .await?;

    if let Some(error) = response.error {
        return Err(McpError::Rpc {
            code: error.code,
            message: error.message,
        });
    }

    let result = response
        .result
        .ok_or_else(|| McpError::Protocol(format!("{method} response missing result")))?;
    serde_json::from_value(result)
        .map_err(|e| McpError::Protocol(format!("malformed {method} result: {e}")))
}

/// Keep disconnects recognisable; wrap everything else with context.
fn contextualize(err: McpError, wrap: impl FnOnce(String) -> ActionError) -> ActionError {
    if err.is_disconnect() {
        err.into()
    } else {
        wrap(err.to_string())
    }
}

#[async_trait]
impl ActionProvider for McpClient {
    async fn list_tools(&self) -> Result<Vec<RawTool>, ActionError> {
        self.fetch_tools().await.map_err(|e| {
            contextualize(e, |reason| ActionError::ListFailed { what: "tools", reason })
        })
    }

    async fn list_resources(&self) -> Result<Vec<RawResource>, ActionError> {
        if self.capabilities.resources.is_none() {
            debug!(server = %self.server_info.name, "Server has no resources capability");
            return Ok(Vec::new());
        }
        self.fetch_resources().await.map_err(|e| {
            contextualize(e, |reason| ActionError::ListFailed {
                what: "resources",
                reason,
            })
        })
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<Value, ActionError> {
        let params = json!({ "name": name, "arguments": arguments });
        let result: CallToolResult = self.request("tools/call", Some(params)).await.map_err(|e| {
            contextualize(e, |reason| ActionError::ToolFailed {
                tool_name: name.to_string(),
                reason,
            })
        })?;

        if result.is_error {
            return Err(ActionError::ToolFailed {
                tool_name: name.to_string(),
                reason: result.text(),
            });
        }
        Ok(Value::Array(result.content))
    }

    async fn read_resource(&self, uri: &str) -> Result<Value, ActionError> {
        let result: ReadResourceResult = self
            .request("resources/read", Some(json!({ "uri": uri })))
            .await
            .map_err(|e| {
                contextualize(e, |reason| ActionError::ResourceFailed {
                    uri: uri.to_string(),
                    reason,
                })
            })?;
        Ok(result.into_value())
    }

    async fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    async fn close(&self) {
        if let Err(e) = self.transport.close().await {
            debug!(error = %e, "Error while closing MCP transport");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::JsonRpcResponse;
    use crate::server::McpServer;
    use crate::transport::InProcessTransport;
    use agentbridge_core::error::ToolError;
    use agentbridge_core::tool::{Resource, Tool};
    use std::sync::Mutex;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echo the text back"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {"text": {"type": "string"}}, "required": ["text"]})
        }
        async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
            arguments
                .get("text")
                .cloned()
                .ok_or_else(|| ToolError::InvalidArguments("text is required".into()))
        }
    }

    struct Note;

    #[async_trait]
    impl Resource for Note {
        fn uri(&self) -> &str {
            "data://notes/one"
        }
        fn name(&self) -> &str {
            "one"
        }
        fn mime_type(&self) -> &str {
            "text/plain"
        }
        async fn read(&self) -> Result<String, ToolError> {
            Ok("first note".into())
        }
    }

    async fn connected(with_resources: bool) -> (McpClient, Arc<InProcessTransport>) {
        let mut server = McpServer::new("test", "1.0.0");
        server.register_tool(Box::new(Echo));
        if with_resources {
            server.register_resource(Box::new(Note));
        }
        let transport = Arc::new(InProcessTransport::new(Arc::new(server)));
        let client = McpClient::connect(transport.clone()).await.unwrap();
        (client, transport)
    }

    #[tokio::test]
    async fn handshake_records_server_info() {
        let (client, _) = connected(true).await;
        assert_eq!(client.server_info().name, "test");
        assert!(client.capabilities().resources.is_some());
        client.ping().await.unwrap();
    }

    #[tokio::test]
    async fn lists_tools_and_resources() {
        let (client, _) = connected(true).await;
        let tools = client.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "echo");
        assert!(tools[0].input_schema.is_some());

        let resources = client.list_resources().await.unwrap();
        assert_eq!(resources[0].uri, "data://notes/one");
        assert_eq!(resources[0].mime_type.as_deref(), Some("text/plain"));
    }

    #[tokio::test]
    async fn missing_resources_capability_lists_nothing() {
        let (client, _) = connected(false).await;
        assert!(client.list_resources().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn call_tool_returns_raw_content() {
        let (client, _) = connected(true).await;
        let mut args = Map::new();
        args.insert("text".into(), json!("hi"));
        let value = client.call_tool("echo", args).await.unwrap();
        assert_eq!(value, json!([{"type": "text", "text": "hi"}]));
    }

    #[tokio::test]
    async fn tool_error_result_becomes_action_error() {
        let (client, _) = connected(true).await;
        let err = client.call_tool("echo", Map::new()).await.unwrap_err();
        match err {
            ActionError::ToolFailed { tool_name, reason } => {
                assert_eq!(tool_name, "echo");
                assert!(reason.contains("text is required"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn read_resource_collapses_single_text() {
        let (client, _) = connected(true).await;
        let value = client.read_resource("data://notes/one").await.unwrap();
        assert_eq!(value, json!("first note"));

        let err = client.read_resource("data://notes/missing").await.unwrap_err();
        assert!(matches!(err, ActionError::ResourceFailed { .. }));
    }

    #[tokio::test]
    async fn dropped_transport_is_reported() {
        let (client, transport) = connected(true).await;
        assert!(client.is_connected().await);

        transport.disconnect();
        assert!(!client.is_connected().await);
        let err = client.list_tools().await.unwrap_err();
        assert!(matches!(err, ActionError::Disconnected(_)));
    }

    /// Serves canned `tools/list` pages to exercise cursor handling.
    struct PagedTransport {
        cursors_seen: Mutex<Vec<Option<String>>>,
        /// Every page points at "page2", including page2 itself.
        stuck: bool,
    }

    #[async_trait]
    impl McpTransport for PagedTransport {
        async fn send_request(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, McpError> {
            let result = match request.method.as_str() {
                "initialize" => json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {"tools": {}},
                    "serverInfo": {"name": "paged"}
                }),
                "tools/list" => {
                    let cursor = request
                        .params
                        .as_ref()
                        .and_then(|p| p.get("cursor"))
                        .and_then(Value::as_str)
                        .map(String::from);
                    self.cursors_seen.lock().unwrap().push(cursor.clone());
                    match cursor.as_deref() {
                        None => json!({"tools": [{"name": "a"}], "nextCursor": "page2"}),
                        Some(_) if self.stuck => json!({"tools": [{"name": "b"}], "nextCursor": "page2"}),
                        Some(_) => json!({"tools": [{"name": "b"}]}),
                    }
                }
                other => panic!("unexpected method {other}"),
            };
            Ok(JsonRpcResponse::success(json!(request.id), result))
        }

        async fn send_notification(&self, _method: &str, _params: Option<Value>) -> Result<(), McpError> {
            Ok(())
        }

        fn is_connected(&self) -> bool {
            true
        }

        async fn close(&self) -> Result<(), McpError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn tools_list_follows_cursor() {
        let transport = Arc::new(PagedTransport {
            cursors_seen: Mutex::new(Vec::new()),
            stuck: false,
        });
        let client = McpClient::connect(transport.clone()).await.unwrap();

        let names: Vec<String> = client
            .list_tools()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(
            *transport.cursors_seen.lock().unwrap(),
            vec![None, Some("page2".to_string())]
        );
    }

    #[tokio::test]
    async fn repeated_cursor_ends_listing() {
        let transport = Arc::new(PagedTransport {
            cursors_seen: Mutex::new(Vec::new()),
            stuck: true,
        });
        let client = McpClient::connect(transport.clone()).await.unwrap();

        let tools = client.list_tools().await.unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(transport.cursors_seen.lock().unwrap().len(), 2);
    }
}
