//! Web search tool: returns deterministic mock results.
//!
//! The bundled server is a demonstration, so no search API is called. The
//! results are shaped like real ones so the model can reason over them.

use async_trait::async_trait;
use agentbridge_core::error::ToolError;
use agentbridge_core::tool::Tool;
use serde::Serialize;
use serde_json::{Value, json};

pub struct WebSearchTool;

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web. Returns a list of results with titles, URLs, and snippets."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "num_results": {
                    "type": "integer",
                    "description": "Number of results to return",
                    "default": 3
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let query = arguments["query"]
            .as_str()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        let num_results = arguments["num_results"].as_u64().unwrap_or(3).clamp(1, 5) as usize;
        tracing::debug!(query, num_results, "Mock web search");

        serde_json::to_value(mock_results(query, num_results)).map_err(|e| ToolError::ExecutionFailed {
            tool_name: "web_search".into(),
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct SearchResult {
    title: String,
    url: String,
    snippet: String,
}

fn mock_results(query: &str, count: usize) -> Vec<SearchResult> {
    if query.to_lowercase().contains("mcp") {
        let known = [
            SearchResult {
                title: "Model Context Protocol".into(),
                url: "https://modelcontextprotocol.io/".into(),
                snippet: "An open protocol that standardizes how applications provide context to LLMs.".into(),
            },
            SearchResult {
                title: "MCP Specification".into(),
                url: "https://spec.modelcontextprotocol.io/".into(),
                snippet: "JSON-RPC based messages for tools, resources, and prompts.".into(),
            },
        ];
        return known.into_iter().take(count).collect();
    }

    (0..count)
        .map(|i| SearchResult {
            title: format!("Result {} for: {}", i + 1, query),
            url: format!("https://example.com/search?q={}&p={}", query.replace(' ', "+"), i + 1),
            snippet: format!("A mock search result for '{query}'."),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_returns_results() {
        let result = WebSearchTool
            .execute(json!({"query": "what is mcp"}))
            .await
            .unwrap();
        let results = result.as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["title"], "Model Context Protocol");
    }

    #[tokio::test]
    async fn search_respects_num_results() {
        let result = WebSearchTool
            .execute(json!({"query": "rust async", "num_results": 2}))
            .await
            .unwrap();
        assert_eq!(result.as_array().unwrap().len(), 2);
        assert!(result[0]["url"].as_str().unwrap().contains("rust+async"));
    }

    #[tokio::test]
    async fn missing_query_returns_error() {
        assert!(WebSearchTool.execute(json!({})).await.is_err());
        assert!(WebSearchTool.execute(json!({"query": "  "})).await.is_err());
    }

    #[test]
    fn tool_definition() {
        let def = WebSearchTool.to_definition();
        assert_eq!(def.name, "web_search");
        assert!(!def.description.is_empty());
    }
}
