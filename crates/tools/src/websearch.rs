//! Web-search tool (§4.8), used by the content and marketing agents.

use serde_json::json;

use relay_domain::message::{ToolCall, ToolSchema};
use relay_domain::Result;

use crate::traits::WebSearchClient;

const TOOL_SEARCH: &str = "web_search";

/// Stands in for a real search vendor (Brave, Bing, etc.) until one is
/// wired in — reports the gap as a tool failure so the agent can tell the
/// user rather than fabricating results.
pub struct UnconfiguredWebSearch;

#[async_trait::async_trait]
impl WebSearchClient for UnconfiguredWebSearch {
    async fn search(&self, _query: &str) -> Result<String> {
        Err(relay_domain::Error::Config(
            "no web search provider configured".to_string(),
        ))
    }
}

pub fn tool_schema() -> ToolSchema {
    ToolSchema {
        name: TOOL_SEARCH.to_string(),
        description: "Search the web, returning the top-3 organic results.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Search query"}
            },
            "required": ["query"]
        }),
    }
}

pub async fn dispatch(call: &ToolCall, client: &dyn WebSearchClient) -> (String, bool) {
    if call.name != TOOL_SEARCH {
        return (format!("unknown web search tool: {}", call.name), true);
    }
    let Some(query) = call.arguments.get("query").and_then(|v| v.as_str()) else {
        return ("missing required argument 'query'".to_string(), true);
    };
    match client.search(query).await {
        Ok(formatted) => (formatted, false),
        Err(e) => (format!("search failed: {e}"), true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_domain::Error;

    struct FakeSearch {
        fail: bool,
    }

    #[async_trait::async_trait]
    impl WebSearchClient for FakeSearch {
        async fn search(&self, query: &str) -> relay_domain::Result<String> {
            if self.fail {
                return Err(Error::Other("upstream 503".into()));
            }
            Ok(format!(
                "Fonte: https://example.com\nT\u{00ed}tulo: {query}\nResumo: summary"
            ))
        }
    }

    fn call(args: serde_json::Value) -> ToolCall {
        ToolCall { id: "c1".to_string(), name: TOOL_SEARCH.to_string(), arguments: args }
    }

    #[tokio::test]
    async fn search_returns_client_formatted_string_verbatim() {
        let client = FakeSearch { fail: false };
        let (content, is_error) = dispatch(&call(json!({"query": "rust async"})), &client).await;
        assert!(!is_error);
        assert!(content.contains("rust async"));
    }

    #[tokio::test]
    async fn missing_query_is_error() {
        let client = FakeSearch { fail: false };
        let (_, is_error) = dispatch(&call(json!({})), &client).await;
        assert!(is_error);
    }

    #[tokio::test]
    async fn client_failure_surfaces_as_tool_error() {
        let client = FakeSearch { fail: true };
        let (content, is_error) = dispatch(&call(json!({"query": "x"})), &client).await;
        assert!(is_error);
        assert!(content.contains("search failed"));
    }

    #[tokio::test]
    async fn unconfigured_search_surfaces_as_tool_error() {
        let client = UnconfiguredWebSearch;
        let (content, is_error) = dispatch(&call(json!({"query": "x"})), &client).await;
        assert!(is_error);
        assert!(content.contains("search failed"));
    }
}
