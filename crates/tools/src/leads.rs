//! Lead-prospecting tool for the marketing agent. No vendor integration is
//! specified; this ships a stub client so the agent's tool set is complete
//! and the gap is visible in its output rather than a missing tool.

use serde_json::json;

use relay_domain::message::{ToolCall, ToolSchema};
use relay_domain::Result;

const TOOL_PROSPECT: &str = "prospect_leads";

#[async_trait::async_trait]
pub trait LeadProspectingClient: Send + Sync {
    async fn prospect(&self, segment: &str) -> Result<String>;
}

pub fn tool_schema() -> ToolSchema {
    ToolSchema {
        name: TOOL_PROSPECT.to_string(),
        description: "Find prospective leads matching a market segment description.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "segment": {"type": "string", "description": "Target segment or ICP description"}
            },
            "required": ["segment"]
        }),
    }
}

/// Always reports that prospecting is unavailable, as a tool result (not
/// an error) so the model can tell the user rather than stalling.
pub struct StubLeadProspecting;

#[async_trait::async_trait]
impl LeadProspectingClient for StubLeadProspecting {
    async fn prospect(&self, _segment: &str) -> Result<String> {
        Ok("lead prospecting is not yet available".to_string())
    }
}

pub async fn dispatch(call: &ToolCall, client: &dyn LeadProspectingClient) -> (String, bool) {
    if call.name != TOOL_PROSPECT {
        return (format!("unknown lead prospecting tool: {}", call.name), true);
    }
    let Some(segment) = call.arguments.get("segment").and_then(|v| v.as_str()) else {
        return ("missing required argument 'segment'".to_string(), true);
    };
    match client.prospect(segment).await {
        Ok(text) => (text, false),
        Err(e) => (format!("lead prospecting failed: {e}"), true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(args: serde_json::Value) -> ToolCall {
        ToolCall { id: "c1".to_string(), name: TOOL_PROSPECT.to_string(), arguments: args }
    }

    #[tokio::test]
    async fn stub_reports_unavailable_without_erroring() {
        let client = StubLeadProspecting;
        let (content, is_error) = dispatch(&call(json!({"segment": "SMB SaaS"})), &client).await;
        assert!(!is_error);
        assert!(content.contains("not yet available"));
    }

    #[tokio::test]
    async fn missing_segment_is_error() {
        let client = StubLeadProspecting;
        let (_, is_error) = dispatch(&call(json!({})), &client).await;
        assert!(is_error);
    }
}
