use relay_domain::message::{Message, ToolSchema};
use relay_domain::Result;

/// A chat completion request — maps 1:1 to spec's `create_model_response`
/// interface: `(model, messages, tools?)`.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSchema>,
}

/// A chat completion response — the parts of the wire shape the rest of the
/// gateway cares about: `choices[0].message: {role, content?, tool_calls?}`.
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<relay_domain::message::ToolCall>,
    pub model: String,
    pub finish_reason: Option<String>,
}

impl ChatResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Trait every LLM adapter implements. Non-streaming only — spec's Non-goal
/// "No streaming of partial replies back to the user" means the gateway
/// never needs anything but the single final response per call.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse>;

    /// Identifier used in logs and error messages.
    fn provider_id(&self) -> &str;
}
