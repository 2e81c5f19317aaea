//! OpenAI-compatible chat completions adapter. Speaks the widely used
//! `/chat/completions` wire shape: messages/tools in, `choices[0].message`
//! out, tool calls carried as `{id, function: {name, arguments-json}}`.

use serde_json::Value;
use std::time::Duration;

use relay_domain::message::{Message, Role, ToolCall, ToolSchema};
use relay_domain::{Error, Result};

use crate::traits::{ChatRequest, ChatResponse, LlmProvider};

pub struct OpenAiCompatProvider {
    id: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(id: impl Into<String>, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("reqwest client with timeout always builds");
        Self {
            id: id.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            client,
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse> {
        let body = build_chat_body(&req);

        let resp = self
            .client
            .post(self.chat_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Provider {
                provider: self.id.clone(),
                message: format!("request failed: {e}"),
            })?;

        let status = resp.status();
        let payload: Value = resp.json().await.map_err(|e| Error::Provider {
            provider: self.id.clone(),
            message: format!("invalid JSON response: {e}"),
        })?;

        if !status.is_success() {
            let message = payload
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string();
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {status}: {message}"),
            });
        }

        parse_chat_response(&payload).map_err(|e| Error::Provider {
            provider: self.id.clone(),
            message: e.to_string(),
        })
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request serialization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn build_chat_body(req: &ChatRequest) -> Value {
    let messages: Vec<Value> = req.messages.iter().map(msg_to_openai).collect();

    let mut body = serde_json::json!({
        "model": req.model,
        "messages": messages,
    });

    if !req.tools.is_empty() {
        let tools: Vec<Value> = req.tools.iter().map(tool_to_openai).collect();
        body["tools"] = Value::Array(tools);
    }

    body
}

fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn msg_to_openai(msg: &Message) -> Value {
    match msg.role {
        Role::Tool => serde_json::json!({
            "role": "tool",
            "tool_call_id": msg.tool_call_id.clone().unwrap_or_default(),
            "content": msg.content.clone().unwrap_or_default(),
        }),
        Role::Assistant => assistant_to_openai(msg),
        _ => serde_json::json!({
            "role": role_to_str(msg.role),
            "content": msg.content.clone().unwrap_or_default(),
        }),
    }
}

fn assistant_to_openai(msg: &Message) -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert("role".into(), Value::String("assistant".into()));

    match &msg.content {
        Some(text) if !text.is_empty() => {
            obj.insert("content".into(), Value::String(text.clone()));
        }
        _ => {
            obj.insert("content".into(), Value::Null);
        }
    }

    if let Some(calls) = &msg.tool_calls {
        if !calls.is_empty() {
            let tool_calls: Vec<Value> = calls
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "id": c.id,
                        "type": "function",
                        "function": {
                            "name": c.name,
                            "arguments": c.arguments.to_string(),
                        }
                    })
                })
                .collect();
            obj.insert("tool_calls".into(), Value::Array(tool_calls));
        }
    }

    Value::Object(obj)
}

fn tool_to_openai(tool: &ToolSchema) -> Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response deserialization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn parse_chat_response(body: &Value) -> std::result::Result<ChatResponse, String> {
    let choice = body
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .ok_or("no choices in response")?;

    let message = choice.get("message").ok_or("no message in choice")?;

    let content = message
        .get("content")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty());

    let finish_reason = choice
        .get("finish_reason")
        .and_then(|v| v.as_str())
        .map(String::from);

    let model = body
        .get("model")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    let tool_calls = parse_tool_calls(message);

    Ok(ChatResponse {
        content,
        tool_calls,
        model,
        finish_reason,
    })
}

fn parse_tool_calls(message: &Value) -> Vec<ToolCall> {
    let arr = match message.get("tool_calls").and_then(|v| v.as_array()) {
        Some(a) => a,
        None => return Vec::new(),
    };
    arr.iter()
        .filter_map(|tc| {
            let id = tc.get("id")?.as_str()?.to_string();
            let func = tc.get("function")?;
            let name = func.get("name")?.as_str()?.to_string();
            let args_str = func.get("arguments")?.as_str().unwrap_or("{}");
            let arguments: Value =
                serde_json::from_str(args_str).unwrap_or(Value::Object(Default::default()));
            Some(ToolCall { id, name, arguments })
        })
        .collect()
}
