use serde::{Deserialize, Serialize};

/// One function invocation requested by the model.
///
/// `id` pairs a call with its eventual `ToolResult` (and with the
/// `tool_call_id` on the `tool` message that carries that result back).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// The declarative shape of a tool, as seen by the LLM. Purely descriptive —
/// dispatch happens by matching `name` against a per-agent lookup table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single turn in a conversation, OpenAI chat-completion shaped:
/// `{role, content?, tool_calls?, tool_call_id?}`.
///
/// Invariants (enforced by callers, not by this type):
/// - a `tool` message must be preceded, eventually, by an `assistant`
///   message whose `tool_calls` contains this message's `tool_call_id`.
/// - a `user` message must have non-empty `content`.
/// - an `assistant` message has non-empty `content`, non-empty `tool_calls`,
///   or both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(text.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(text.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(text.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    pub fn has_non_empty_content(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.is_empty())
    }
}

/// Ordered sequence of `Message` for one `UserKey`.
pub type ConversationHistory = Vec<Message>;

/// Strip leading `tool` messages whose triggering `assistant.tool_calls` is
/// not present in the window. Applied on every `ContextStore::read`.
///
/// Mirrors §4.2 / invariant 3: the first message in the returned window is
/// never `tool`.
pub fn repair_orphan_tool_messages(mut history: ConversationHistory) -> ConversationHistory {
    // A `tool` message's owning `assistant.tool_calls` always precedes it in
    // conversation order, so if `tool` is the *first* message in the window
    // its owner was necessarily cut off by trimming — it is orphaned by
    // construction. Strip leading `tool` messages until the window starts
    // with something else (or is empty).
    while matches!(history.first(), Some(m) if m.role == Role::Tool) {
        history.remove(0);
    }
    history
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_msg(id: &str) -> Message {
        Message::tool_result(id, "{}")
    }

    #[test]
    fn repair_leaves_clean_history_untouched() {
        let history = vec![Message::user("hi"), Message::assistant_text("hello")];
        let repaired = repair_orphan_tool_messages(history.clone());
        assert_eq!(repaired.len(), history.len());
    }

    #[test]
    fn repair_strips_single_leading_orphan() {
        let history = vec![tool_msg("call_1"), Message::assistant_text("ok")];
        let repaired = repair_orphan_tool_messages(history);
        assert_eq!(repaired.len(), 1);
        assert_eq!(repaired[0].role, Role::Assistant);
    }

    #[test]
    fn repair_keeps_tool_message_with_owner_in_window() {
        let owner = Message::assistant_tool_calls(
            None,
            vec![ToolCall {
                id: "call_1".into(),
                name: "noop".into(),
                arguments: serde_json::json!({}),
            }],
        );
        let history = vec![owner, tool_msg("call_1")];
        let repaired = repair_orphan_tool_messages(history);
        assert_eq!(repaired.len(), 2);
        assert_eq!(repaired[0].role, Role::Assistant);
        assert_eq!(repaired[1].role, Role::Tool);
    }

    #[test]
    fn repair_strips_multiple_leading_orphans() {
        let history = vec![tool_msg("a"), tool_msg("b"), Message::user("hi")];
        let repaired = repair_orphan_tool_messages(history);
        assert_eq!(repaired.len(), 1);
        assert_eq!(repaired[0].role, Role::User);
    }

    #[test]
    fn repair_on_empty_history() {
        assert!(repair_orphan_tool_messages(vec![]).is_empty());
    }
}
