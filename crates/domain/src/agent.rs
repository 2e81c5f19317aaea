use serde::{Deserialize, Serialize};

use crate::message::ToolSchema;

/// A specialist agent's fixed identity: system instructions, model, and the
/// tools it's allowed to call. Constructed once at startup from `Config`;
/// never mutated (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub id: String,
    pub description: String,
    pub model: String,
    pub system_instructions: String,
    pub tool_schemas: Vec<ToolSchema>,
}

/// The well-known fallback agent ID. Must always exist in the registry and
/// carries no tools.
pub const MENTOR_AGENT_ID: &str = "agent_mentor";
