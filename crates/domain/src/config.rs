use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::message::ToolSchema;

fn d_true() -> bool {
    true
}

fn d_port() -> u16 {
    8080
}

fn d_quiet_period_seconds() -> u64 {
    8
}

fn d_history_limit() -> usize {
    10
}

fn d_group_cache_ttl_minutes() -> i64 {
    60
}

fn d_max_concurrent_turns() -> usize {
    5
}

fn d_turn_deadline_seconds() -> u64 {
    60
}

fn d_max_tool_iterations() -> u32 {
    6
}

fn d_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn d_timezone() -> String {
    "America/Sao_Paulo".to_string()
}

fn d_dedupe_ttl_seconds() -> u64 {
    300
}

/// Top-level configuration tree, loaded from TOML at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub fragments: FragmentsConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub groups: GroupsConfig,
    #[serde(default)]
    pub turns: TurnsConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub agents: HashMap<String, AgentConfig>,
}

impl Config {
    /// Collect configuration problems without bailing early, so the caller
    /// can print every issue at once before deciding whether to start.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.llm.api_key_env.trim().is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: "llm.api_key_env must name an environment variable".into(),
            });
        }
        if self.groups.authorized_group_ids.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                message: "groups.authorized_group_ids is empty — every sender will be denied"
                    .into(),
            });
        }
        if !self.agents.contains_key(crate::agent::MENTOR_AGENT_ID) {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: format!(
                    "agents must define the fallback '{}' agent",
                    crate::agent::MENTOR_AGENT_ID
                ),
            });
        }
        if self.turns.max_tool_iterations == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                message: "turns.max_tool_iterations is 0 — agents can never call a tool".into(),
            });
        }

        issues
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_port")]
    pub port: u16,
    #[serde(default)]
    pub webhook_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: d_port(),
            webhook_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    #[serde(default = "d_llm_model")]
    pub default_model: String,
    /// Name of the environment variable holding the bearer token.
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            default_model: d_llm_model(),
            api_key_env: "LLM_API_KEY".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragmentsConfig {
    #[serde(default = "d_quiet_period_seconds")]
    pub quiet_period_seconds: u64,
    #[serde(default = "d_dedupe_ttl_seconds")]
    pub dedupe_ttl_seconds: u64,
}

impl Default for FragmentsConfig {
    fn default() -> Self {
        Self {
            quiet_period_seconds: d_quiet_period_seconds(),
            dedupe_ttl_seconds: d_dedupe_ttl_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "d_history_limit")]
    pub history_limit: usize,
    /// Directory holding the per-user history JSON file.
    #[serde(default = "d_state_dir")]
    pub state_dir: String,
}

fn d_state_dir() -> String {
    "./state".to_string()
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            history_limit: d_history_limit(),
            state_dir: d_state_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupsConfig {
    #[serde(default = "d_group_cache_ttl_minutes")]
    pub cache_ttl_minutes: i64,
    #[serde(default)]
    pub authorized_group_ids: Vec<String>,
}

impl Default for GroupsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_minutes: d_group_cache_ttl_minutes(),
            authorized_group_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnsConfig {
    #[serde(default = "d_max_concurrent_turns")]
    pub max_concurrent_turns: usize,
    #[serde(default = "d_turn_deadline_seconds")]
    pub turn_deadline_seconds: u64,
    #[serde(default = "d_max_tool_iterations")]
    pub max_tool_iterations: u32,
    #[serde(default = "d_timezone")]
    pub timezone: String,
}

impl Default for TurnsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_turns: d_max_concurrent_turns(),
            turn_deadline_seconds: d_turn_deadline_seconds(),
            max_tool_iterations: d_max_tool_iterations(),
            timezone: d_timezone(),
        }
    }
}

fn d_chat_base_url() -> String {
    "https://evolution-api.example.com".to_string()
}

fn d_chat_api_key_env() -> String {
    "CHAT_API_KEY".to_string()
}

/// Chat provider (messaging platform) connection settings — used both to
/// send replies and, by the Authorization Gate, to list group members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "d_chat_base_url")]
    pub base_url: String,
    #[serde(default = "d_chat_api_key_env")]
    pub api_key_env: String,
    /// This agent's own account ID, used to detect and ignore outbound echoes.
    #[serde(default)]
    pub own_account_id: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: d_chat_base_url(),
            api_key_env: d_chat_api_key_env(),
            own_account_id: String::new(),
        }
    }
}

/// One entry in `agents.*` — becomes an `AgentDescriptor` at startup once
/// its tool schemas are resolved against the tool registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub description: String,
    #[serde(default)]
    pub model: Option<String>,
    pub system_instructions: String,
    #[serde(default = "d_true")]
    pub enabled: bool,
    /// Names of built-in tools this agent may call (e.g. `calendar.list`,
    /// `web.search`). Resolved to full `ToolSchema`s by the gateway.
    #[serde(default)]
    pub tools: Vec<String>,
}

/// Build the `ToolSchema` list for an agent from its configured tool names,
/// looking each one up in the supplied catalog. Unknown names are skipped
/// with a warning rather than failing startup.
pub fn resolve_tool_schemas(
    agent_id: &str,
    tool_names: &[String],
    catalog: &HashMap<String, ToolSchema>,
) -> Vec<ToolSchema> {
    tool_names
        .iter()
        .filter_map(|name| match catalog.get(name) {
            Some(schema) => Some(schema.clone()),
            None => {
                tracing::warn!(agent_id, tool = name, "unknown tool name in agent config");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_flags_missing_mentor_agent() {
        let cfg = Config {
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            fragments: FragmentsConfig::default(),
            context: ContextConfig::default(),
            groups: GroupsConfig {
                authorized_group_ids: vec!["123".into()],
                ..GroupsConfig::default()
            },
            turns: TurnsConfig::default(),
            chat: ChatConfig::default(),
            agents: HashMap::new(),
        };
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.severity == ConfigSeverity::Error && i.message.contains("agent_mentor")));
    }

    #[test]
    fn validate_warns_on_empty_authorized_groups() {
        let mut agents = HashMap::new();
        agents.insert(
            crate::agent::MENTOR_AGENT_ID.to_string(),
            AgentConfig {
                description: "fallback".into(),
                model: None,
                system_instructions: "You are a helpful assistant.".into(),
                enabled: true,
                tools: vec![],
            },
        );
        let cfg = Config {
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            fragments: FragmentsConfig::default(),
            context: ContextConfig::default(),
            groups: GroupsConfig::default(),
            turns: TurnsConfig::default(),
            chat: ChatConfig::default(),
            agents,
        };
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.severity == ConfigSeverity::Warning
                && i.message.contains("authorized_group_ids")));
    }

    #[test]
    fn resolve_tool_schemas_skips_unknown_names() {
        let catalog = HashMap::new();
        let schemas = resolve_tool_schemas("agent_mentor", &["web.search".to_string()], &catalog);
        assert!(schemas.is_empty());
    }
}
