//! Agent Registry (§4.7) — fixed, read-only after construction.

use std::collections::HashMap;

use relay_domain::agent::{AgentDescriptor, MENTOR_AGENT_ID};
use relay_domain::config::{resolve_tool_schemas, AgentConfig, Config};
use relay_domain::message::ToolSchema;

pub struct AgentRegistry {
    agents: HashMap<String, AgentDescriptor>,
}

impl AgentRegistry {
    /// Build the registry from `config.agents`, resolving each agent's
    /// configured tool names against `catalog`. Disabled agents are
    /// dropped. Panics only via `Config::validate`'s mentor-presence check,
    /// which callers must run first — this constructor trusts it.
    pub fn from_config(config: &Config, catalog: &HashMap<String, ToolSchema>) -> Self {
        let mut agents = HashMap::new();
        for (id, agent_cfg) in &config.agents {
            if !agent_cfg.enabled {
                continue;
            }
            agents.insert(id.clone(), descriptor(id, agent_cfg, config, catalog));
        }
        Self { agents }
    }

    pub fn get(&self, id: &str) -> Option<&AgentDescriptor> {
        self.agents.get(id)
    }

    pub fn all(&self) -> impl Iterator<Item = &AgentDescriptor> {
        self.agents.values()
    }

    pub fn agent_ids(&self) -> Vec<String> {
        self.agents.keys().cloned().collect()
    }

    pub fn mentor(&self) -> &AgentDescriptor {
        self.agents
            .get(MENTOR_AGENT_ID)
            .expect("Config::validate guarantees agent_mentor exists")
    }
}

fn descriptor(
    id: &str,
    agent_cfg: &AgentConfig,
    config: &Config,
    catalog: &HashMap<String, ToolSchema>,
) -> AgentDescriptor {
    AgentDescriptor {
        id: id.to_string(),
        description: agent_cfg.description.clone(),
        model: agent_cfg
            .model
            .clone()
            .unwrap_or_else(|| config.llm.default_model.clone()),
        system_instructions: agent_cfg.system_instructions.clone(),
        tool_schemas: resolve_tool_schemas(id, &agent_cfg.tools, catalog),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn base_config() -> Config {
        let mut agents = Map::new();
        agents.insert(
            MENTOR_AGENT_ID.to_string(),
            AgentConfig {
                description: "fallback".into(),
                model: None,
                system_instructions: "You are helpful.".into(),
                enabled: true,
                tools: vec![],
            },
        );
        agents.insert(
            "agent_agendamento".to_string(),
            AgentConfig {
                description: "calendar".into(),
                model: Some("gpt-4o".into()),
                system_instructions: "You manage the calendar.".into(),
                enabled: true,
                tools: vec!["get_calendar_events".to_string()],
            },
        );
        agents.insert(
            "agent_disabled".to_string(),
            AgentConfig {
                description: "off".into(),
                model: None,
                system_instructions: "unused".into(),
                enabled: false,
                tools: vec![],
            },
        );
        Config {
            agents,
            ..default_config()
        }
    }

    fn default_config() -> Config {
        toml::from_str("").unwrap()
    }

    #[test]
    fn disabled_agents_are_excluded() {
        let registry = AgentRegistry::from_config(&base_config(), &Map::new());
        assert!(registry.get("agent_disabled").is_none());
    }

    #[test]
    fn mentor_is_always_resolvable() {
        let registry = AgentRegistry::from_config(&base_config(), &Map::new());
        assert_eq!(registry.mentor().id, MENTOR_AGENT_ID);
    }

    #[test]
    fn agent_inherits_default_model_when_unset() {
        let registry = AgentRegistry::from_config(&base_config(), &Map::new());
        assert_eq!(registry.mentor().model, "gpt-4o-mini");
    }

    #[test]
    fn agent_overrides_model_when_set() {
        let registry = AgentRegistry::from_config(&base_config(), &Map::new());
        let cal = registry.get("agent_agendamento").unwrap();
        assert_eq!(cal.model, "gpt-4o");
    }
}
