//! Orchestrator (§4.9) — two-stage router-then-specialist dispatch.

use std::time::Duration;

use chrono_tz::Tz;
use serde_json::json;

use relay_domain::agent::MENTOR_AGENT_ID;
use relay_domain::fragment::UserKey;
use relay_domain::message::{ConversationHistory, Message, Role, ToolSchema};
use relay_domain::trace::TraceEvent;
use relay_providers::{ChatRequest, LlmProvider};

use crate::registry::AgentRegistry;
use crate::runtime::specialist;
use crate::tools::ToolDispatcher;

const ROUTE_TOOL_NAME: &str = "route_to_agent";

fn router_tool_schema(agent_ids: &[String]) -> ToolSchema {
    ToolSchema {
        name: ROUTE_TOOL_NAME.to_string(),
        description: "Hand off to a specialist agent.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "agent_id": {"type": "string", "enum": agent_ids}
            },
            "required": ["agent_id"]
        }),
    }
}

fn router_system_prompt(registry: &AgentRegistry) -> String {
    let mut lines = vec![
        "You are a routing assistant. Either reply directly with a short".to_string(),
        "trivial response (greeting, acknowledgement, thanks), or invoke".to_string(),
        format!("the {ROUTE_TOOL_NAME} tool with one of the following agent IDs:"),
    ];
    for agent in registry.all() {
        lines.push(format!("- {}: {}", agent.id, agent.description));
    }
    lines.join("\n")
}

/// Run one full turn: route, then (maybe) dispatch to a specialist. Returns
/// the updated history; the caller is responsible for persisting it and
/// picking the reply text out via `pick_reply`.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    registry: &AgentRegistry,
    history: ConversationHistory,
    user: &UserKey,
    router_model: &str,
    llm: &dyn LlmProvider,
    tools: &ToolDispatcher<'_>,
    max_tool_iterations: u32,
    turn_deadline: Duration,
    timezone: Tz,
) -> ConversationHistory {
    let agent_ids = registry.agent_ids();
    let router_req = ChatRequest {
        model: router_model.to_string(),
        messages: {
            let mut msgs = vec![Message::system(router_system_prompt(registry))];
            msgs.extend(history.iter().filter(|m| m.role != Role::System).cloned());
            msgs
        },
        tools: vec![router_tool_schema(&agent_ids)],
    };

    let router_resp = match llm.chat(router_req).await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::warn!(error = %e, "router LLM call failed");
            let mut out = history;
            out.push(Message::assistant_text(
                "desculpe, ocorreu um erro ao processar sua mensagem.",
            ));
            return out;
        }
    };

    let route_call = router_resp
        .tool_calls
        .iter()
        .find(|c| c.name == ROUTE_TOOL_NAME);

    if let Some(call) = route_call {
        let requested_id = call
            .arguments
            .get("agent_id")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        let agent_id = if registry.get(requested_id).is_some() {
            requested_id.to_string()
        } else {
            tracing::error!(requested = requested_id, "router named an unknown agent");
            MENTOR_AGENT_ID.to_string()
        };
        TraceEvent::RouterDecision {
            user_key: user.clone(),
            decision: agent_id.clone(),
        }
        .emit();

        let agent = registry.get(&agent_id).unwrap_or_else(|| registry.mentor());
        specialist::run(
            agent,
            history,
            user,
            llm,
            tools,
            max_tool_iterations,
            turn_deadline,
            timezone,
        )
        .await
    } else if router_resp.content.as_deref().is_some_and(|c| !c.is_empty()) {
        TraceEvent::RouterDecision {
            user_key: user.clone(),
            decision: "trivial_reply".to_string(),
        }
        .emit();
        let mut out = history;
        out.push(Message::assistant_text(router_resp.content.unwrap()));
        out
    } else {
        TraceEvent::RouterDecision {
            user_key: user.clone(),
            decision: MENTOR_AGENT_ID.to_string(),
        }
        .emit();
        specialist::run(
            registry.mentor(),
            history,
            user,
            llm,
            tools,
            max_tool_iterations,
            turn_deadline,
            timezone,
        )
        .await
    }
}

/// Reply emission: scan from the tail for the first assistant message with
/// non-empty content.
pub fn pick_reply(history: &ConversationHistory) -> Option<&str> {
    history
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant && m.has_non_empty_content())
        .and_then(|m| m.content.as_deref())
}
