//! Specialist Agent Runtime (§4.8) — the tool-call loop for one agent.

use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;

use relay_domain::agent::AgentDescriptor;
use relay_domain::fragment::UserKey;
use relay_domain::message::{ConversationHistory, Message, Role};
use relay_domain::trace::TraceEvent;
use relay_providers::{ChatRequest, LlmProvider};

use crate::tools::ToolDispatcher;

const APOLOGY: &str = "desculpe, ocorreu um erro ao processar sua mensagem.";

/// Run the tool-call loop to completion (or a bound), returning the updated
/// history. The returned history always ends in an assistant message with
/// non-empty text, per the operation's contract.
pub async fn run(
    agent: &AgentDescriptor,
    history: ConversationHistory,
    user: &UserKey,
    llm: &dyn LlmProvider,
    tools: &ToolDispatcher<'_>,
    max_iterations: u32,
    deadline: Duration,
    timezone: Tz,
) -> ConversationHistory {
    let outcome = tokio::time::timeout(
        deadline,
        run_loop(agent, history.clone(), user, llm, tools, max_iterations, timezone),
    )
    .await;

    match outcome {
        Ok(updated) => updated,
        Err(_) => {
            TraceEvent::TurnDeadlineExceeded {
                agent_id: agent.id.clone(),
                user_key: user.clone(),
            }
            .emit();
            let mut fallback = history;
            fallback.push(Message::assistant_text(APOLOGY));
            fallback
        }
    }
}

async fn run_loop(
    agent: &AgentDescriptor,
    history: ConversationHistory,
    user: &UserKey,
    llm: &dyn LlmProvider,
    tools: &ToolDispatcher<'_>,
    max_iterations: u32,
    timezone: Tz,
) -> ConversationHistory {
    let mut context = materialize_turn_context(agent, history, timezone);

    let req = ChatRequest {
        model: agent.model.clone(),
        messages: context.clone(),
        tools: agent.tool_schemas.clone(),
    };
    let mut assistant = match llm.chat(req).await {
        Ok(resp) => Message::assistant_tool_calls(resp.content, resp.tool_calls),
        Err(e) => {
            tracing::warn!(agent_id = %agent.id, error = %e, "LLM call failed");
            context.push(Message::assistant_text(APOLOGY));
            return context;
        }
    };
    context.push(assistant.clone());

    let mut iterations = 0u32;
    while assistant
        .tool_calls
        .as_ref()
        .is_some_and(|calls| !calls.is_empty())
    {
        iterations += 1;
        if iterations > max_iterations {
            TraceEvent::ToolLoopExceeded {
                agent_id: agent.id.clone(),
                user_key: user.clone(),
                iterations,
            }
            .emit();
            context.push(Message::assistant_text(APOLOGY));
            return context;
        }

        let calls = assistant.tool_calls.clone().unwrap_or_default();
        for call in &calls {
            let started = std::time::Instant::now();
            let (content, is_error) = tools.dispatch(call).await;
            TraceEvent::ToolDispatched {
                agent_id: agent.id.clone(),
                tool_name: call.name.clone(),
                is_error,
                duration_ms: started.elapsed().as_millis() as u64,
            }
            .emit();
            context.push(Message::tool_result(call.id.clone(), content));
        }

        let req = ChatRequest {
            model: agent.model.clone(),
            messages: context.clone(),
            tools: agent.tool_schemas.clone(),
        };
        assistant = match llm.chat(req).await {
            Ok(resp) => Message::assistant_tool_calls(resp.content, resp.tool_calls),
            Err(e) => {
                tracing::warn!(agent_id = %agent.id, error = %e, "LLM call failed mid-loop");
                context.push(Message::assistant_text(APOLOGY));
                return context;
            }
        };
        context.push(assistant.clone());
    }

    context
}

/// Step 1: prepend the agent's system instructions (with templated tokens
/// substituted) and strip any previously present system message.
fn materialize_turn_context(
    agent: &AgentDescriptor,
    history: ConversationHistory,
    timezone: Tz,
) -> ConversationHistory {
    let instructions = render_system_instructions(&agent.system_instructions, timezone);
    let mut context = vec![Message::system(instructions)];
    context.extend(history.into_iter().filter(|m| m.role != Role::System));
    context
}

fn render_system_instructions(template: &str, timezone: Tz) -> String {
    let now = Utc::now().with_timezone(&timezone);
    template.replace(
        "{{CURRENT_DATETIME}}",
        &now.to_rfc3339_opts(chrono::SecondsFormat::Secs, false),
    )
}
