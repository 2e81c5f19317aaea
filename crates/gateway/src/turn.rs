//! One turn's full lifecycle (§4.2, §4.9, §4.10): read context, route and
//! dispatch, persist, reply. This is the Debouncer's `TurnCallback` body.

use std::sync::Arc;

use relay_domain::fragment::UserKey;
use relay_domain::message::Message;
use relay_domain::trace::TraceEvent;

use crate::reply_sender::ReplySender;
use crate::runtime::orchestrator;
use crate::state::AppState;
use crate::tools::ToolDispatcher;

pub async fn run(state: Arc<AppState>, user: UserKey, utterance: String) {
    if utterance.trim().is_empty() {
        TraceEvent::TurnDropped {
            user_key: user.clone(),
            reason: "empty utterance after debounce".to_string(),
        }
        .emit();
        return;
    }

    let _permit = state.turn_semaphore.clone().acquire_owned().await;

    TraceEvent::TurnStarted {
        user_key: user.clone(),
        utterance_chars: utterance.chars().count(),
    }
    .emit();

    let mut history = state
        .context_store
        .read(&user, state.config.context.history_limit);
    history.push(Message::user(utterance));

    let dispatcher = ToolDispatcher {
        calendar: state.calendar.as_ref(),
        web_search: state.web_search.as_ref(),
        leads: state.leads.as_ref(),
    };

    let timezone: chrono_tz::Tz = state
        .config
        .turns
        .timezone
        .parse()
        .unwrap_or(chrono_tz::America::Sao_Paulo);

    let updated = orchestrator::run(
        &state.registry,
        history,
        &user,
        &state.config.llm.default_model,
        state.llm.as_ref(),
        &dispatcher,
        state.config.turns.max_tool_iterations,
        state.turn_deadline(),
        timezone,
    )
    .await;

    if let Err(e) = state.context_store.save(&user, updated.clone()) {
        tracing::error!(user_key = %user, error = %e, "failed to persist conversation history");
    }

    match orchestrator::pick_reply(&updated) {
        Some(text) => {
            let sender = ReplySender::new(&state.chat);
            sender.send(&user, text).await;
        }
        None => {
            tracing::error!(user_key = %user, "turn ended with no assistant reply to send");
        }
    }
}
