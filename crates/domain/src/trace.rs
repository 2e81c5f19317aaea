use serde::Serialize;

/// Structured trace events emitted across the gateway.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    FragmentAppended {
        user_key: String,
        ordinal: u64,
    },
    TurnDebounced {
        user_key: String,
        fragment_count: usize,
    },
    TurnStarted {
        user_key: String,
        utterance_chars: usize,
    },
    TurnDropped {
        user_key: String,
        reason: String,
    },
    AuthorizationGranted {
        sender: String,
        group_id: String,
    },
    AuthorizationDenied {
        sender: String,
    },
    RouterDecision {
        user_key: String,
        decision: String,
    },
    ToolDispatched {
        agent_id: String,
        tool_name: String,
        is_error: bool,
        duration_ms: u64,
    },
    ToolLoopExceeded {
        agent_id: String,
        user_key: String,
        iterations: u32,
    },
    TurnDeadlineExceeded {
        agent_id: String,
        user_key: String,
    },
    ReplySent {
        user_key: String,
        chars: usize,
    },
    ReplyFailed {
        user_key: String,
        reason: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "relay_event");
    }
}
