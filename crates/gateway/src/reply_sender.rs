//! Reply Sender (§4.10) — the single point where a turn's final text
//! leaves the gateway.

use relay_domain::fragment::UserKey;
use relay_domain::trace::TraceEvent;

use crate::chat_client::ChatClient;

pub struct ReplySender<'a> {
    chat: &'a ChatClient,
}

impl<'a> ReplySender<'a> {
    pub fn new(chat: &'a ChatClient) -> Self {
        Self { chat }
    }

    /// Deliver `text` to `user`. Logs and emits a trace event either way;
    /// never retries (the Orchestrator does not re-run the turn on a send
    /// failure — §4.10).
    pub async fn send(&self, user: &UserKey, text: &str) -> bool {
        let delivered = self.chat.send_message(user, text).await;
        if delivered {
            TraceEvent::ReplySent {
                user_key: user.clone(),
                chars: text.chars().count(),
            }
            .emit();
        } else {
            TraceEvent::ReplyFailed {
                user_key: user.clone(),
                reason: "chat provider send failed".to_string(),
            }
            .emit();
        }
        delivered
    }
}
