//! Context Store — per-user conversation history (§4.2).
//!
//! Persists history in `user_contexts.json` under the configured state
//! directory, keyed by `UserKey`. `read` trims to the last N messages and
//! repairs leading orphan `tool` messages; `save` is a whole-record upsert.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use relay_domain::fragment::UserKey;
use relay_domain::message::{repair_orphan_tool_messages, ConversationHistory};
use relay_domain::{Error, Result};

/// One persisted record. The `phone` field name mirrors the field the
/// provider's wire envelope and the persisted-state layout both use; it
/// holds the same value as the map key (kept so the on-disk record is
/// self-describing outside the map).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserContextRecord {
    phone: String,
    history: ConversationHistory,
}

pub struct ContextStore {
    path: PathBuf,
    records: RwLock<HashMap<UserKey, ConversationHistory>>,
}

impl ContextStore {
    /// Load or create the store at `state_dir/user_contexts.json`.
    pub fn new(state_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(state_dir).map_err(Error::Io)?;
        let path = state_dir.join("user_contexts.json");

        let records = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(Error::Io)?;
            let parsed: Vec<UserContextRecord> = serde_json::from_str(&raw).unwrap_or_default();
            parsed
                .into_iter()
                .map(|r| (r.phone, r.history))
                .collect()
        } else {
            HashMap::new()
        };

        tracing::info!(users = records.len(), path = %path.display(), "context store loaded");

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    /// In-memory store with no backing file, for tests.
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Return the last `limit` messages for `user`, orphan-tool-repaired.
    /// Unknown users return an empty history, never an error (§8 boundary
    /// behavior).
    pub fn read(&self, user: &UserKey, limit: usize) -> ConversationHistory {
        let records = self.records.read();
        let history = match records.get(user) {
            Some(h) => h,
            None => return Vec::new(),
        };

        let start = history.len().saturating_sub(limit);
        let window = history[start..].to_vec();
        repair_orphan_tool_messages(window)
    }

    /// Replace the stored history for `user` (upsert) and flush to disk.
    pub fn save(&self, user: &UserKey, history: ConversationHistory) -> Result<()> {
        {
            let mut records = self.records.write();
            records.insert(user.clone(), history);
        }
        self.flush()
    }

    fn flush(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }
        let records = self.records.read();
        let serializable: Vec<UserContextRecord> = records
            .iter()
            .map(|(phone, history)| UserContextRecord {
                phone: phone.clone(),
                history: history.clone(),
            })
            .collect();
        let json = serde_json::to_string_pretty(&serializable).map_err(Error::Json)?;
        std::fs::write(&self.path, json).map_err(Error::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_domain::message::{Message, ToolCall};

    #[test]
    fn read_on_unknown_user_returns_empty() {
        let store = ContextStore::in_memory();
        assert!(store.read(&"unknown".to_string(), 10).is_empty());
    }

    #[test]
    fn save_then_read_round_trips() {
        let store = ContextStore::in_memory();
        let user = "5511999990000".to_string();
        let history = vec![Message::user("oi"), Message::assistant_text("Olá!")];
        store.save(&user, history.clone()).unwrap();
        assert_eq!(store.read(&user, 10), history);
    }

    #[test]
    fn read_trims_to_limit() {
        let store = ContextStore::in_memory();
        let user = "u".to_string();
        let history: ConversationHistory = (0..20)
            .map(|i| Message::user(format!("msg {i}")))
            .collect();
        store.save(&user, history).unwrap();
        let window = store.read(&user, 5);
        assert_eq!(window.len(), 5);
        assert_eq!(window[0].content.as_deref(), Some("msg 15"));
    }

    #[test]
    fn read_repairs_leading_orphan_after_trim() {
        let store = ContextStore::in_memory();
        let user = "u".to_string();
        let owner = Message::assistant_tool_calls(
            None,
            vec![ToolCall {
                id: "call_1".into(),
                name: "noop".into(),
                arguments: serde_json::json!({}),
            }],
        );
        let mut history = vec![owner, Message::tool_result("call_1", "{}")];
        for i in 0..9 {
            history.push(Message::user(format!("filler {i}")));
        }
        store.save(&user, history).unwrap();

        // Window of 10 amputates the owning assistant message, leaving the
        // tool reply as the window's first element — it must be stripped.
        let window = store.read(&user, 10);
        assert_eq!(window.len(), 9);
        assert!(!matches!(window[0].role, relay_domain::message::Role::Tool));
    }
}
