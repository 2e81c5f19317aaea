use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point-in-time, time-bounded copy of a group's member set (§3, §4.3).
/// Never mutated in place — replaced wholesale on refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub group_id: String,
    pub members: HashSet<String>,
    pub captured_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl GroupSnapshot {
    pub fn new(group_id: impl Into<String>, members: HashSet<String>, ttl: chrono::Duration) -> Self {
        let captured_at = Utc::now();
        Self {
            group_id: group_id.into(),
            members,
            captured_at,
            expires_at: captured_at + ttl,
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}
