//! Webhook idempotency (§C) — the messaging provider may redeliver the
//! same webhook after a timeout; a replayed delivery must not enqueue a
//! second fragment. Keyed by the provider's message ID, with a
//! lazy sweep instead of a background task.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

const SWEEP_THRESHOLD: usize = 1024;

pub struct DedupeStore {
    seen: Mutex<HashMap<String, Instant>>,
    ttl: Duration,
}

impl DedupeStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Returns `true` the first time `message_id` is seen within the TTL
    /// window, `false` on a repeat. Sweeps expired entries once the table
    /// grows past a threshold, amortizing cleanup over inserts rather than
    /// running a background task.
    pub fn first_sighting(&self, message_id: &str) -> bool {
        let mut seen = self.seen.lock();
        let now = Instant::now();

        if let Some(seen_at) = seen.get(message_id) {
            if now.duration_since(*seen_at) < self.ttl {
                return false;
            }
        }

        seen.insert(message_id.to_string(), now);

        if seen.len() > SWEEP_THRESHOLD {
            let ttl = self.ttl;
            seen.retain(|_, seen_at| now.duration_since(*seen_at) < ttl);
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sighting_is_true_then_false_for_same_id() {
        let store = DedupeStore::new(Duration::from_secs(300));
        assert!(store.first_sighting("msg-1"));
        assert!(!store.first_sighting("msg-1"));
    }

    #[test]
    fn distinct_ids_are_independent() {
        let store = DedupeStore::new(Duration::from_secs(300));
        assert!(store.first_sighting("msg-1"));
        assert!(store.first_sighting("msg-2"));
    }

    #[test]
    fn expired_entry_is_seen_again() {
        let store = DedupeStore::new(Duration::from_millis(1));
        assert!(store.first_sighting("msg-1"));
        std::thread::sleep(Duration::from_millis(5));
        assert!(store.first_sighting("msg-1"));
    }

    #[test]
    fn sweep_drops_only_expired_entries() {
        let store = DedupeStore::new(Duration::from_millis(1));
        for i in 0..(SWEEP_THRESHOLD + 1) {
            store.first_sighting(&format!("old-{i}"));
        }
        std::thread::sleep(Duration::from_millis(5));
        assert!(store.first_sighting("trigger-sweep"));
        assert_eq!(store.seen.lock().len(), 1);
    }
}
