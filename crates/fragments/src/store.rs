//! Fragment Store (§4.1) — per-user append-only buffer of raw text
//! fragments with atomic drain-and-clear.

use std::collections::HashMap;

use parking_lot::Mutex;

use relay_domain::fragment::{Fragment, UserKey};

#[derive(Default)]
struct UserBuffer {
    fragments: Vec<Fragment>,
    next_ordinal: u64,
}

/// Maps `UserKey -> ordered sequence of Fragment`. Appends and drains for
/// the same key are linearized by the per-key entry in the map; distinct
/// keys never contend because each holds a separate buffer behind the
/// single map lock, and both operations are O(1) while holding it.
pub struct FragmentStore {
    buffers: Mutex<HashMap<UserKey, UserBuffer>>,
}

impl Default for FragmentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FragmentStore {
    pub fn new() -> Self {
        Self {
            buffers: Mutex::new(HashMap::new()),
        }
    }

    /// Push `text` to the tail of `user`'s sequence. Returns the fragment's
    /// arrival ordinal.
    pub fn append(&self, user: &UserKey, text: impl Into<String>) -> u64 {
        let mut buffers = self.buffers.lock();
        let buf = buffers.entry(user.clone()).or_default();
        let ordinal = buf.next_ordinal;
        buf.next_ordinal += 1;
        buf.fragments.push(Fragment {
            text: text.into(),
            ordinal,
        });
        ordinal
    }

    /// Atomically return and remove the current sequence for `user`, in
    /// arrival order. Unknown or already-drained keys return empty —
    /// never an error. No fragment is ever returned by two drains: the
    /// buffer is removed from the map before the lock is released.
    pub fn drain(&self, user: &UserKey) -> Vec<Fragment> {
        let mut buffers = self.buffers.lock();
        match buffers.remove(user) {
            Some(buf) => buf.fragments,
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_on_unknown_user_returns_empty() {
        let store = FragmentStore::new();
        assert!(store.drain(&"ghost".to_string()).is_empty());
    }

    #[test]
    fn append_then_drain_preserves_arrival_order() {
        let store = FragmentStore::new();
        let user = "u1".to_string();
        store.append(&user, "a");
        store.append(&user, "b");
        store.append(&user, "c");
        let drained = store.drain(&user);
        let texts: Vec<_> = drained.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn drain_is_atomic_second_drain_is_empty() {
        let store = FragmentStore::new();
        let user = "u1".to_string();
        store.append(&user, "a");
        let first = store.drain(&user);
        let second = store.drain(&user);
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[test]
    fn distinct_users_do_not_share_buffers() {
        let store = FragmentStore::new();
        store.append(&"u1".to_string(), "hello");
        assert!(store.drain(&"u2".to_string()).is_empty());
        assert_eq!(store.drain(&"u1".to_string()).len(), 1);
    }
}
