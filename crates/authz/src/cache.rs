//! Group Membership Cache (§4.3) — time-bounded cache of group ->
//! member-ID sets. Read-mostly; the last write wins on concurrent misses
//! (duplicate fetch work is acceptable, never corruption).

use std::collections::{HashMap, HashSet};

use chrono::{Duration, Utc};
use parking_lot::RwLock;

use relay_domain::group::GroupSnapshot;

pub struct GroupMembershipCache {
    snapshots: RwLock<HashMap<String, GroupSnapshot>>,
    default_ttl: Duration,
}

impl GroupMembershipCache {
    pub fn new(default_ttl_minutes: i64) -> Self {
        Self {
            snapshots: RwLock::new(HashMap::new()),
            default_ttl: Duration::minutes(default_ttl_minutes),
        }
    }

    /// Members of `group`, if a still-fresh snapshot exists. Expired or
    /// absent snapshots return `None` — the caller (Authorization Gate) is
    /// responsible for refilling.
    pub fn get_members(&self, group: &str) -> Option<HashSet<String>> {
        let snapshots = self.snapshots.read();
        let snapshot = snapshots.get(group)?;
        if snapshot.is_fresh(Utc::now()) {
            Some(snapshot.members.clone())
        } else {
            None
        }
    }

    /// Replace the snapshot for `group` using the cache's configured TTL.
    pub fn put_members(&self, group: &str, members: HashSet<String>) {
        let snapshot = GroupSnapshot::new(group, members, self.default_ttl);
        self.snapshots.write().insert(group.to_string(), snapshot);
    }

    /// Convenience over `get_members`: matches `id` against the member set,
    /// either exactly or by its bare-number form. Returns `false` (not an
    /// error) when the snapshot is missing or stale.
    pub fn is_member(&self, group: &str, id: &str) -> bool {
        self.is_member_any(group, &[id])
    }

    /// Like `is_member`, but matches if *any* of the candidate identities
    /// (a sender's primary ID and, in groups, its alternate-format ID) is
    /// in the member set. Matching falls back to the bare-number form (the
    /// id with everything from `@` onward stripped) so a member recorded as
    /// a JID still matches a phone-only candidate and vice versa.
    pub fn is_member_any(&self, group: &str, ids: &[&str]) -> bool {
        match self.get_members(group) {
            Some(members) => ids.iter().any(|id| {
                members.contains(*id) || members.iter().any(|m| phone_only(m) == phone_only(id))
            }),
            None => false,
        }
    }
}

/// Strip everything from `@` onward, e.g. `"5511111111@s.whatsapp.net"` ->
/// `"5511111111"`. IDs with no `@` (already bare) are returned unchanged.
fn phone_only(id: &str) -> &str {
    id.split('@').next().unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_within_ttl_returns_members() {
        let cache = GroupMembershipCache::new(60);
        let members: HashSet<_> = ["5511111111".to_string()].into_iter().collect();
        cache.put_members("g1", members.clone());
        assert_eq!(cache.get_members("g1"), Some(members));
    }

    #[test]
    fn get_on_unknown_group_returns_none() {
        let cache = GroupMembershipCache::new(60);
        assert_eq!(cache.get_members("ghost"), None);
    }

    #[test]
    fn expired_snapshot_is_treated_as_absent() {
        let cache = GroupMembershipCache::new(-1); // already expired
        let members: HashSet<_> = ["a".to_string()].into_iter().collect();
        cache.put_members("g1", members);
        assert_eq!(cache.get_members("g1"), None);
        assert!(!cache.is_member("g1", "a"));
    }

    #[test]
    fn bare_member_matches_jid_form_candidate() {
        let cache = GroupMembershipCache::new(60);
        cache.put_members("g1", ["5511111111".to_string()].into_iter().collect());
        assert!(cache.is_member("g1", "5511111111@s.whatsapp.net"));
    }

    #[test]
    fn jid_member_matches_bare_candidate() {
        let cache = GroupMembershipCache::new(60);
        cache.put_members(
            "g1",
            ["5511111111@lid".to_string()].into_iter().collect(),
        );
        assert!(cache.is_member_any("g1", &["5511111111"]));
    }
}
