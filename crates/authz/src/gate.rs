//! Authorization Gate (§4.4) — decides whether an inbound message's sender
//! identity is permitted, against the configured set of authorized groups.

use relay_domain::Result;

use crate::cache::GroupMembershipCache;

/// The subset of the chat provider's surface the gate needs: fetching a
/// group's current member-ID list on a cache miss.
#[async_trait::async_trait]
pub trait ChatProvider: Send + Sync {
    async fn get_group_participants(&self, group_id: &str) -> Result<Vec<String>>;
}

pub struct AuthorizationGate<'a> {
    cache: &'a GroupMembershipCache,
    chat: &'a dyn ChatProvider,
}

impl<'a> AuthorizationGate<'a> {
    pub fn new(cache: &'a GroupMembershipCache, chat: &'a dyn ChatProvider) -> Self {
        Self { cache, chat }
    }

    /// Permit iff `sender` is a member of at least one group in
    /// `authorized_group_ids`. A group the chat provider refuses to list
    /// contributes no members and does not abort the check; if every
    /// group fails to list and the sender isn't already cached anywhere,
    /// this denies.
    pub async fn authorize(&self, sender: &str, authorized_group_ids: &[String]) -> bool {
        self.authorize_any(&[sender], authorized_group_ids).await
    }

    /// Like `authorize`, but matches if any of `sender_ids` (a sender's
    /// primary ID and, in a group, its alternate-format ID) is a member.
    pub async fn authorize_any(&self, sender_ids: &[&str], authorized_group_ids: &[String]) -> bool {
        for group_id in authorized_group_ids {
            if self.cache.get_members(group_id).is_none() {
                match self.chat.get_group_participants(group_id).await {
                    // An empty result is treated as a miss, not a fresh empty
                    // snapshot — caching it would deny every sender for the
                    // full TTL on what is usually a transient provider hiccup.
                    Ok(members) if members.is_empty() => continue,
                    Ok(members) => {
                        self.cache
                            .put_members(group_id, members.into_iter().collect());
                    }
                    Err(e) => {
                        tracing::warn!(group_id, error = %e, "failed to list group participants");
                        continue;
                    }
                }
            }
            if self.cache.is_member_any(group_id, sender_ids) {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_domain::Error;
    use std::collections::HashMap;

    struct FakeChat {
        groups: HashMap<String, Vec<String>>,
        failing: Vec<String>,
    }

    #[async_trait::async_trait]
    impl ChatProvider for FakeChat {
        async fn get_group_participants(&self, group_id: &str) -> Result<Vec<String>> {
            if self.failing.contains(&group_id.to_string()) {
                return Err(Error::Http("provider unavailable".into()));
            }
            Ok(self.groups.get(group_id).cloned().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn permits_sender_in_authorized_group() {
        let cache = GroupMembershipCache::new(60);
        let chat = FakeChat {
            groups: HashMap::from([("g1".to_string(), vec!["5511111111".to_string()])]),
            failing: vec![],
        };
        let gate = AuthorizationGate::new(&cache, &chat);
        assert!(gate.authorize("5511111111", &["g1".to_string()]).await);
    }

    #[tokio::test]
    async fn denies_sender_not_in_any_group() {
        let cache = GroupMembershipCache::new(60);
        let chat = FakeChat {
            groups: HashMap::from([("g1".to_string(), vec!["other".to_string()])]),
            failing: vec![],
        };
        let gate = AuthorizationGate::new(&cache, &chat);
        assert!(!gate.authorize("5511111111", &["g1".to_string()]).await);
    }

    #[tokio::test]
    async fn failed_group_lookup_does_not_abort_remaining_groups() {
        let cache = GroupMembershipCache::new(60);
        let chat = FakeChat {
            groups: HashMap::from([("g2".to_string(), vec!["5511111111".to_string()])]),
            failing: vec!["g1".to_string()],
        };
        let gate = AuthorizationGate::new(&cache, &chat);
        assert!(
            gate.authorize("5511111111", &["g1".to_string(), "g2".to_string()])
                .await
        );
    }

    #[tokio::test]
    async fn all_groups_failing_denies() {
        let cache = GroupMembershipCache::new(60);
        let chat = FakeChat {
            groups: HashMap::new(),
            failing: vec!["g1".to_string()],
        };
        let gate = AuthorizationGate::new(&cache, &chat);
        assert!(!gate.authorize("5511111111", &["g1".to_string()]).await);
    }

    #[tokio::test]
    async fn empty_group_result_is_not_cached() {
        let cache = GroupMembershipCache::new(60);
        let chat = FakeChat {
            groups: HashMap::from([("g1".to_string(), vec![])]),
            failing: vec![],
        };
        let gate = AuthorizationGate::new(&cache, &chat);
        assert!(!gate.authorize("5511111111", &["g1".to_string()]).await);
        // A cached empty snapshot would make this None check fail forever;
        // it must still read as a miss so the next message refetches.
        assert!(cache.get_members("g1").is_none());
    }

    #[tokio::test]
    async fn cache_hit_avoids_refetch() {
        let cache = GroupMembershipCache::new(60);
        cache.put_members("g1", ["5511111111".to_string()].into_iter().collect());
        // Chat provider has no record of the group — if the gate tried to
        // refetch it would deny; the cache hit must short-circuit that.
        let chat = FakeChat {
            groups: HashMap::new(),
            failing: vec![],
        };
        let gate = AuthorizationGate::new(&cache, &chat);
        assert!(gate.authorize("5511111111", &["g1".to_string()]).await);
    }
}
