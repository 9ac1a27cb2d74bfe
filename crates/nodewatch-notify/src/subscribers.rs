//! Subscriber registry and allow-list.

use std::collections::BTreeSet;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use nodewatch_core::RecipientId;

/// Optional restriction on who may receive notifications.
///
/// An empty allow-list places no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList(BTreeSet<RecipientId>);

impl AllowList {
    /// An allow-list that lets every subscriber through.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.0.is_empty()
    }

    pub fn permits(&self, id: RecipientId) -> bool {
        self.0.is_empty() || self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeSet<RecipientId>> for AllowList {
    fn from(ids: BTreeSet<RecipientId>) -> Self {
        Self(ids)
    }
}

impl FromIterator<RecipientId> for AllowList {
    fn from_iter<I: IntoIterator<Item = RecipientId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// In-memory set of recipients that asked for alerts.
///
/// Command handlers mutate it while the scheduler may be delivering, so
/// readers work from [`snapshot`](Self::snapshot) copies.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    members: RwLock<BTreeSet<RecipientId>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id`. Returns `false` if it was already subscribed.
    pub fn subscribe(&self, id: RecipientId) -> bool {
        let added = self
            .members
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        debug!(recipient = id, added, "subscribe");
        added
    }

    /// Remove `id`. Removing a non-member is a no-op returning `false`.
    pub fn unsubscribe(&self, id: RecipientId) -> bool {
        let removed = self
            .members
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        debug!(recipient = id, removed, "unsubscribe");
        removed
    }

    pub fn contains(&self, id: RecipientId) -> bool {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id)
    }

    /// Membership at call time.
    pub fn snapshot(&self) -> BTreeSet<RecipientId> {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current subscribers narrowed by `allow_list`.
    pub fn eligible_recipients(&self, allow_list: &AllowList) -> BTreeSet<RecipientId> {
        let mut members = self.snapshot();
        if !allow_list.is_unrestricted() {
            members.retain(|id| allow_list.permits(*id));
        }
        members
    }

    pub fn len(&self) -> usize {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_is_idempotent() {
        let registry = SubscriberRegistry::new();
        assert!(registry.subscribe(42));
        assert!(!registry.subscribe(42));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unsubscribe_non_member_is_noop() {
        let registry = SubscriberRegistry::new();
        registry.subscribe(1);

        assert!(!registry.unsubscribe(2));
        assert_eq!(registry.snapshot(), BTreeSet::from([1]));

        assert!(registry.unsubscribe(1));
        assert!(!registry.unsubscribe(1));
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_is_detached_from_later_changes() {
        let registry = SubscriberRegistry::new();
        registry.subscribe(1);
        let snapshot = registry.snapshot();

        registry.unsubscribe(1);
        registry.subscribe(2);
        assert_eq!(snapshot, BTreeSet::from([1]));
        assert!(registry.contains(2));
    }

    #[test]
    fn eligible_with_empty_allow_list_is_everyone() {
        let registry = SubscriberRegistry::new();
        for id in [1, 2, 3] {
            registry.subscribe(id);
        }
        assert_eq!(
            registry.eligible_recipients(&AllowList::unrestricted()),
            BTreeSet::from([1, 2, 3])
        );
    }

    #[test]
    fn eligible_with_allow_list_is_intersection() {
        let registry = SubscriberRegistry::new();
        for id in [1, 2, 3] {
            registry.subscribe(id);
        }
        let allow: AllowList = [2, 3, 99].into_iter().collect();
        assert_eq!(registry.eligible_recipients(&allow), BTreeSet::from([2, 3]));
    }

    #[test]
    fn eligible_empty_when_no_overlap() {
        let registry = SubscriberRegistry::new();
        registry.subscribe(1);
        let allow = AllowList::from(BTreeSet::from([5]));
        assert!(registry.eligible_recipients(&allow).is_empty());
    }

    #[test]
    fn allow_list_permits() {
        assert!(AllowList::unrestricted().permits(7));
        let allow: AllowList = [1].into_iter().collect();
        assert!(allow.permits(1));
        assert!(!allow.permits(7));
        assert_eq!(allow.len(), 1);
    }
}
