//! The subscriber registry.
//!
//! Maps subscription keys to subscriber ids, in registration order. Dispatch
//! takes a snapshot at entry: subscribers added or removed while handling an
//! event do not affect the current dispatch. Within one event, exact-kind
//! handlers fire before category handlers (the event's key list is ordered
//! most-specific-first), and a subscriber registered under several matching
//! keys is invoked once.

use rustc_hash::FxHashMap;

use super::event::{Event, EventKey};
use crate::core::entity::ObjectId;

/// Subscription table: event key → subscriber ids in registration order.
#[derive(Clone, Debug, Default)]
pub struct SubscriberRegistry {
    by_key: FxHashMap<EventKey, Vec<ObjectId>>,
}

impl SubscriberRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for a key.
    pub fn register(&mut self, key: EventKey, owner: ObjectId) {
        let list = self.by_key.entry(key).or_default();
        if !list.contains(&owner) {
            list.push(owner);
        }
    }

    /// Remove a subscriber from every key.
    pub fn unregister(&mut self, owner: ObjectId) {
        self.by_key.retain(|_, list| {
            list.retain(|&id| id != owner);
            !list.is_empty()
        });
    }

    /// Snapshot the subscribers for an event, deduplicated, exact kinds
    /// before categories, registration order within a key.
    #[must_use]
    pub fn snapshot(&self, event: &Event) -> Vec<ObjectId> {
        let mut result = Vec::new();
        for key in event.payload.keys() {
            if let Some(list) = self.by_key.get(&key) {
                for &id in list {
                    if !result.contains(&id) {
                        result.push(id);
                    }
                }
            }
        }
        result
    }

    /// Total number of (key, subscriber) registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_key.values().map(Vec::len).sum()
    }

    /// Is the registry empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::action::{Action, ActionId, ActionSpec, ActionTag};
    use crate::events::event::EventPayload;

    fn kill_event() -> Event {
        let view = Action::from_spec(ActionId(1), ActionSpec::kill(ObjectId(1), ObjectId(2))).view();
        Event {
            seq: 0,
            payload: EventPayload::PreAction(view),
        }
    }

    #[test]
    fn test_exact_before_category() {
        let mut registry = SubscriberRegistry::new();
        registry.register(EventKey::PreAction(None), ObjectId(10));
        registry.register(EventKey::PreAction(Some(ActionTag::Kill)), ObjectId(11));

        // The category subscriber registered first, but the exact-kind
        // subscriber dispatches first.
        assert_eq!(
            registry.snapshot(&kill_event()),
            vec![ObjectId(11), ObjectId(10)]
        );
    }

    #[test]
    fn test_registration_order_within_key() {
        let mut registry = SubscriberRegistry::new();
        registry.register(EventKey::PreAction(None), ObjectId(12));
        registry.register(EventKey::PreAction(None), ObjectId(10));
        registry.register(EventKey::PreAction(None), ObjectId(11));

        assert_eq!(
            registry.snapshot(&kill_event()),
            vec![ObjectId(12), ObjectId(10), ObjectId(11)]
        );
    }

    #[test]
    fn test_dedup_across_keys() {
        let mut registry = SubscriberRegistry::new();
        registry.register(EventKey::PreAction(Some(ActionTag::Kill)), ObjectId(10));
        registry.register(EventKey::PreAction(None), ObjectId(10));

        assert_eq!(registry.snapshot(&kill_event()), vec![ObjectId(10)]);
    }

    #[test]
    fn test_unregister_everywhere() {
        let mut registry = SubscriberRegistry::new();
        registry.register(EventKey::PreAction(None), ObjectId(10));
        registry.register(EventKey::PhaseChange, ObjectId(10));
        registry.register(EventKey::PhaseChange, ObjectId(11));

        registry.unregister(ObjectId(10));

        assert!(registry.snapshot(&kill_event()).is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unmatched_event_is_ignored() {
        let mut registry = SubscriberRegistry::new();
        registry.register(EventKey::PhaseChange, ObjectId(10));
        assert!(registry.snapshot(&kill_event()).is_empty());
    }
}
