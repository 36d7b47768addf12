use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard},
};

use crate::domain::ChatId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Subscribed,
    AlreadySubscribed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnsubscribeOutcome {
    Unsubscribed,
    NotSubscribed,
}

/// In-memory set of chats that want change notifications.
///
/// Membership is lost on restart. `snapshot()` copies the set so the fan-out
/// can iterate while commands keep mutating the registry.
#[derive(Default)]
pub struct SubscriberRegistry {
    inner: Mutex<HashSet<ChatId>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self) -> MutexGuard<'_, HashSet<ChatId>> {
        // A poisoned set is still a valid set; keep serving it.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add(&self, chat_id: ChatId) -> SubscribeOutcome {
        if self.set().insert(chat_id) {
            SubscribeOutcome::Subscribed
        } else {
            SubscribeOutcome::AlreadySubscribed
        }
    }

    pub fn remove(&self, chat_id: ChatId) -> UnsubscribeOutcome {
        if self.set().remove(&chat_id) {
            UnsubscribeOutcome::Unsubscribed
        } else {
            UnsubscribeOutcome::NotSubscribed
        }
    }

    pub fn contains(&self, chat_id: ChatId) -> bool {
        self.set().contains(&chat_id)
    }

    /// Point-in-time copy of the members, sorted for stable delivery order.
    pub fn snapshot(&self) -> Vec<ChatId> {
        let mut ids: Vec<ChatId> = self.set().iter().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.set().len()
    }

    pub fn is_empty(&self) -> bool {
        self.set().is_empty()
    }
}
