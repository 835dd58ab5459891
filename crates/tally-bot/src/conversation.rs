//! Per-chat conversation state
//!
//! A chat enters `WaitingForConfirmation` once an expense has been
//! classified and leaves it when a category is picked, the user cancels,
//! or persisting fails. Absent entries are the idle state.

use std::collections::HashMap;
use std::sync::Mutex;

use tally_core::ExpenseCategorizationResponse;

/// Identifies one user's conversation in one chat
pub type ConversationKey = (i64, i64);

#[derive(Debug, Clone, PartialEq)]
pub enum ConversationState {
    /// Classified, waiting for the category keyboard
    WaitingForConfirmation {
        description: String,
        response: ExpenseCategorizationResponse,
    },
}

#[derive(Default)]
pub struct ConversationStore {
    states: Mutex<HashMap<ConversationKey, ConversationState>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start waiting for confirmation, replacing any pending expense
    pub fn await_confirmation(
        &self,
        key: ConversationKey,
        description: String,
        response: ExpenseCategorizationResponse,
    ) {
        self.lock().insert(
            key,
            ConversationState::WaitingForConfirmation {
                description,
                response,
            },
        );
    }

    /// Remove and return the pending state, ending the conversation
    pub fn take(&self, key: ConversationKey) -> Option<ConversationState> {
        self.lock().remove(&key)
    }

    /// End the conversation; true when one was in progress
    pub fn clear(&self, key: ConversationKey) -> bool {
        self.lock().remove(&key).is_some()
    }

    pub fn is_waiting(&self, key: ConversationKey) -> bool {
        self.lock().contains_key(&key)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ConversationKey, ConversationState>> {
        // A panic while holding the lock leaves the map itself intact
        self.states.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::ai::classify_keywords;

    #[test]
    fn test_confirmation_lifecycle() {
        let store = ConversationStore::new();
        let key = (1, 2);
        assert!(!store.is_waiting(key));

        let response = classify_keywords("Taxi 12 EUR");
        store.await_confirmation(key, "Taxi 12 EUR".to_string(), response.clone());
        assert!(store.is_waiting(key));
        // Another user in the same chat is independent
        assert!(!store.is_waiting((1, 3)));

        let state = store.take(key).unwrap();
        assert_eq!(
            state,
            ConversationState::WaitingForConfirmation {
                description: "Taxi 12 EUR".to_string(),
                response,
            }
        );
        assert!(store.take(key).is_none());
        assert!(!store.clear(key));
    }
}
