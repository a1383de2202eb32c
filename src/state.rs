//! Per-chat conversation state machine.
//!
//! Two states per chat: idle, or waiting for the user to press
//! confirm/cancel under a prompt. State is volatile by design; a restart
//! drops all pending confirmations and the registry lookup surfaces that to
//! the user as an expired link.

use std::collections::HashMap;
use std::sync::Arc;
use teloxide::types::ChatId;
use tokio::sync::Mutex;

/// Conversation state for a single chat.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConversationState {
    /// No pending action
    #[default]
    Idle,
    /// A confirmation prompt is outstanding for this registry id
    AwaitingConfirmation { pending_link_id: String },
}

impl ConversationState {
    pub fn is_awaiting_confirmation(&self) -> bool {
        matches!(self, ConversationState::AwaitingConfirmation { .. })
    }
}

/// Mutex-guarded map of chat id to conversation state.
///
/// Contention is per-message and low, so a single mutex over the whole map
/// is enough; handlers for different chats only hold it for a few map
/// operations.
#[derive(Clone, Default)]
pub struct ConversationStore {
    states: Arc<Mutex<HashMap<ChatId, ConversationState>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state for a chat; chats with no recorded state are idle.
    pub async fn get(&self, chat_id: ChatId) -> ConversationState {
        self.states.lock().await.get(&chat_id).cloned().unwrap_or_default()
    }

    /// Records that a confirmation prompt is outstanding for `link_id`.
    ///
    /// Callers must have stored the link in the registry first, so every
    /// `pending_link_id` always has a registry entry behind it at set time.
    pub async fn set_awaiting(&self, chat_id: ChatId, link_id: String) {
        let mut states = self.states.lock().await;
        if let Some(ConversationState::AwaitingConfirmation { pending_link_id }) = states.get(&chat_id) {
            // Superseded by a new URL: the old prompt is abandoned explicitly.
            log::info!("Chat {} superseded pending link {} with a new request", chat_id, pending_link_id);
        }
        states.insert(chat_id, ConversationState::AwaitingConfirmation { pending_link_id: link_id });
    }

    /// Resets a chat to idle. Used on confirm, cancel, error and any
    /// unrecognized callback.
    pub async fn clear(&self, chat_id: ChatId) {
        self.states.lock().await.remove(&chat_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CHAT: ChatId = ChatId(42);

    #[tokio::test]
    async fn test_unknown_chat_is_idle() {
        let store = ConversationStore::new();
        assert_eq!(store.get(CHAT).await, ConversationState::Idle);
    }

    #[tokio::test]
    async fn test_awaiting_then_clear() {
        let store = ConversationStore::new();
        store.set_awaiting(CHAT, "a1b2c3d4e5f6".to_string()).await;
        assert!(store.get(CHAT).await.is_awaiting_confirmation());

        store.clear(CHAT).await;
        assert_eq!(store.get(CHAT).await, ConversationState::Idle);
    }

    #[tokio::test]
    async fn test_new_link_supersedes_pending() {
        let store = ConversationStore::new();
        store.set_awaiting(CHAT, "0000aaaa1111".to_string()).await;
        store.set_awaiting(CHAT, "2222bbbb3333".to_string()).await;

        assert_eq!(
            store.get(CHAT).await,
            ConversationState::AwaitingConfirmation {
                pending_link_id: "2222bbbb3333".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_chats_are_independent() {
        let store = ConversationStore::new();
        store.set_awaiting(ChatId(1), "4444cccc5555".to_string()).await;

        assert!(store.get(ChatId(1)).await.is_awaiting_confirmation());
        assert_eq!(store.get(ChatId(2)).await, ConversationState::Idle);

        store.clear(ChatId(1)).await;
        assert_eq!(store.get(ChatId(1)).await, ConversationState::Idle);
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let store = ConversationStore::new();
        store.clear(CHAT).await;
        store.clear(CHAT).await;
        assert_eq!(store.get(CHAT).await, ConversationState::Idle);
    }
}
