use tracing::{debug, info};

use crate::config::MemoryConfig;
use crate::models::chat::{ChatMessage, Role};

use super::pruner::prune_messages;
use super::store::{HistoryStore, MemoryError};
use super::token_estimator::TokenEstimator;

/// Conversation memory manager: persists turns in the history store and
/// reconstructs bounded prompt views through the pruner.
///
/// Appends from concurrent requests on the same session interleave at
/// store granularity (last-write-wins); there is no per-session
/// serialization of the read-modify-append cycle.
pub struct ConversationMemory {
    store: Box<dyn HistoryStore>,
    estimator: TokenEstimator,
    ttl_seconds: i64,
    defaults: MemoryConfig,
}

impl ConversationMemory {
    pub fn new(
        store: Box<dyn HistoryStore>,
        estimator: TokenEstimator,
        ttl_seconds: i64,
        defaults: MemoryConfig,
    ) -> Self {
        Self {
            store,
            estimator,
            ttl_seconds,
            defaults,
        }
    }

    fn session_key(session_id: &str) -> String {
        format!("chat:session:{}:history", session_id)
    }

    pub async fn connect(&self) -> Result<(), MemoryError> {
        self.store.connect().await
    }

    pub async fn disconnect(&self) {
        self.store.disconnect().await;
    }

    /// Append one message and refresh the session TTL to the full
    /// configured duration. Not retried on failure; the caller decides.
    pub async fn append(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> Result<(), MemoryError> {
        let entry = serde_json::to_string(&ChatMessage::new(role, content))?;

        self.store
            .append(&Self::session_key(session_id), entry, self.ttl_seconds)
            .await?;

        debug!("Added {} message to session {}", role.as_str(), session_id);
        Ok(())
    }

    /// Read the full stored sequence and return the pruned view.
    /// `None` budgets fall back to the configured defaults. A missing or
    /// expired session yields an empty list, not an error.
    pub async fn fetch_bounded(
        &self,
        session_id: &str,
        max_tokens: Option<usize>,
        max_turns: Option<usize>,
    ) -> Result<Vec<ChatMessage>, MemoryError> {
        let raw = self.store.read_all(&Self::session_key(session_id)).await?;

        if raw.is_empty() {
            return Ok(Vec::new());
        }

        let messages = raw
            .iter()
            .map(|entry| serde_json::from_str::<ChatMessage>(entry))
            .collect::<Result<Vec<_>, _>>()?;

        let total = messages.len();
        let max_tokens = max_tokens.unwrap_or(self.defaults.max_history_tokens);
        let max_turns = max_turns.unwrap_or(self.defaults.max_history_turns);

        let pruned = prune_messages(messages, &self.estimator, Some(max_tokens), Some(max_turns));

        debug!(
            "Retrieved {} messages for session {} (stored: {})",
            pruned.len(),
            session_id,
            total
        );

        Ok(pruned)
    }

    /// Delete the session's entire stored sequence immediately.
    pub async fn clear(&self, session_id: &str) -> Result<(), MemoryError> {
        self.store.delete(&Self::session_key(session_id)).await?;
        info!("Cleared history for session {}", session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::store::test_support::InMemoryStore;
    use super::super::store::MockHistoryStore;
    use super::*;

    fn defaults() -> MemoryConfig {
        MemoryConfig {
            max_history_tokens: 4000,
            max_history_turns: 20,
        }
    }

    fn memory_with(store: InMemoryStore) -> ConversationMemory {
        ConversationMemory::new(
            Box::new(store),
            TokenEstimator::approximate(),
            86400,
            defaults(),
        )
    }

    #[tokio::test]
    async fn test_append_then_fetch_preserves_order() {
        let store = InMemoryStore::new();
        let memory = memory_with(store.clone());

        memory.append("s1", Role::User, "hi").await.unwrap();
        memory.append("s1", Role::Assistant, "yo").await.unwrap();

        let history = memory.fetch_bounded("s1", None, None).await.unwrap();
        assert_eq!(
            history,
            vec![ChatMessage::user("hi"), ChatMessage::assistant("yo")]
        );
    }

    #[tokio::test]
    async fn test_append_refreshes_ttl() {
        let store = InMemoryStore::new();
        let memory = memory_with(store.clone());

        memory.append("s1", Role::User, "hi").await.unwrap();
        assert_eq!(store.last_ttl(), Some(86400));
    }

    #[tokio::test]
    async fn test_fetch_missing_session_is_empty() {
        let memory = memory_with(InMemoryStore::new());
        let history = memory.fetch_bounded("nope", None, None).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_clear_then_fetch_is_empty() {
        let store = InMemoryStore::new();
        let memory = memory_with(store.clone());

        memory.append("s1", Role::User, "hi").await.unwrap();
        memory.clear("s1").await.unwrap();

        let history = memory.fetch_bounded("s1", None, None).await.unwrap();
        assert!(history.is_empty());
        assert!(store.entries("chat:session:s1:history").is_empty());
    }

    #[tokio::test]
    async fn test_fetch_is_idempotent_without_writes() {
        let store = InMemoryStore::new();
        let memory = memory_with(store.clone());

        for i in 0..6 {
            memory
                .append("s1", Role::User, &format!("q{}", i))
                .await
                .unwrap();
            memory
                .append("s1", Role::Assistant, &format!("a{}", i))
                .await
                .unwrap();
        }

        let first = memory.fetch_bounded("s1", Some(60), Some(4)).await.unwrap();
        let second = memory.fetch_bounded("s1", Some(60), Some(4)).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_explicit_budgets_override_defaults() {
        let store = InMemoryStore::new();
        let memory = memory_with(store.clone());

        for i in 0..5 {
            memory
                .append("s1", Role::User, &format!("question number {}", i))
                .await
                .unwrap();
            memory
                .append("s1", Role::Assistant, &format!("answer number {}", i))
                .await
                .unwrap();
        }

        let bounded = memory
            .fetch_bounded("s1", None, Some(2))
            .await
            .unwrap();
        assert_eq!(bounded.len(), 4);
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_unretried() {
        let mut mock = MockHistoryStore::new();
        mock.expect_append()
            .times(1)
            .returning(|_, _, _| Err(MemoryError::StoreUnavailable("connection refused".into())));

        let memory = ConversationMemory::new(
            Box::new(mock),
            TokenEstimator::approximate(),
            86400,
            defaults(),
        );

        let result = memory.append("s1", Role::User, "hi").await;
        assert!(matches!(result, Err(MemoryError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_session_key_namespacing() {
        let mut mock = MockHistoryStore::new();
        mock.expect_append()
            .withf(|key, _, ttl| key == "chat:session:abc-123:history" && *ttl == 600)
            .times(1)
            .returning(|_, _, _| Ok(()));

        let memory = ConversationMemory::new(
            Box::new(mock),
            TokenEstimator::approximate(),
            600,
            defaults(),
        );

        memory.append("abc-123", Role::User, "hi").await.unwrap();
    }
}
