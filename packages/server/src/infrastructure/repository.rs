//! Bounded in-memory message history.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;
use unihub_shared::protocol::ChatMessage;

use crate::domain::{HISTORY_CAPACITY, MessageRepository};

pub struct InMemoryMessageRepository {
    messages: Mutex<VecDeque<ChatMessage>>,
    capacity: usize,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }
}

impl Default for InMemoryMessageRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn append(&self, message: ChatMessage) {
        let mut messages = self.messages.lock().await;
        messages.push_back(message);
        while messages.len() > self.capacity {
            messages.pop_front();
        }
    }

    async fn recent(&self, limit: usize) -> Vec<ChatMessage> {
        let messages = self.messages.lock().await;
        let skip = messages.len().saturating_sub(limit);
        messages.iter().skip(skip).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: &str) -> ChatMessage {
        ChatMessage {
            text: text.to_string(),
            member_data: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_recent_returns_oldest_first() {
        // テスト項目: 履歴は古い順に返される
        // given (前提条件):
        let repository = InMemoryMessageRepository::new();
        for text in ["a", "b", "c"] {
            repository.append(message(text)).await;
        }

        // when (操作):
        let recent = repository.recent(10).await;

        // then (期待する結果):
        let texts: Vec<&str> = recent.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_recent_limits_to_newest() {
        // テスト項目: limit を超える場合は新しいものだけが返される
        // given (前提条件):
        let repository = InMemoryMessageRepository::new();
        for text in ["a", "b", "c", "d"] {
            repository.append(message(text)).await;
        }

        // when (操作):
        let recent = repository.recent(2).await;

        // then (期待する結果):
        assert_eq!(recent, vec![message("c"), message("d")]);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        // テスト項目: 容量を超えると最も古いメッセージから破棄される
        // given (前提条件):
        let repository = InMemoryMessageRepository::with_capacity(2);

        // when (操作):
        for text in ["a", "b", "c"] {
            repository.append(message(text)).await;
        }

        // then (期待する結果):
        assert_eq!(repository.recent(10).await, vec![message("b"), message("c")]);
    }
}
