//! UseCase: メッセージ送信処理
//!
//! ### 何をテストしているか
//! - サーバー時刻が付与され、履歴に保存されること
//! - 送信者を含む全員にブロードキャストされること（送信者への到達が送信完了の合図）
//! - 空メッセージが拒否されること

use std::sync::Arc;

use unihub_shared::{
    protocol::{ChatMessage, InboundEvent, MemberData},
    time::Clock,
};

use crate::domain::{MessagePusher, MessageRepository};

use super::{SendMessageError, encode};

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    repository: Arc<dyn MessageRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
    pub fn new(
        repository: Arc<dyn MessageRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            clock,
        }
    }

    /// メッセージを保存し、全員に配信する
    ///
    /// # Returns
    ///
    /// * `Ok(ChatMessage)` - サーバー時刻付きで保存されたメッセージ
    /// * `Err(SendMessageError)` - 空メッセージなど
    pub async fn execute(
        &self,
        text: String,
        member_data: MemberData,
    ) -> Result<ChatMessage, SendMessageError> {
        if text.trim().is_empty() {
            return Err(SendMessageError::EmptyMessage);
        }

        let message = ChatMessage {
            text,
            member_data: Some(member_data),
            created_at: Some(self.clock.now_iso8601()),
        };
        let json = encode(&InboundEvent::Message(message.clone()))?;

        self.repository.append(message.clone()).await;
        let delivered = self.message_pusher.broadcast(&json).await;
        tracing::debug!("Message delivered to {} clients", delivered);
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use unihub_shared::time::FixedClock;

    use super::*;
    use crate::{
        domain::{ConnectionId, MockMessagePusher, MockMessageRepository},
        infrastructure::{InMemoryMessageRepository, WebSocketMessagePusher},
    };

    fn alice() -> MemberData {
        MemberData {
            id: "m-1".to_string(),
            nickname: "alice".to_string(),
            avatar_path: None,
            full_name: None,
        }
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock::from_millis(1_709_285_400_123))
    }

    #[tokio::test]
    async fn test_send_stamps_stores_and_broadcasts_to_sender_too() {
        // テスト項目: サーバー時刻付きで保存され、送信者を含む全員に配信される
        // given (前提条件):
        let repository = Arc::new(InMemoryMessageRepository::new());
        let pusher = Arc::new(WebSocketMessagePusher::new());
        let (sender_tx, mut sender_rx) = mpsc::unbounded_channel();
        let (other_tx, mut other_rx) = mpsc::unbounded_channel();
        pusher.register_client(ConnectionId::generate(), sender_tx).await;
        pusher.register_client(ConnectionId::generate(), other_tx).await;
        let usecase = SendMessageUseCase::new(repository.clone(), pusher, clock());

        // when (操作):
        let message = usecase
            .execute("hello campus".to_string(), alice())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(message.created_at.as_deref(), Some("2024-03-01T09:30:00.123Z"));
        assert_eq!(repository.recent(10).await, vec![message.clone()]);
        let expected = serde_json::to_string(&InboundEvent::Message(message)).unwrap();
        assert_eq!(sender_rx.recv().await, Some(expected.clone()));
        assert_eq!(other_rx.recv().await, Some(expected));
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected_without_side_effects() {
        // テスト項目: 空メッセージは保存も配信もされない
        // given (前提条件):
        let mut repository = MockMessageRepository::new();
        repository.expect_append().never();
        let mut pusher = MockMessagePusher::new();
        pusher.expect_broadcast().never();
        let usecase = SendMessageUseCase::new(Arc::new(repository), Arc::new(pusher), clock());

        // when (操作):
        let result = usecase.execute("   ".to_string(), alice()).await;

        // then (期待する結果):
        assert!(matches!(result, Err(SendMessageError::EmptyMessage)));
    }

    #[tokio::test]
    async fn test_broadcast_payload_is_a_message_event() {
        // テスト項目: 配信されるフレームは message イベントの JSON
        // given (前提条件):
        let mut repository = MockMessageRepository::new();
        repository.expect_append().times(1).returning(|_| ());
        let mut pusher = MockMessagePusher::new();
        pusher
            .expect_broadcast()
            .withf(|content: &str| {
                content.starts_with(r#"{"event":"message","text":"hi""#)
                    && content.contains(r#""nickname":"alice""#)
            })
            .times(1)
            .returning(|_| 1);
        let usecase = SendMessageUseCase::new(Arc::new(repository), Arc::new(pusher), clock());

        // when (操作):
        let result = usecase.execute("hi".to_string(), alice()).await;

        // then (期待する結果):
        assert!(result.is_ok());
    }
}
