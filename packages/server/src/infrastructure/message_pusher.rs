//! WebSocket-backed `MessagePusher`.
//!
//! Holds each connection's `UnboundedSender`; the socket itself is accepted
//! and driven by the UI layer.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ConnectionId, MessagePushError, MessagePusher, PusherChannel};

#[derive(Default)]
pub struct WebSocketMessagePusher {
    clients: Mutex<HashMap<ConnectionId, PusherChannel>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, id: ConnectionId, sender: PusherChannel) {
        self.clients.lock().await.insert(id, sender);
        tracing::debug!("Client {} registered", id);
    }

    async fn unregister_client(&self, id: &ConnectionId) {
        self.clients.lock().await.remove(id);
        tracing::debug!("Client {} unregistered", id);
    }

    async fn push_to(&self, id: &ConnectionId, content: &str) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;
        let sender = clients
            .get(id)
            .ok_or(MessagePushError::ClientNotFound(*id))?;
        sender
            .send(content.to_string())
            .map_err(|_| MessagePushError::PushFailed(*id))
    }

    async fn broadcast(&self, content: &str) -> usize {
        let clients = self.clients.lock().await;
        let mut delivered = 0;
        for (id, sender) in clients.iter() {
            match sender.send(content.to_string()) {
                Ok(()) => delivered += 1,
                Err(_) => tracing::debug!("Skipping closed client {}", id),
            }
        }
        delivered
    }

    async fn count(&self) -> usize {
        self.clients.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test]
    async fn test_push_to_registered_client() {
        // テスト項目: 登録済みクライアントにメッセージが届く
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let id = ConnectionId::generate();
        let (tx, mut rx) = mpsc::unbounded_channel();
        pusher.register_client(id, tx).await;

        // when (操作):
        let result = pusher.push_to(&id, "hello").await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(rx.recv().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_push_to_unknown_client_fails() {
        // テスト項目: 未登録クライアントへの送信は ClientNotFound
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let id = ConnectionId::generate();

        // when (操作):
        let result = pusher.push_to(&id, "hello").await;

        // then (期待する結果):
        assert_eq!(result, Err(MessagePushError::ClientNotFound(id)));
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone_and_skips_closed() {
        // テスト項目: ブロードキャストは全員に届き、閉じたチャンネルはスキップされる
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (alice_tx, mut alice_rx) = mpsc::unbounded_channel();
        let (bob_tx, mut bob_rx) = mpsc::unbounded_channel();
        let (gone_tx, gone_rx) = mpsc::unbounded_channel();
        drop(gone_rx);
        pusher.register_client(ConnectionId::generate(), alice_tx).await;
        pusher.register_client(ConnectionId::generate(), bob_tx).await;
        pusher.register_client(ConnectionId::generate(), gone_tx).await;

        // when (操作):
        let delivered = pusher.broadcast("hi all").await;

        // then (期待する結果):
        assert_eq!(delivered, 2);
        assert_eq!(pusher.count().await, 3);
        assert_eq!(alice_rx.recv().await.as_deref(), Some("hi all"));
        assert_eq!(bob_rx.recv().await.as_deref(), Some("hi all"));
    }

    #[tokio::test]
    async fn test_unregister_removes_client() {
        // テスト項目: 登録解除後はクライアント数が減る
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let id = ConnectionId::generate();
        let (tx, _rx) = mpsc::unbounded_channel();
        pusher.register_client(id, tx).await;

        // when (操作):
        pusher.unregister_client(&id).await;

        // then (期待する結果):
        assert_eq!(pusher.count().await, 0);
    }
}
