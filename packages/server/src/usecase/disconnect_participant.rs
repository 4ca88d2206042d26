//! UseCase: 参加者切断処理

use std::sync::Arc;

use crate::domain::{ConnectionId, MessagePusher};

use super::{ACTION_LEFT, ConnectError, encode, presence};

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectParticipantUseCase {
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self { message_pusher }
    }

    /// 登録を解除し、残りの参加者に接続数を通知する
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - 切断後の接続数
    pub async fn execute(&self, id: &ConnectionId) -> Result<usize, ConnectError> {
        self.message_pusher.unregister_client(id).await;
        let remaining = self.message_pusher.count().await;

        let json = encode(&presence(remaining, Some(ACTION_LEFT)))?;
        self.message_pusher.broadcast(&json).await;
        tracing::info!("Client {} left ({} online)", id, remaining);
        Ok(remaining)
    }
}
