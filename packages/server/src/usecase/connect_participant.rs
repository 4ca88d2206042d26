//! UseCase: 参加者接続処理
//!
//! ### 何をテストしているか
//! - 接続時に全クライアントへ `info` (action: joined) が配信されること
//! - `connect` ハンドシェイクに対して接続者本人へ `info` が返されること

use std::sync::Arc;

use crate::domain::{ConnectionId, MessagePusher, PusherChannel};

use super::{ACTION_JOINED, ConnectError, encode, presence};

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    message_pusher: Arc<dyn MessagePusher>,
}

impl ConnectParticipantUseCase {
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self { message_pusher }
    }

    /// 参加者を登録し、接続数を全員に通知する
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - 登録後の接続数
    pub async fn execute(
        &self,
        id: ConnectionId,
        sender: PusherChannel,
    ) -> Result<usize, ConnectError> {
        self.message_pusher.register_client(id, sender).await;
        let total = self.message_pusher.count().await;

        let json = encode(&presence(total, Some(ACTION_JOINED)))?;
        let delivered = self.message_pusher.broadcast(&json).await;
        tracing::info!(
            "Client {} joined ({} online, notified {})",
            id,
            total,
            delivered
        );
        Ok(total)
    }

    /// `connect` ハンドシェイクへの応答として接続数を本人に返す
    pub async fn greet(&self, id: &ConnectionId) -> Result<(), ConnectError> {
        let total = self.message_pusher.count().await;
        let json = encode(&presence(total, None))?;
        self.message_pusher.push_to(id, &json).await?;
        Ok(())
    }
}
