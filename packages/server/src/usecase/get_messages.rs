//! UseCase: 履歴取得処理

use std::sync::Arc;

use unihub_shared::protocol::InboundEvent;

use crate::domain::{ConnectionId, HISTORY_CAPACITY, MessagePusher, MessageRepository};

use super::{GetMessagesError, encode};

/// 履歴取得のユースケース
pub struct GetMessagesUseCase {
    repository: Arc<dyn MessageRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl GetMessagesUseCase {
    pub fn new(
        repository: Arc<dyn MessageRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// 直近の履歴を要求者にのみ返す
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - 返したメッセージ数
    pub async fn execute(&self, id: &ConnectionId) -> Result<usize, GetMessagesError> {
        let list = self.repository.recent(HISTORY_CAPACITY).await;
        let count = list.len();
        let json = encode(&InboundEvent::GetMessages { list })?;
        self.message_pusher.push_to(id, &json).await?;
        Ok(count)
    }
}
