//! Message history seam.

use async_trait::async_trait;
use unihub_shared::protocol::ChatMessage;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Store one message, evicting the oldest beyond capacity.
    async fn append(&self, message: ChatMessage);

    /// Up to `limit` most recent messages, oldest first.
    async fn recent(&self, limit: usize) -> Vec<ChatMessage>;
}
