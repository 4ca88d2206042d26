//! Outbound delivery seam.
//!
//! Socket creation lives in the UI layer; implementations only hold the
//! per-connection sender and deliver frames through it.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ConnectionId, MessagePushError};

/// Channel feeding one client's socket writer
pub type PusherChannel = mpsc::UnboundedSender<String>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    async fn register_client(&self, id: ConnectionId, sender: PusherChannel);

    async fn unregister_client(&self, id: &ConnectionId);

    async fn push_to(&self, id: &ConnectionId, content: &str) -> Result<(), MessagePushError>;

    /// Deliver to every registered client; returns how many were reached.
    ///
    /// A client whose channel is closed is skipped, not treated as a failure.
    async fn broadcast(&self, content: &str) -> usize;

    async fn count(&self) -> usize;
}
