use thiserror::Error;

use super::ConnectionId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessagePushError {
    #[error("Client {0} is not registered")]
    ClientNotFound(ConnectionId),

    /// The client's socket task has gone away
    #[error("Failed to push to client {0}")]
    PushFailed(ConnectionId),
}
