use thiserror::Error;

use crate::domain::MessagePushError;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("Failed to encode presence update: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Push(#[from] MessagePushError),
}

#[derive(Debug, Error)]
pub enum SendMessageError {
    #[error("Message text is empty")]
    EmptyMessage,

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum GetMessagesError {
    #[error("Failed to encode history: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Push(#[from] MessagePushError),
}
