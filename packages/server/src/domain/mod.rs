//! Domain layer: identifiers and the traits the use cases depend on.

mod connection;
mod error;
mod message_pusher;
mod repository;

pub use connection::ConnectionId;
pub use error::MessagePushError;
pub use message_pusher::{MessagePusher, PusherChannel};
pub use repository::MessageRepository;

#[cfg(test)]
pub use message_pusher::MockMessagePusher;
#[cfg(test)]
pub use repository::MockMessageRepository;

/// Number of messages kept and replayed by `getMessages`
pub const HISTORY_CAPACITY: usize = 100;
