//! In-memory implementations of the domain seams.

mod message_pusher;
mod repository;

pub use message_pusher::WebSocketMessagePusher;
pub use repository::InMemoryMessageRepository;
