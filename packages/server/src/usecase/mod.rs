//! UseCase 層: チャットエンドポイントの振る舞い
//!
//! 各ユースケースは `MessagePusher` / `MessageRepository` の trait にのみ依存する。

mod connect_participant;
mod disconnect_participant;
mod error;
mod get_messages;
mod send_message;

pub use connect_participant::ConnectParticipantUseCase;
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::{ConnectError, GetMessagesError, SendMessageError};
pub use get_messages::GetMessagesUseCase;
pub use send_message::SendMessageUseCase;

use unihub_shared::protocol::InboundEvent;

/// Presence actions carried by `info` events
pub const ACTION_JOINED: &str = "joined";
pub const ACTION_LEFT: &str = "left";

fn encode(event: &InboundEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

fn presence(total_clients: usize, action: Option<&str>) -> InboundEvent {
    InboundEvent::Info {
        total_clients,
        action: action.map(str::to_string),
        member_data: None,
    }
}
