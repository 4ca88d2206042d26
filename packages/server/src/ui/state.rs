//! Shared application state.

use std::sync::Arc;

use unihub_shared::time::Clock;

use crate::{
    domain::{MessagePusher, MessageRepository},
    infrastructure::{InMemoryMessageRepository, WebSocketMessagePusher},
    usecase::{
        ConnectParticipantUseCase, DisconnectParticipantUseCase, GetMessagesUseCase,
        SendMessageUseCase,
    },
};

pub struct AppState {
    pub connect_participant_usecase: ConnectParticipantUseCase,
    pub disconnect_participant_usecase: DisconnectParticipantUseCase,
    pub send_message_usecase: SendMessageUseCase,
    pub get_messages_usecase: GetMessagesUseCase,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn MessageRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            connect_participant_usecase: ConnectParticipantUseCase::new(Arc::clone(
                &message_pusher,
            )),
            disconnect_participant_usecase: DisconnectParticipantUseCase::new(Arc::clone(
                &message_pusher,
            )),
            send_message_usecase: SendMessageUseCase::new(
                Arc::clone(&repository),
                Arc::clone(&message_pusher),
                clock,
            ),
            get_messages_usecase: GetMessagesUseCase::new(repository, message_pusher),
        }
    }

    /// State backed by the in-memory repository and WebSocket pusher
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self::new(
            Arc::new(InMemoryMessageRepository::new()),
            Arc::new(WebSocketMessagePusher::new()),
            clock,
        )
    }
}
