//! Chat panel state.
//!
//! The panel is a consumer of the connection manager: it subscribes to the
//! event broadcast and the status watch, keeps the message list, presence count
//! and draft, and guards sends. It never opens or recreates the transport; the
//! reconnect display is read from [`ConnectionStatus`].

use std::time::Duration;

use thiserror::Error;
use tokio::{
    sync::{broadcast, broadcast::error::RecvError, watch},
    time::{Instant, sleep_until},
};
use unihub_shared::protocol::{ChatMessage, InboundEvent, MemberData, OutboundEvent};

use crate::{
    domain::MAX_RECONNECT_ATTEMPTS,
    manager::{ConnectionEvent, ConnectionManager, ConnectionPhase, ConnectionStatus},
    store::{AppContext, NoticeLevel},
    transport::TransportHandle,
};

/// How long a send waits for the endpoint to echo the message back
pub const SEND_ACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a send was refused. Each rejection is also posted as a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendRejection {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("Please sign in to chat")]
    NotAuthenticated,

    #[error("Chat is not connected yet. Please wait a moment.")]
    NotConnected,

    #[error("Your previous message is still being sent")]
    SendInFlight,
}

/// Connection state as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionView {
    Offline,
    Connecting,
    Online,
    Reconnecting {
        attempt: u32,
        max_attempts: u32,
        retry_in: Duration,
    },
    Failed,
}

impl ConnectionView {
    pub fn from_status(status: &ConnectionStatus) -> Self {
        if let Some(retry_in) = status.retry_in {
            return Self::Reconnecting {
                attempt: status.attempt,
                max_attempts: MAX_RECONNECT_ATTEMPTS,
                retry_in,
            };
        }
        match status.phase {
            ConnectionPhase::Open => Self::Online,
            ConnectionPhase::Connecting => Self::Connecting,
            ConnectionPhase::Failed => Self::Failed,
            ConnectionPhase::Idle | ConnectionPhase::Closing | ConnectionPhase::Closed => {
                Self::Offline
            }
        }
    }
}

/// Something the panel's renderer should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelUpdate {
    History(Vec<ChatMessage>),
    Message(ChatMessage),
    Presence { online: usize },
    Connection(ConnectionView),
    SendTimedOut,
}

pub struct ChatPanel {
    ctx: AppContext,
    events: Option<broadcast::Receiver<ConnectionEvent>>,
    status: watch::Receiver<ConnectionStatus>,
    messages: Vec<ChatMessage>,
    online_count: usize,
    connected: bool,
    draft: String,
    pending_until: Option<Instant>,
}

impl ChatPanel {
    /// Mount the panel on a running manager.
    pub fn mount(ctx: AppContext, manager: &ConnectionManager) -> Self {
        Self::new(ctx, manager.subscribe(), manager.watch_status())
    }

    pub fn new(
        ctx: AppContext,
        events: broadcast::Receiver<ConnectionEvent>,
        status: watch::Receiver<ConnectionStatus>,
    ) -> Self {
        ctx.chat_open.set(true);
        let panel = Self {
            ctx,
            events: Some(events),
            status,
            messages: Vec::new(),
            online_count: 0,
            connected: false,
            draft: String::new(),
            pending_until: None,
        };
        panel.request_history();
        panel
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn online_count(&self) -> usize {
        self.online_count
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_pending(&self) -> bool {
        self.pending_until.is_some()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn reconnect_banner(&self) -> ConnectionView {
        ConnectionView::from_status(&self.status.borrow())
    }

    /// Send the current draft.
    pub fn submit(&mut self) -> Result<(), SendRejection> {
        let text = self.draft.clone();
        self.send_message(&text)
    }

    /// Validate and send one chat message.
    ///
    /// Guards run in order: empty text, no signed-in user, transport not open,
    /// send already pending. A rejected send writes nothing and leaves the
    /// pending flag as it was.
    pub fn send_message(&mut self, text: &str) -> Result<(), SendRejection> {
        let result = self.try_send(text.trim());
        if let Err(rejection) = result {
            tracing::debug!("Chat send rejected: {:?}", rejection);
            self.ctx.notify(NoticeLevel::Warning, rejection.to_string());
        }
        result
    }

    fn try_send(&mut self, text: &str) -> Result<(), SendRejection> {
        if text.is_empty() {
            return Err(SendRejection::EmptyMessage);
        }
        let profile = self
            .ctx
            .current_user
            .get()
            .ok_or(SendRejection::NotAuthenticated)?;
        let handle = self
            .open_transport()
            .ok_or(SendRejection::NotConnected)?;
        if self.is_pending() {
            return Err(SendRejection::SendInFlight);
        }

        let event = OutboundEvent::Message {
            text: text.to_string(),
            member_data: MemberData::from(&profile),
        };
        handle.send(&event).map_err(|e| {
            tracing::warn!("Failed to send chat message: {}", e);
            SendRejection::NotConnected
        })?;

        self.draft.clear();
        self.pending_until = Some(Instant::now() + SEND_ACK_TIMEOUT);
        Ok(())
    }

    /// Clear an overdue pending send and post the failure notice.
    ///
    /// Returns `true` if a pending send expired on this call.
    pub fn expire_pending(&mut self) -> bool {
        match self.pending_until {
            Some(deadline) if Instant::now() >= deadline => {
                self.pending_until = None;
                tracing::warn!("No acknowledgement for chat message within {:?}", SEND_ACK_TIMEOUT);
                self.ctx.notify(
                    NoticeLevel::Error,
                    "Your message may not have been delivered. Please try again.",
                );
                true
            }
            _ => false,
        }
    }

    /// Apply one connection event to the panel state.
    pub fn handle_event(&mut self, event: ConnectionEvent) -> Option<PanelUpdate> {
        match event {
            ConnectionEvent::Opened { .. } => {
                self.request_history();
                None
            }
            ConnectionEvent::Inbound(InboundEvent::GetMessages { list }) => {
                self.messages = list.clone();
                Some(PanelUpdate::History(list))
            }
            ConnectionEvent::Inbound(InboundEvent::Message(message)) => {
                self.messages.push(message.clone());
                self.pending_until = None;
                Some(PanelUpdate::Message(message))
            }
            ConnectionEvent::Inbound(InboundEvent::Info { total_clients, .. }) => {
                self.online_count = total_clients;
                self.connected = true;
                Some(PanelUpdate::Presence {
                    online: total_clients,
                })
            }
            ConnectionEvent::Closed { .. } | ConnectionEvent::Failed { .. } => {
                self.connected = false;
                None
            }
            ConnectionEvent::Error { .. } => None,
        }
    }

    /// Wait for the next change worth rendering.
    ///
    /// Returns `None` once the panel is closed or the manager has stopped.
    pub async fn next_update(&mut self) -> Option<PanelUpdate> {
        loop {
            self.events.as_ref()?;
            tokio::select! {
                event = next_event(&mut self.events) => match event {
                    Ok(event) => {
                        if let Some(update) = self.handle_event(event) {
                            return Some(update);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Chat panel skipped {} connection events", skipped);
                        self.request_history();
                    }
                    Err(RecvError::Closed) => {
                        self.events = None;
                        return None;
                    }
                },
                changed = self.status.changed() => {
                    changed.ok()?;
                    return Some(PanelUpdate::Connection(self.reconnect_banner()));
                }
                () = pending_deadline(self.pending_until) => {
                    if self.expire_pending() {
                        return Some(PanelUpdate::SendTimedOut);
                    }
                }
            }
        }
    }

    /// Unmount: chat-open := false and stop listening.
    pub fn close(&mut self) {
        self.events = None;
        self.ctx.chat_open.set(false);
    }

    /// Ask the endpoint for history if the transport is open.
    pub fn request_history(&self) {
        let Some(handle) = self.open_transport() else {
            return;
        };
        if let Err(e) = handle.send(&OutboundEvent::GetMessages) {
            tracing::warn!("Failed to request chat history: {}", e);
        }
    }

    fn open_transport(&self) -> Option<TransportHandle> {
        self.ctx.socket.get().filter(TransportHandle::is_open)
    }
}

impl Drop for ChatPanel {
    fn drop(&mut self) {
        if self.events.is_some() {
            self.close();
        }
    }
}

async fn next_event(
    events: &mut Option<broadcast::Receiver<ConnectionEvent>>,
) -> Result<ConnectionEvent, RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn pending_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
