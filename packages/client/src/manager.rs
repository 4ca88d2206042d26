//! Realtime connection manager.
//!
//! Owns the application's single transport. All connection state lives in one
//! background task; the public [`ConnectionManager`] handle only sends commands
//! to it, so socket signals, timers and commands are handled one at a time.
//!
//! Consumers never attach handlers to the transport. They call
//! [`ConnectionManager::subscribe`] and every subscriber receives every
//! [`ConnectionEvent`].
//!
//! ```text
//! Idle ─connect─▶ Connecting ─open─▶ Open ─close─▶ Closed ─backoff─▶ Connecting
//!                                                    │
//!                                                    └─ attempts exhausted ─▶ Failed
//! ```

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{broadcast, mpsc, oneshot, watch},
    task::JoinHandle,
    time::{Instant, sleep_until},
};
use unihub_shared::{
    protocol::{InboundEvent, OutboundEvent, ProtocolError, parse_inbound},
    time::Clock,
};

use crate::{
    domain::{
        CONSTRUCTION_RETRY_DELAY, MAX_RECONNECT_ATTEMPTS, backoff_delay, should_attempt_reconnect,
    },
    endpoint::EndpointResolver,
    error::TransportError,
    store::{AppContext, NoticeLevel},
    transport::{Connector, TransportHandle, TransportLink, TransportSignal},
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
    /// Reconnect attempts exhausted; only a new `connect` or a network-online
    /// transition leaves this state
    Failed,
}

/// Snapshot of the manager's connection state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub phase: ConnectionPhase,
    /// Consecutive reconnect attempts since the last successful open
    pub attempt: u32,
    /// False after an `error` signal until the next open
    pub healthy: bool,
    /// Delay of the currently scheduled reconnect
    pub retry_in: Option<Duration>,
    /// The last close was requested by `teardown`
    pub torn_down: bool,
}

impl ConnectionStatus {
    fn idle() -> Self {
        Self {
            phase: ConnectionPhase::Idle,
            attempt: 0,
            healthy: true,
            retry_in: None,
            torn_down: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.phase == ConnectionPhase::Open
    }

    pub fn is_reconnecting(&self) -> bool {
        self.retry_in.is_some()
    }
}

/// Events re-broadcast to every subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Opened { transport_id: u64 },
    Inbound(InboundEvent),
    Error { message: String },
    Closed { code: Option<u16>, reason: String },
    Failed { attempts: u32 },
}

enum Command {
    Connect(oneshot::Sender<()>),
    Teardown(oneshot::Sender<()>),
    NetworkOnline(bool, oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Handle to the connection manager task.
///
/// Cheap to clone. The task stops when [`ConnectionManager::shutdown`] is
/// called or every handle is dropped; either way the transport is torn down.
#[derive(Clone)]
pub struct ConnectionManager {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<ConnectionEvent>,
    status: watch::Receiver<ConnectionStatus>,
    ctx: AppContext,
}

impl ConnectionManager {
    /// Spawn the manager task in the `Idle` state.
    pub fn spawn(
        ctx: AppContext,
        connector: Arc<dyn Connector>,
        resolver: EndpointResolver,
        clock: Arc<dyn Clock>,
    ) -> (Self, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, _events_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::idle());

        let actor = ManagerActor {
            ctx: ctx.clone(),
            connector,
            resolver,
            clock,
            commands: commands_rx,
            events: events_tx.clone(),
            status: status_tx,
            current: None,
            signals: None,
            retry_at: None,
            attempt: 0,
            online: true,
        };
        let task = tokio::spawn(actor.run());

        (
            Self {
                commands: commands_tx,
                events: events_tx,
                status: status_rx,
                ctx,
            },
            task,
        )
    }

    /// Open a transport unless one is already open.
    pub async fn connect(&self) {
        self.request(Command::Connect).await;
    }

    /// Detach, close, and cancel any scheduled reconnect. Safe to repeat.
    pub async fn teardown(&self) {
        self.request(Command::Teardown).await;
    }

    /// Report network reachability. An offline→online transition resets the
    /// attempt counter and connects immediately.
    pub async fn set_network_online(&self, online: bool) {
        self.request(|ack| Command::NetworkOnline(online, ack)).await;
    }

    /// Tear down and stop the manager task.
    pub async fn shutdown(&self) {
        self.request(Command::Shutdown).await;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Write one frame to the published transport.
    ///
    /// # Errors
    ///
    /// * [`TransportError::NotOpen`] if no transport is published or it is not open
    pub fn send(&self, event: &OutboundEvent) -> Result<(), TransportError> {
        match self.ctx.socket.get() {
            Some(handle) => handle.send(event),
            None => Err(TransportError::NotOpen),
        }
    }

    async fn request(&self, make: impl FnOnce(oneshot::Sender<()>) -> Command) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.commands.send(make(ack_tx)).is_err() {
            tracing::debug!("Connection manager is not running");
            return;
        }
        let _ = ack_rx.await;
    }
}

struct ManagerActor {
    ctx: AppContext,
    connector: Arc<dyn Connector>,
    resolver: EndpointResolver,
    clock: Arc<dyn Clock>,
    commands: mpsc::UnboundedReceiver<Command>,
    events: broadcast::Sender<ConnectionEvent>,
    status: watch::Sender<ConnectionStatus>,
    current: Option<TransportHandle>,
    /// Listener on `current`; `None` once detached
    signals: Option<mpsc::UnboundedReceiver<TransportSignal>>,
    retry_at: Option<Instant>,
    attempt: u32,
    online: bool,
}

impl ManagerActor {
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Connect(ack)) => {
                        self.connect();
                        let _ = ack.send(());
                    }
                    Some(Command::Teardown(ack)) => {
                        self.teardown();
                        let _ = ack.send(());
                    }
                    Some(Command::NetworkOnline(online, ack)) => {
                        self.set_network_online(online);
                        let _ = ack.send(());
                    }
                    Some(Command::Shutdown(ack)) => {
                        self.teardown();
                        let _ = ack.send(());
                        break;
                    }
                    None => {
                        self.teardown();
                        break;
                    }
                },
                signal = next_signal(&mut self.signals) => self.handle_signal(signal),
                () = retry_timer(self.retry_at) => {
                    self.retry_at = None;
                    tracing::info!(
                        "Reconnecting to realtime endpoint (attempt {}/{})",
                        self.attempt,
                        MAX_RECONNECT_ATTEMPTS
                    );
                    self.connect();
                }
            }
        }
        tracing::debug!("Connection manager stopped");
    }

    fn connect(&mut self) {
        if self.current.as_ref().is_some_and(TransportHandle::is_open) {
            tracing::debug!("Realtime transport already open; connect ignored");
            return;
        }
        let Some(url) = self.resolver.resolve() else {
            tracing::debug!("No page context; realtime connection disabled");
            return;
        };

        self.retry_at = None;
        self.detach_and_close();
        self.publish(|s| {
            s.phase = ConnectionPhase::Connecting;
            s.retry_in = None;
            s.torn_down = false;
        });

        match self.connector.open(&url) {
            Ok(TransportLink { handle, signals }) => {
                tracing::info!("Connecting realtime transport #{}", handle.id());
                // Published while still connecting; the old handle is already closing.
                self.ctx.socket.set(Some(handle.clone()));
                self.current = Some(handle);
                self.signals = Some(signals);
            }
            Err(e) => {
                tracing::warn!("Failed to create realtime transport: {}", e);
                self.publish(|s| s.phase = ConnectionPhase::Closed);
                self.schedule_retry(CONSTRUCTION_RETRY_DELAY);
            }
        }
    }

    fn teardown(&mut self) {
        self.retry_at = None;
        // Detach before closing so the dying socket cannot reach us.
        self.signals = None;
        if let Some(handle) = self.current.take() {
            self.publish(|s| s.phase = ConnectionPhase::Closing);
            handle.close();
            tracing::info!("Realtime transport #{} torn down", handle.id());
        }
        if self.ctx.socket.get().is_some() {
            self.ctx.socket.set(None);
        }
        self.publish(|s| {
            if s.phase != ConnectionPhase::Idle {
                s.phase = ConnectionPhase::Closed;
            }
            s.retry_in = None;
            s.torn_down = true;
        });
    }

    fn set_network_online(&mut self, online: bool) {
        let was_online = std::mem::replace(&mut self.online, online);
        if !online {
            if was_online {
                tracing::info!("Network offline");
            }
            return;
        }
        if was_online {
            return;
        }
        if self.status.borrow().torn_down {
            tracing::debug!("Network online while torn down; staying closed");
            return;
        }

        tracing::info!("Network back online; reconnecting immediately");
        self.attempt = 0;
        self.retry_at = None;
        self.publish(|s| {
            s.attempt = 0;
            s.retry_in = None;
        });
        self.connect();
    }

    fn handle_signal(&mut self, signal: Option<TransportSignal>) {
        let signal = signal.unwrap_or_else(|| TransportSignal::Closed {
            code: None,
            reason: "transport dropped".to_string(),
        });
        match signal {
            TransportSignal::Opened => self.on_open(),
            TransportSignal::Text(text) => self.on_message(&text),
            TransportSignal::Error(message) => self.on_error(message),
            TransportSignal::Closed { code, reason } => self.on_close(code, reason),
        }
    }

    fn on_open(&mut self) {
        let Some(handle) = self.current.clone() else {
            return;
        };
        self.attempt = 0;
        let handshake = OutboundEvent::Connect {
            timestamp: self.clock.now_iso8601(),
        };
        if let Err(e) = handle.send(&handshake) {
            tracing::warn!("Failed to send handshake: {}", e);
        }
        tracing::info!("Realtime transport #{} connected", handle.id());

        self.publish(|s| {
            s.phase = ConnectionPhase::Open;
            s.attempt = 0;
            s.healthy = true;
            s.retry_in = None;
        });
        self.broadcast(ConnectionEvent::Opened {
            transport_id: handle.id(),
        });
    }

    fn on_message(&mut self, text: &str) {
        match parse_inbound(text) {
            Ok(event) => {
                tracing::debug!("Received '{}' event", event.name());
                self.broadcast(ConnectionEvent::Inbound(event));
            }
            Err(ProtocolError::UnknownEvent(name)) => {
                tracing::info!("Ignoring unknown realtime event '{}'", name);
            }
            Err(e) => {
                tracing::warn!("Discarding realtime frame: {}", e);
            }
        }
    }

    fn on_error(&mut self, message: String) {
        tracing::warn!("Realtime transport error: {}", message);
        self.publish(|s| s.healthy = false);
        self.broadcast(ConnectionEvent::Error { message });
    }

    fn on_close(&mut self, code: Option<u16>, reason: String) {
        self.signals = None;
        tracing::warn!(
            "Realtime transport closed (code {:?}, reason '{}')",
            code,
            reason
        );
        self.publish(|s| s.phase = ConnectionPhase::Closed);
        self.broadcast(ConnectionEvent::Closed { code, reason });
        self.schedule_retry(backoff_delay(self.attempt));
    }

    fn schedule_retry(&mut self, delay: Duration) {
        if !should_attempt_reconnect(self.attempt, MAX_RECONNECT_ATTEMPTS) {
            self.retry_at = None;
            tracing::error!(
                "Giving up on realtime connection after {} attempts",
                self.attempt
            );
            let attempts = self.attempt;
            self.publish(|s| {
                s.phase = ConnectionPhase::Failed;
                s.retry_in = None;
            });
            self.broadcast(ConnectionEvent::Failed { attempts });
            self.ctx.notify(
                NoticeLevel::Error,
                "Chat connection lost: maximum reconnect attempts reached. Please reload.",
            );
            return;
        }

        self.attempt += 1;
        self.retry_at = Some(Instant::now() + delay);
        tracing::info!(
            "Reconnecting in {:?} (attempt {}/{})",
            delay,
            self.attempt,
            MAX_RECONNECT_ATTEMPTS
        );
        let attempt = self.attempt;
        self.publish(|s| {
            s.attempt = attempt;
            s.retry_in = Some(delay);
        });
    }

    fn detach_and_close(&mut self) {
        self.signals = None;
        if let Some(handle) = self.current.take() {
            handle.close();
        }
    }

    /// Apply `edit` and notify watchers only if something changed.
    fn publish(&self, edit: impl FnOnce(&mut ConnectionStatus)) {
        self.status.send_if_modified(|status| {
            let before = status.clone();
            edit(status);
            *status != before
        });
    }

    fn broadcast(&self, event: ConnectionEvent) {
        // No subscribers is normal before any UI mounts.
        let _ = self.events.send(event);
    }
}

async fn next_signal(
    signals: &mut Option<mpsc::UnboundedReceiver<TransportSignal>>,
) -> Option<TransportSignal> {
    match signals {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn retry_timer(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
