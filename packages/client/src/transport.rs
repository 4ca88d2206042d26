//! Realtime transport abstraction.
//!
//! A transport is split in two halves:
//!
//! - [`TransportLink`]: what the connection manager keeps. A cloneable
//!   [`TransportHandle`] (published to the store, used to send) plus the stream
//!   of [`TransportSignal`]s. Dropping the signal receiver detaches the listener;
//!   the socket keeps running until it is closed.
//! - [`TransportDriver`]: what the socket task (or a test) holds. It reports
//!   open/text/error/close and drains outbound frames.
//!
//! [`Connector::open`] is synchronous: it either rejects the URL outright
//! (construction failure) or hands back a link whose socket is still connecting.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU8, AtomicU64, Ordering},
    },
};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, handshake::client::Request, protocol::Message},
};
use unihub_shared::protocol::OutboundEvent;

use crate::error::TransportError;

/// Close code reported when the client closes the socket itself
pub const NORMAL_CLOSURE: u16 = 1000;

static NEXT_TRANSPORT_ID: AtomicU64 = AtomicU64::new(1);

/// Socket ready state, mirroring the browser `WebSocket.readyState` values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl ReadyState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Events reported by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    Opened,
    Text(String),
    Error(String),
    Closed { code: Option<u16>, reason: String },
}

/// Frames queued for the socket task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Close,
}

struct HandleInner {
    id: u64,
    url: String,
    state: AtomicU8,
    outbound: mpsc::UnboundedSender<OutboundFrame>,
}

/// Shared handle to one transport instance.
///
/// Equality is identity: two handles are equal when they refer to the same socket.
#[derive(Clone)]
pub struct TransportHandle {
    inner: Arc<HandleInner>,
}

impl TransportHandle {
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn ready_state(&self) -> ReadyState {
        ReadyState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.ready_state() == ReadyState::Open
    }

    /// Serialize and queue one frame.
    ///
    /// # Errors
    ///
    /// * [`TransportError::NotOpen`] unless the transport is open
    /// * [`TransportError::ChannelClosed`] if the socket task is gone
    pub fn send(&self, event: &OutboundEvent) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        let json = serde_json::to_string(event)?;
        self.inner
            .outbound
            .send(OutboundFrame::Text(json))
            .map_err(|_| TransportError::ChannelClosed)?;
        tracing::debug!(
            "Queued '{}' frame on transport #{}",
            event.name(),
            self.inner.id
        );
        Ok(())
    }

    /// Ask the socket to close. Repeated calls are no-ops.
    pub fn close(&self) {
        let previous = self.inner.state.fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
            match ReadyState::from_u8(s) {
                ReadyState::Connecting | ReadyState::Open => Some(ReadyState::Closing as u8),
                ReadyState::Closing | ReadyState::Closed => None,
            }
        });
        if previous.is_ok() {
            let _ = self.inner.outbound.send(OutboundFrame::Close);
        }
    }

    fn set_state(&self, state: ReadyState) {
        self.inner.state.store(state as u8, Ordering::Release);
    }
}

impl PartialEq for TransportHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for TransportHandle {}

impl fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportHandle")
            .field("id", &self.inner.id)
            .field("url", &self.inner.url)
            .field("state", &self.ready_state())
            .finish()
    }
}

/// Manager-side half of a transport
pub struct TransportLink {
    pub handle: TransportHandle,
    pub signals: mpsc::UnboundedReceiver<TransportSignal>,
}

/// Socket-side half of a transport
pub struct TransportDriver {
    handle: TransportHandle,
    outbound: mpsc::UnboundedReceiver<OutboundFrame>,
    signals: mpsc::UnboundedSender<TransportSignal>,
}

impl TransportDriver {
    pub fn handle(&self) -> &TransportHandle {
        &self.handle
    }

    /// Move `Connecting` to `Open` and report it.
    ///
    /// Returns `false` without signalling if `close()` got there first.
    pub fn opened(&self) -> bool {
        let opened = self
            .handle
            .inner
            .state
            .compare_exchange(
                ReadyState::Connecting as u8,
                ReadyState::Open as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if opened {
            self.emit(TransportSignal::Opened);
        }
        opened
    }

    pub fn text(&self, text: impl Into<String>) {
        self.emit(TransportSignal::Text(text.into()));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(TransportSignal::Error(message.into()));
    }

    pub fn closed(&self, code: Option<u16>, reason: impl Into<String>) {
        self.handle.set_state(ReadyState::Closed);
        self.emit(TransportSignal::Closed {
            code,
            reason: reason.into(),
        });
    }

    /// Wait for the next queued frame; `None` once every handle is dropped.
    pub async fn next_outbound(&mut self) -> Option<OutboundFrame> {
        self.outbound.recv().await
    }

    pub fn try_next_outbound(&mut self) -> Option<OutboundFrame> {
        self.outbound.try_recv().ok()
    }

    fn emit(&self, signal: TransportSignal) {
        // A closed receiver means the manager detached from this transport.
        if self.signals.send(signal).is_err() {
            tracing::trace!("Transport #{} has no listener", self.handle.id());
        }
    }
}

/// Create a connected link/driver pair in the `Connecting` state.
pub fn transport_channel(url: &str) -> (TransportLink, TransportDriver) {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (signals_tx, signals_rx) = mpsc::unbounded_channel();
    let handle = TransportHandle {
        inner: Arc::new(HandleInner {
            id: NEXT_TRANSPORT_ID.fetch_add(1, Ordering::Relaxed),
            url: url.to_string(),
            state: AtomicU8::new(ReadyState::Connecting as u8),
            outbound: outbound_tx,
        }),
    };
    (
        TransportLink {
            handle: handle.clone(),
            signals: signals_rx,
        },
        TransportDriver {
            handle,
            outbound: outbound_rx,
            signals: signals_tx,
        },
    )
}

/// Factory for transports
#[cfg_attr(test, mockall::automock)]
pub trait Connector: Send + Sync {
    /// Construct a transport to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures that happen before any network I/O;
    /// handshake failures surface later as `Error` + `Closed` signals.
    fn open(&self, url: &str) -> Result<TransportLink, TransportError>;
}

/// WebSocket connector backed by `tokio-tungstenite`.
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn open(&self, url: &str) -> Result<TransportLink, TransportError> {
        let invalid = |reason: String| TransportError::InvalidEndpoint {
            url: url.to_string(),
            reason,
        };
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(invalid("scheme must be ws or wss".to_string()));
        }
        let request = url.into_client_request().map_err(|e| invalid(e.to_string()))?;

        let (link, driver) = transport_channel(url);
        tokio::spawn(drive_websocket(request, driver));
        Ok(link)
    }
}

/// Run one WebSocket until it closes, relaying frames in both directions.
async fn drive_websocket(request: Request, mut driver: TransportDriver) {
    let id = driver.handle().id();
    let (ws_stream, _response) = match connect_async(request).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!("Transport #{} failed to connect: {}", id, e);
            driver.error(e.to_string());
            driver.closed(None, e.to_string());
            return;
        }
    };

    // close() may have been called while the handshake was in flight
    if !driver.opened() {
        let (mut write, _read) = ws_stream.split();
        let _ = write.send(Message::Close(None)).await;
        driver.closed(Some(NORMAL_CLOSURE), "closed by client");
        return;
    }
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            frame = driver.next_outbound() => match frame {
                Some(OutboundFrame::Text(text)) => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        tracing::warn!("Transport #{} write error: {}", id, e);
                        driver.error(e.to_string());
                        driver.closed(None, e.to_string());
                        break;
                    }
                }
                Some(OutboundFrame::Close) | None => {
                    let _ = write.send(Message::Close(None)).await;
                    let _ = write.close().await;
                    driver.closed(Some(NORMAL_CLOSURE), "closed by client");
                    break;
                }
            },
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => driver.text(text.as_str()),
                Some(Ok(Message::Binary(data))) => {
                    tracing::debug!("Transport #{} ignored {} bytes of binary data", id, data.len());
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (Some(u16::from(f.code)), f.reason.as_str().to_string()))
                        .unwrap_or((None, String::new()));
                    tracing::info!("Server closed transport #{} ({:?})", id, code);
                    driver.closed(code, reason);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!("Transport #{} read error: {}", id, e);
                    driver.error(e.to_string());
                    driver.closed(None, e.to_string());
                    break;
                }
                None => {
                    driver.closed(None, "stream ended");
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transport_starts_connecting() {
        // テスト項目: 生成直後のトランスポートは Connecting 状態
        // given (前提条件):
        let (link, _driver) = transport_channel("ws://localhost:3007");

        // when (操作):
        let state = link.handle.ready_state();

        // then (期待する結果):
        assert_eq!(state, ReadyState::Connecting);
        assert_eq!(link.handle.url(), "ws://localhost:3007");
    }

    #[test]
    fn test_send_requires_open_transport() {
        // テスト項目: Open でないトランスポートへの送信は NotOpen エラー
        // given (前提条件):
        let (link, mut driver) = transport_channel("ws://localhost:3007");

        // when (操作):
        let result = link.handle.send(&OutboundEvent::GetMessages);

        // then (期待する結果):
        assert!(matches!(result, Err(TransportError::NotOpen)));
        assert!(driver.try_next_outbound().is_none());
    }

    #[test]
    fn test_send_serializes_frame_when_open() {
        // テスト項目: Open 状態では JSON フレームがキューに積まれる
        // given (前提条件):
        let (link, mut driver) = transport_channel("ws://localhost:3007");
        driver.opened();

        // when (操作):
        link.handle.send(&OutboundEvent::GetMessages).unwrap();

        // then (期待する結果):
        assert_eq!(
            driver.try_next_outbound(),
            Some(OutboundFrame::Text(r#"{"event":"getMessages"}"#.to_string()))
        );
    }

    #[test]
    fn test_close_is_idempotent() {
        // テスト項目: close を複数回呼んでも Close フレームは1回だけ
        // given (前提条件):
        let (link, mut driver) = transport_channel("ws://localhost:3007");
        driver.opened();

        // when (操作):
        link.handle.close();
        link.handle.close();

        // then (期待する結果):
        assert_eq!(link.handle.ready_state(), ReadyState::Closing);
        assert_eq!(driver.try_next_outbound(), Some(OutboundFrame::Close));
        assert!(driver.try_next_outbound().is_none());
    }

    #[test]
    fn test_close_during_handshake_is_not_undone_by_open() {
        // テスト項目: ハンドシェイク中に close された場合、opened で Open に戻らない
        // given (前提条件):
        let (mut link, mut driver) = transport_channel("ws://localhost:3007");
        link.handle.close();

        // when (操作):
        let opened = driver.opened();

        // then (期待する結果):
        assert!(!opened);
        assert_eq!(link.handle.ready_state(), ReadyState::Closing);
        assert!(link.signals.try_recv().is_err());
        assert_eq!(driver.try_next_outbound(), Some(OutboundFrame::Close));
    }

    #[test]
    fn test_open_from_connecting_signals_once() {
        // テスト項目: Connecting からの opened は1回だけ Opened を通知する
        // given (前提条件):
        let (mut link, driver) = transport_channel("ws://localhost:3007");

        // when (操作):
        let first = driver.opened();
        let second = driver.opened();

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert_eq!(link.handle.ready_state(), ReadyState::Open);
        assert_eq!(link.signals.try_recv().ok(), Some(TransportSignal::Opened));
        assert!(link.signals.try_recv().is_err());
    }

    #[test]
    fn test_signals_after_detach_are_dropped_silently() {
        // テスト項目: リスナー切り離し後のシグナルはパニックせず破棄される
        // given (前提条件):
        let (link, driver) = transport_channel("ws://localhost:3007");
        let handle = link.handle.clone();
        drop(link);

        // when (操作):
        driver.closed(Some(1006), "gone");

        // then (期待する結果):
        assert_eq!(handle.ready_state(), ReadyState::Closed);
    }

    #[test]
    fn test_handles_compare_by_identity() {
        // テスト項目: ハンドルの等価性は同一トランスポートかどうかで決まる
        // given (前提条件):
        let (first, _d1) = transport_channel("ws://localhost:3007");
        let (second, _d2) = transport_channel("ws://localhost:3007");

        // when (操作) / then (期待する結果):
        assert_eq!(first.handle, first.handle.clone());
        assert_ne!(first.handle, second.handle);
    }

    #[test]
    fn test_ws_connector_rejects_non_websocket_scheme() {
        // テスト項目: ws/wss 以外のスキームは構築時に拒否される
        // given (前提条件):
        let connector = WsConnector;

        // when (操作):
        let result = connector.open("http://localhost:3007");

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(TransportError::InvalidEndpoint { .. })
        ));
    }
}
