//! Shared reactive store.
//!
//! An explicit application context holding typed observable cells. Components
//! receive an [`AppContext`] at construction instead of reaching for globals.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use unihub_shared::protocol::MemberData;

use crate::transport::TransportHandle;

const NOTICE_CHANNEL_CAPACITY: usize = 64;

/// A single named value that notifies subscribers on change.
///
/// `set` replaces the value atomically; readers never see a partial value, and
/// every live subscriber is marked changed before `set` returns.
pub struct ReactiveCell<T> {
    tx: Arc<watch::Sender<T>>,
}

impl<T> Clone for ReactiveCell<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T: Clone> ReactiveCell<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Replace the value and return the previous one.
    pub fn set(&self, value: T) -> T {
        self.tx.send_replace(value)
    }

    /// Edit the value in place under the cell's lock.
    pub fn update(&self, edit: impl FnOnce(&mut T)) {
        self.tx.send_modify(edit);
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone + std::fmt::Debug> std::fmt::Debug for ReactiveCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ReactiveCell").field(&*self.tx.borrow()).finish()
    }
}

/// Profile of the signed-in member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberProfile {
    pub id: String,
    pub nickname: String,
    pub full_name: Option<String>,
    pub avatar_path: Option<String>,
}

impl From<&MemberProfile> for MemberData {
    fn from(profile: &MemberProfile) -> Self {
        MemberData {
            id: profile.id.clone(),
            nickname: profile.nickname.clone(),
            avatar_path: profile.avatar_path.clone(),
            full_name: profile.full_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Theme {
    pub mode: ThemeMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-visible, non-blocking notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Application-scoped context passed to every component
#[derive(Clone)]
pub struct AppContext {
    pub current_user: ReactiveCell<Option<MemberProfile>>,
    /// Written only by the connection manager
    pub socket: ReactiveCell<Option<TransportHandle>>,
    pub chat_open: ReactiveCell<bool>,
    pub theme: ReactiveCell<Theme>,
    notices: broadcast::Sender<Notice>,
}

impl AppContext {
    pub fn new() -> Self {
        let (notices, _rx) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        Self {
            current_user: ReactiveCell::new(None),
            socket: ReactiveCell::new(None),
            chat_open: ReactiveCell::new(false),
            theme: ReactiveCell::new(Theme::default()),
            notices,
        }
    }

    /// Post a notice to every current notice subscriber.
    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        let notice = Notice {
            level,
            message: message.into(),
        };
        match level {
            NoticeLevel::Error => tracing::warn!("notice: {}", notice.message),
            _ => tracing::debug!("notice: {}", notice.message),
        }
        // Nobody listening is fine; notices are fire-and-forget.
        let _ = self.notices.send(notice);
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::transport_channel;

    #[test]
    fn test_cell_get_returns_latest_value() {
        // テスト項目: set した値が get で取得できる
        // given (前提条件):
        let cell = ReactiveCell::new(false);

        // when (操作):
        let previous = cell.set(true);

        // then (期待する結果):
        assert!(!previous);
        assert!(cell.get());
    }

    #[test]
    fn test_cell_set_notifies_subscribers_before_returning() {
        // テスト項目: set が戻る時点で全ての購読者に変更が通知されている
        // given (前提条件):
        let cell = ReactiveCell::new(Theme::default());
        let first = cell.subscribe();
        let second = cell.subscribe();

        // when (操作):
        cell.set(Theme {
            mode: ThemeMode::Dark,
        });

        // then (期待する結果):
        assert!(first.has_changed().unwrap());
        assert!(second.has_changed().unwrap());
        assert_eq!(first.borrow().mode, ThemeMode::Dark);
    }

    #[test]
    fn test_cell_clones_share_one_value() {
        // テスト項目: クローンしたセルは同じ値を共有する
        // given (前提条件):
        let cell = ReactiveCell::new(None::<MemberProfile>);
        let clone = cell.clone();

        // when (操作):
        clone.update(|value| {
            *value = Some(MemberProfile {
                id: "m-1".to_string(),
                nickname: "alice".to_string(),
                full_name: None,
                avatar_path: None,
            })
        });

        // then (期待する結果):
        assert_eq!(cell.get().unwrap().nickname, "alice");
    }

    #[test]
    fn test_replacing_socket_does_not_close_previous_handle() {
        // テスト項目: ソケットセルの上書きは以前のトランスポートを閉じない
        // given (前提条件):
        let ctx = AppContext::new();
        let (old, mut old_driver) = transport_channel("ws://localhost:3007");
        let (new, _new_driver) = transport_channel("ws://localhost:3007");
        old_driver.opened();
        ctx.socket.set(Some(old.handle.clone()));

        // when (操作):
        ctx.socket.set(Some(new.handle.clone()));

        // then (期待する結果):
        assert!(old.handle.is_open());
        assert!(old_driver.try_next_outbound().is_none());
        assert_eq!(ctx.socket.get(), Some(new.handle));
    }

    #[test]
    fn test_notices_reach_every_subscriber() {
        // テスト項目: 通知は全ての購読者に届く
        // given (前提条件):
        let ctx = AppContext::new();
        let mut first = ctx.subscribe_notices();
        let mut second = ctx.subscribe_notices();

        // when (操作):
        ctx.notify(NoticeLevel::Warning, "Please sign in to chat");

        // then (期待する結果):
        assert_eq!(first.try_recv().unwrap().message, "Please sign in to chat");
        assert_eq!(second.try_recv().unwrap().level, NoticeLevel::Warning);
    }

    #[test]
    fn test_profile_converts_to_wire_member_data() {
        // テスト項目: プロフィールが送信用の memberData に変換される
        // given (前提条件):
        let profile = MemberProfile {
            id: "m-2".to_string(),
            nickname: "bob".to_string(),
            full_name: Some("Bob Kim".to_string()),
            avatar_path: None,
        };

        // when (操作):
        let data = MemberData::from(&profile);

        // then (期待する結果):
        assert_eq!(data.id, "m-2");
        assert_eq!(data.full_name.as_deref(), Some("Bob Kim"));
    }
}
