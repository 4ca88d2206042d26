//! Message formatting for the terminal chat front-end.

use unihub_shared::{protocol::ChatMessage, time::display_time_of_day};

use crate::{
    chat::ConnectionView,
    store::{Notice, NoticeLevel, ThemeMode},
};

const RULE: &str = "------------------------------------------------------------";
const RESET: &str = "\x1b[0m";

struct Palette {
    sender: &'static str,
    me: &'static str,
    meta: &'static str,
    warning: &'static str,
    error: &'static str,
}

const LIGHT: Palette = Palette {
    sender: "\x1b[34m",
    me: "\x1b[32m",
    meta: "\x1b[90m",
    warning: "\x1b[33m",
    error: "\x1b[31m",
};

const DARK: Palette = Palette {
    sender: "\x1b[96m",
    me: "\x1b[92m",
    meta: "\x1b[37m",
    warning: "\x1b[93m",
    error: "\x1b[91m",
};

/// Message formatter for client display
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageFormatter {
    theme: ThemeMode,
}

impl MessageFormatter {
    pub fn new(theme: ThemeMode) -> Self {
        Self { theme }
    }

    pub fn theme(&self) -> ThemeMode {
        self.theme
    }

    fn palette(&self) -> &'static Palette {
        match self.theme {
            ThemeMode::Light => &LIGHT,
            ThemeMode::Dark => &DARK,
        }
    }

    fn paint(color: &str, text: &str) -> String {
        format!("{color}{text}{RESET}")
    }

    /// Format a chat message
    ///
    /// # Arguments
    ///
    /// * `message` - The message to render
    /// * `my_id` - The signed-in member's id, marked as "(me)"
    pub fn format_chat_message(&self, message: &ChatMessage, my_id: Option<&str>) -> String {
        let palette = self.palette();
        let (name, is_me) = match &message.member_data {
            Some(member) => (
                member.nickname.as_str(),
                my_id.is_some_and(|id| id == member.id),
            ),
            None => ("unknown", false),
        };
        let name = if is_me {
            Self::paint(palette.me, &format!("@{name} (me)"))
        } else {
            Self::paint(palette.sender, &format!("@{name}"))
        };
        let time = message
            .created_at
            .as_deref()
            .and_then(display_time_of_day)
            .map(|t| format!(" {}", Self::paint(palette.meta, &t)))
            .unwrap_or_default();
        format!("{name}{time}: {}\n", message.text)
    }

    /// Format a full history snapshot
    pub fn format_history(&self, messages: &[ChatMessage], my_id: Option<&str>) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n{RULE}\n"));
        if messages.is_empty() {
            output.push_str("(No messages yet)\n");
        } else {
            for message in messages {
                output.push_str(&self.format_chat_message(message, my_id));
            }
        }
        output.push_str(&format!("{RULE}\n"));
        output
    }

    pub fn format_presence(&self, online: usize) -> String {
        let label = if online == 1 { "member" } else { "members" };
        Self::paint(self.palette().meta, &format!("● {online} {label} online\n"))
    }

    /// Format the connection banner
    pub fn format_connection(&self, view: &ConnectionView) -> String {
        let palette = self.palette();
        match view {
            ConnectionView::Online => Self::paint(palette.me, "Connected\n"),
            ConnectionView::Connecting => Self::paint(palette.meta, "Connecting...\n"),
            ConnectionView::Offline => Self::paint(palette.meta, "Disconnected\n"),
            ConnectionView::Reconnecting {
                attempt,
                max_attempts,
                retry_in,
            } => Self::paint(
                palette.warning,
                &format!(
                    "Reconnecting in {:.1}s (attempt {attempt}/{max_attempts})\n",
                    retry_in.as_secs_f64()
                ),
            ),
            ConnectionView::Failed => Self::paint(
                palette.error,
                "Connection lost. Restart the client to try again.\n",
            ),
        }
    }

    pub fn format_notice(&self, notice: &Notice) -> String {
        let palette = self.palette();
        match notice.level {
            NoticeLevel::Info => Self::paint(palette.meta, &format!("ℹ {}\n", notice.message)),
            NoticeLevel::Warning => Self::paint(palette.warning, &format!("! {}\n", notice.message)),
            NoticeLevel::Error => Self::paint(palette.error, &format!("✗ {}\n", notice.message)),
        }
    }
}
