//! Terminal chat loop.
//!
//! Input lines are read on a blocking rustyline thread and forwarded over a
//! channel; the async loop multiplexes them with panel updates and notices.

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::{broadcast::error::RecvError, mpsc};

use crate::{
    app::App,
    chat::PanelUpdate,
    formatter::MessageFormatter,
    store::{AppContext, NoticeLevel, ThemeMode},
    ui::{prompt, redisplay_prompt},
};

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    Online,
    Offline,
    History,
    Logout,
    Theme(ThemeMode),
    Quit,
    Say(String),
    Unknown(String),
}

impl InputCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(command) = line.strip_prefix('/') else {
            return Self::Say(line.to_string());
        };
        let mut parts = command.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("online"), None) => Self::Online,
            (Some("offline"), None) => Self::Offline,
            (Some("history"), None) => Self::History,
            (Some("logout"), None) => Self::Logout,
            (Some("quit" | "exit"), None) => Self::Quit,
            (Some("theme"), Some("light")) => Self::Theme(ThemeMode::Light),
            (Some("theme"), Some("dark")) => Self::Theme(ThemeMode::Dark),
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// Run the interactive chat until `/quit`, Ctrl+C or Ctrl+D.
pub async fn run_client(app: App) {
    let ctx = app.context().clone();
    let mut panel = app.mount_chat();
    let mut notices = ctx.subscribe_notices();

    let nickname = ctx.current_user.get().map(|p| p.nickname);
    println!(
        "\nYou are '{}'. Type messages and press Enter to send. /quit to exit.\n\
         Commands: /online /offline /history /logout /theme light|dark\n",
        nickname.as_deref().unwrap_or("guest")
    );

    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
    spawn_readline(prompt(nickname.as_deref()), input_tx);

    loop {
        tokio::select! {
            line = input_rx.recv() => {
                let Some(line) = line else {
                    break;
                };
                match InputCommand::parse(&line) {
                    InputCommand::Quit => break,
                    InputCommand::Online => app.manager().set_network_online(true).await,
                    InputCommand::Offline => app.manager().set_network_online(false).await,
                    InputCommand::History => panel.request_history(),
                    InputCommand::Logout => {
                        if let Err(e) = app.logout().await {
                            ctx.notify(NoticeLevel::Error, e.to_string());
                        }
                    }
                    InputCommand::Theme(mode) => apply_theme(&ctx, mode),
                    InputCommand::Say(text) => {
                        // rejections arrive as notices
                        let _ = panel.send_message(&text);
                    }
                    InputCommand::Unknown(command) => {
                        ctx.notify(NoticeLevel::Warning, format!("Unknown command '{command}'"));
                    }
                }
            }
            update = panel.next_update() => match update {
                Some(update) => render_update(&ctx, &update),
                None => break,
            },
            notice = notices.recv() => match notice {
                Ok(notice) => {
                    print!("\n{}", formatter(&ctx).format_notice(&notice));
                    redisplay_prompt(current_nickname(&ctx).as_deref());
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Skipped {} notices", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    panel.close();
    app.shutdown().await;
}

fn render_update(ctx: &AppContext, update: &PanelUpdate) {
    let formatter = formatter(ctx);
    let my_id = ctx.current_user.get().map(|p| p.id);
    let output = match update {
        PanelUpdate::History(messages) => formatter.format_history(messages, my_id.as_deref()),
        PanelUpdate::Message(message) => formatter.format_chat_message(message, my_id.as_deref()),
        PanelUpdate::Presence { online } => formatter.format_presence(*online),
        PanelUpdate::Connection(view) => formatter.format_connection(view),
        // the timeout notice is rendered from the notice stream
        PanelUpdate::SendTimedOut => return,
    };
    print!("\n{output}");
    redisplay_prompt(current_nickname(ctx).as_deref());
}

fn apply_theme(ctx: &AppContext, mode: ThemeMode) {
    ctx.theme.update(|theme| theme.mode = mode);
    tracing::debug!("Theme switched to {:?}", mode);
}

fn formatter(ctx: &AppContext) -> MessageFormatter {
    MessageFormatter::new(ctx.theme.get().mode)
}

fn current_nickname(ctx: &AppContext) -> Option<String> {
    ctx.current_user.get().map(|p| p.nickname)
}

/// Spawn a blocking thread for rustyline (synchronous readline)
fn spawn_readline(prompt: String, input_tx: mpsc::UnboundedSender<String>) {
    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                tracing::error!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line).ok();
                    if input_tx.send(line.to_string()).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_line_is_a_chat_message() {
        // テスト項目: スラッシュで始まらない行はチャットメッセージになる
        // given (前提条件):
        let line = "  see you at the library  ";

        // when (操作):
        let command = InputCommand::parse(line);

        // then (期待する結果):
        assert_eq!(
            command,
            InputCommand::Say("see you at the library".to_string())
        );
    }

    #[test]
    fn test_slash_commands() {
        // テスト項目: スラッシュコマンドが解釈される
        // given (前提条件):
        let cases = [
            ("/online", InputCommand::Online),
            ("/offline", InputCommand::Offline),
            ("/history", InputCommand::History),
            ("/logout", InputCommand::Logout),
            ("/quit", InputCommand::Quit),
            ("/theme dark", InputCommand::Theme(ThemeMode::Dark)),
            ("/theme light", InputCommand::Theme(ThemeMode::Light)),
        ];

        // when (操作) / then (期待する結果):
        for (line, expected) in cases {
            assert_eq!(InputCommand::parse(line), expected, "line: {line}");
        }
    }

    #[test]
    fn test_theme_command_updates_theme_cell() {
        // テスト項目: テーマ切り替えがテーマセルを更新し購読者に通知される
        // given (前提条件):
        let ctx = AppContext::new();
        let mut theme_rx = ctx.theme.subscribe();

        // when (操作):
        apply_theme(&ctx, ThemeMode::Dark);

        // then (期待する結果):
        assert!(theme_rx.has_changed().unwrap());
        assert_eq!(theme_rx.borrow_and_update().mode, ThemeMode::Dark);
    }

    #[test]
    fn test_unknown_or_malformed_commands() {
        // テスト項目: 未知のコマンドや引数の誤りは Unknown になる
        // given (前提条件):
        let lines = ["/dance", "/theme blue", "/online now", "/"];

        // when (操作) / then (期待する結果):
        for line in lines {
            assert_eq!(
                InputCommand::parse(line),
                InputCommand::Unknown(line.to_string())
            );
        }
    }
}
