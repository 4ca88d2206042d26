//! Logging setup utilities for the unihub binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose log output is enabled at the default level.
const WORKSPACE_TARGETS: [&str; 3] = ["unihub_shared", "unihub_client", "unihub_server"];

/// Build the default `EnvFilter` directive string.
///
/// The binary target and every workspace crate get `default_log_level`;
/// dependencies stay at their own defaults (off unless `RUST_LOG` says otherwise).
pub fn default_directives(binary_name: &str, default_log_level: &str) -> String {
    let binary_target = binary_name.replace('-', "_");
    let mut directives: Vec<String> = WORKSPACE_TARGETS
        .iter()
        .map(|target| format!("{target}={default_log_level}"))
        .collect();
    if !WORKSPACE_TARGETS.contains(&binary_target.as_str()) {
        directives.push(format!("{binary_target}={default_log_level}"));
    }
    directives.join(",")
}

/// Initialize the tracing subscriber with the specified default log level.
///
/// The log level can be overridden using the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "unihub-server", "unihub-client")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use unihub_shared::logger::setup_logger;
///
/// setup_logger("unihub-server", "debug");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directives(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_cover_workspace_crates() {
        // テスト項目: ワークスペース内の全クレートにデフォルトレベルが設定される
        // given (前提条件):
        let binary_name = "unihub-server";

        // when (操作):
        let directives = default_directives(binary_name, "debug");

        // then (期待する結果):
        assert_eq!(
            directives,
            "unihub_shared=debug,unihub_client=debug,unihub_server=debug"
        );
    }

    #[test]
    fn test_default_directives_add_foreign_binary_target() {
        // テスト項目: ワークスペース外のバイナリ名は追加のディレクティブになる
        // given (前提条件):
        let binary_name = "chat-probe";

        // when (操作):
        let directives = default_directives(binary_name, "info");

        // then (期待する結果):
        assert!(directives.ends_with(",chat_probe=info"));
    }
}
