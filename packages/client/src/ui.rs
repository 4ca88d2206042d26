//! UI utilities for the terminal client.

use std::io::Write;

/// Prompt shown before each input line
pub fn prompt(nickname: Option<&str>) -> String {
    format!("{}> ", nickname.unwrap_or("guest"))
}

/// Redisplay the prompt after printing an update
pub fn redisplay_prompt(nickname: Option<&str>) {
    print!("{}", prompt(nickname));
    std::io::stdout().flush().ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_uses_nickname_or_guest() {
        // テスト項目: プロンプトにニックネーム、未ログイン時は guest が表示される
        // given (前提条件) / when (操作):
        let signed_in = prompt(Some("alice"));
        let anonymous = prompt(None);

        // then (期待する結果):
        assert_eq!(signed_in, "alice> ");
        assert_eq!(anonymous, "guest> ");
    }
}
