//! Time-related utilities with clock abstraction for testability.

use chrono::{DateTime, Local, SecondsFormat, Utc};

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Current wall-clock time in UTC
    fn now(&self) -> DateTime<Utc>;

    /// Current time as an ISO-8601 string (`2024-03-01T09:30:00.000Z`)
    fn now_iso8601(&self) -> String {
        to_iso8601(self.now())
    }
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed clock implementation for testing (returns a fixed time)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed_time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock at the given instant
    pub fn new(fixed_time: DateTime<Utc>) -> Self {
        Self { fixed_time }
    }

    /// Create a new fixed clock from Unix milliseconds.
    ///
    /// Out-of-range values fall back to the Unix epoch.
    pub fn from_millis(millis: i64) -> Self {
        Self::new(DateTime::from_timestamp_millis(millis).unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.fixed_time
    }
}

/// Format an instant the way browsers' `Date#toISOString` does: UTC, millisecond precision, `Z` suffix.
pub fn to_iso8601(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Render an RFC 3339 timestamp as local `HH:MM` for chat display.
///
/// Returns `None` when the input does not parse.
pub fn display_time_of_day(timestamp: &str) -> Option<String> {
    let parsed = DateTime::parse_from_rfc3339(timestamp).ok()?;
    Some(parsed.with_timezone(&Local).format("%H:%M").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_returns_increasing_timestamps() {
        // テスト項目: SystemClock が呼び出すたびに増加する時刻を返す
        // given (前提条件):
        let clock = SystemClock;

        // when (操作):
        let first = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let second = clock.now();

        // then (期待する結果):
        assert!(second >= first);
    }

    #[test]
    fn test_fixed_clock_returns_consistent_timestamp() {
        // テスト項目: FixedClock が複数回呼び出しても同じ時刻を返す
        // given (前提条件):
        let clock = FixedClock::from_millis(1_709_285_400_000);

        // when (操作):
        let first = clock.now();
        let second = clock.now();

        // then (期待する結果):
        assert_eq!(first, second);
        assert_eq!(first.timestamp_millis(), 1_709_285_400_000);
    }

    #[test]
    fn test_now_iso8601_uses_millisecond_utc_format() {
        // テスト項目: ISO-8601 文字列がミリ秒精度・Z サフィックスで生成される
        // given (前提条件):
        let clock = FixedClock::from_millis(1_709_285_400_123);

        // when (操作):
        let result = clock.now_iso8601();

        // then (期待する結果):
        assert_eq!(result, "2024-03-01T09:30:00.123Z");
    }

    #[test]
    fn test_display_time_of_day_formats_hours_and_minutes() {
        // テスト項目: 有効なタイムスタンプが HH:MM 形式に変換される
        // given (前提条件):
        let timestamp = "2024-03-01T09:30:00.000Z";

        // when (操作):
        let result = display_time_of_day(timestamp);

        // then (期待する結果):
        let formatted = result.expect("timestamp should parse");
        assert_eq!(formatted.len(), 5);
        assert_eq!(&formatted[2..3], ":");
    }

    #[test]
    fn test_display_time_of_day_rejects_garbage() {
        // テスト項目: 不正なタイムスタンプは None になる
        // given (前提条件):
        let timestamp = "yesterday";

        // when (操作):
        let result = display_time_of_day(timestamp);

        // then (期待する結果):
        assert!(result.is_none());
    }
}
