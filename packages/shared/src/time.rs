//! Time-related utilities with clock abstraction for testability.
//!
//! Timestamps on the wire are RFC 3339 strings in UTC; internally the
//! client compares instants as Unix milliseconds.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Current Unix timestamp in milliseconds
    fn now_millis(&self) -> i64;

    /// Current time as an RFC 3339 string (UTC, millisecond precision)
    fn now_rfc3339(&self) -> String {
        millis_to_rfc3339(self.now_millis())
    }
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        current_timestamp_millis()
    }
}

/// Fixed clock implementation for testing (returns a fixed time)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed_time: i64,
}

impl FixedClock {
    /// Create a new fixed clock with the given timestamp
    pub fn new(fixed_time_millis: i64) -> Self {
        Self {
            fixed_time: fixed_time_millis,
        }
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.fixed_time
    }
}

/// Get current Unix timestamp in milliseconds
pub fn current_timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Get the current time as an RFC 3339 string
pub fn current_rfc3339() -> String {
    millis_to_rfc3339(current_timestamp_millis())
}

/// Convert Unix timestamp (milliseconds) to an RFC 3339 string in UTC.
///
/// Out-of-range values fall back to the Unix epoch.
pub fn millis_to_rfc3339(timestamp_millis: i64) -> String {
    let dt = Utc
        .timestamp_millis_opt(timestamp_millis)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH);
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 / ISO-8601 timestamp into Unix milliseconds.
///
/// Returns `None` when the string is not a valid timestamp.
pub fn parse_rfc3339_millis(value: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_returns_non_zero_timestamp() {
        // テスト項目: SystemClock が 0 以外のタイムスタンプを返す
        // given (前提条件):
        let clock = SystemClock;

        // when (操作):
        let timestamp = clock.now_millis();

        // then (期待する結果):
        assert!(timestamp > 0);
    }

    #[test]
    fn test_fixed_clock_returns_consistent_timestamp() {
        // テスト項目: FixedClock が複数回呼び出しても同じタイムスタンプを返す
        // given (前提条件):
        let fixed_time = 9876543210987;
        let clock = FixedClock::new(fixed_time);

        // when (操作):
        let timestamp1 = clock.now_millis();
        let timestamp2 = clock.now_millis();

        // then (期待する結果):
        assert_eq!(timestamp1, fixed_time);
        assert_eq!(timestamp2, fixed_time);
    }

    #[test]
    fn test_fixed_clock_formats_rfc3339() {
        // テスト項目: FixedClock の RFC 3339 表現が UTC で出力される
        // given (前提条件):
        // 2023-01-01 00:00:00 UTC
        let clock = FixedClock::new(1672531200000);

        // when (操作):
        let result = clock.now_rfc3339();

        // then (期待する結果):
        assert_eq!(result, "2023-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_millis_to_rfc3339_keeps_milliseconds() {
        // given (前提条件):
        let timestamp = 1672531200123;

        // when (操作):
        let result = millis_to_rfc3339(timestamp);

        // then (期待する結果):
        assert_eq!(result, "2023-01-01T00:00:00.123Z");
    }

    #[test]
    fn test_parse_rfc3339_millis_accepts_offsets() {
        // テスト項目: タイムゾーン付きの文字列が UTC ミリ秒に変換される
        // given (前提条件):
        let jst = "2023-01-01T09:00:00+09:00";

        // when (操作):
        let result = parse_rfc3339_millis(jst);

        // then (期待する結果):
        assert_eq!(result, Some(1672531200000));
    }

    #[test]
    fn test_parse_rfc3339_millis_rejects_garbage() {
        // given (前提条件):
        let value = "yesterday";

        // when (操作):
        let result = parse_rfc3339_millis(value);

        // then (期待する結果):
        assert_eq!(result, None);
    }
}
