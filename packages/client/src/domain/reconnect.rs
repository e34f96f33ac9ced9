//! Reconnection state machine of the event socket.
//!
//! [`Reconnector`] tracks the connection phase and the retry counter and
//! decides, for every closure, whether to reconnect, stop, or give up. It
//! never touches a socket or a timer, so the whole retry policy can be
//! exercised synchronously.

use std::time::Duration;

/// WebSocket close code for a normal, intentional closure
pub const NORMAL_CLOSURE: u16 = 1000;
/// Close code reported when the connection dropped without a close frame
pub const ABNORMAL_CLOSURE: u16 = 1006;
/// Close code the backend uses when the session is not ready yet
pub const POLICY_VIOLATION: u16 = 1008;

/// Lifecycle phase of the event socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    #[default]
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Retry policy applied after abnormal closures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Reconnects allowed before giving up
    pub max_attempts: u32,
    /// Delay before each reconnect
    pub delay: Duration,
    /// Multiplier applied to `delay` when the backend reports "not online"
    pub not_online_factor: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(2),
            not_online_factor: 2,
        }
    }
}

/// How a socket was closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    pub code: u16,
    pub reason: String,
}

impl CloseEvent {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Intentional closure (code 1000)
    pub fn normal(reason: impl Into<String>) -> Self {
        Self::new(NORMAL_CLOSURE, reason)
    }

    /// Dropped connection, failed handshake or connect timeout (code 1006)
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self::new(ABNORMAL_CLOSURE, reason)
    }

    pub fn is_normal(&self) -> bool {
        self.code == NORMAL_CLOSURE
    }

    /// Code 1008 with a reason mentioning "not online"
    pub fn is_not_online(&self) -> bool {
        self.code == POLICY_VIOLATION && self.reason.to_ascii_lowercase().contains("not online")
    }
}

/// Outcome of a closure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    /// Intentional closure or logged out: stay closed
    Stop,
    /// Reconnect after `delay`; `attempt` is 1-based
    Reconnect { delay: Duration, attempt: u32 },
    /// Retries used up: surface the connection problem
    Exhausted { attempts: u32 },
}

/// Connection phase plus retry bookkeeping
#[derive(Debug, Clone)]
pub struct Reconnector {
    policy: ReconnectPolicy,
    phase: ConnectionPhase,
    attempts: u32,
    logged_in: bool,
}

impl Reconnector {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            phase: ConnectionPhase::Idle,
            attempts: 0,
            logged_in: false,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// Reconnects performed since the last successful open
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// A fresh `connect` for a logged-in identity: counters start over.
    pub fn connect_requested(&mut self) {
        self.logged_in = true;
        self.attempts = 0;
        self.phase = ConnectionPhase::Connecting;
    }

    /// A scheduled reconnect is starting.
    pub fn retry_started(&mut self) {
        self.phase = ConnectionPhase::Connecting;
    }

    /// The socket reached the open state.
    pub fn on_open(&mut self) {
        self.phase = ConnectionPhase::Open;
        self.attempts = 0;
    }

    /// Intentional teardown (logout or replacement) has begun.
    pub fn close_requested(&mut self) {
        self.logged_in = false;
        self.phase = ConnectionPhase::Closing;
    }

    /// The identity is no longer logged in; no closure will reconnect.
    pub fn log_out(&mut self) {
        self.logged_in = false;
    }

    /// The socket closed. Decide what happens next.
    pub fn on_close(&mut self, event: &CloseEvent) -> CloseDecision {
        self.phase = ConnectionPhase::Closed;

        if event.is_normal() || !self.logged_in {
            return CloseDecision::Stop;
        }
        if self.attempts >= self.policy.max_attempts {
            return CloseDecision::Exhausted {
                attempts: self.attempts,
            };
        }

        self.attempts += 1;
        let delay = if event.is_not_online() {
            self.policy.delay * self.policy.not_online_factor
        } else {
            self.policy.delay
        };

        CloseDecision::Reconnect {
            delay,
            attempt: self.attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected() -> Reconnector {
        let mut reconnector = Reconnector::new(ReconnectPolicy::default());
        reconnector.connect_requested();
        reconnector.on_open();
        reconnector
    }

    #[test]
    fn test_abnormal_close_schedules_reconnect_with_base_delay() {
        // テスト項目: 異常切断では 2 秒後の再接続が予定される
        // given (前提条件):
        let mut reconnector = connected();

        // when (操作):
        let decision = reconnector.on_close(&CloseEvent::abnormal("reset by peer"));

        // then (期待する結果):
        assert_eq!(
            decision,
            CloseDecision::Reconnect {
                delay: Duration::from_secs(2),
                attempt: 1
            }
        );
        assert_eq!(reconnector.phase(), ConnectionPhase::Closed);
    }

    #[test]
    fn test_not_online_close_doubles_delay() {
        // テスト項目: 1008 "not online" では待機時間が 2 倍になる
        // given (前提条件):
        let mut reconnector = connected();

        // when (操作):
        let decision =
            reconnector.on_close(&CloseEvent::new(POLICY_VIOLATION, "User Not Online"));

        // then (期待する結果):
        assert_eq!(
            decision,
            CloseDecision::Reconnect {
                delay: Duration::from_secs(4),
                attempt: 1
            }
        );
    }

    #[test]
    fn test_policy_violation_without_not_online_uses_base_delay() {
        // given (前提条件):
        let mut reconnector = connected();

        // when (操作):
        let decision = reconnector.on_close(&CloseEvent::new(POLICY_VIOLATION, "bad token"));

        // then (期待する結果):
        assert_eq!(
            decision,
            CloseDecision::Reconnect {
                delay: Duration::from_secs(2),
                attempt: 1
            }
        );
    }

    #[test]
    fn test_normal_close_never_reconnects() {
        // テスト項目: コード 1000 の切断では再接続しない
        // given (前提条件):
        let mut reconnector = connected();

        // when (操作):
        let decision = reconnector.on_close(&CloseEvent::normal("bye"));

        // then (期待する結果):
        assert_eq!(decision, CloseDecision::Stop);
    }

    #[test]
    fn test_voluntary_close_never_reconnects_even_if_socket_drops() {
        // テスト項目: ログアウト後は異常切断でも再接続しない
        // given (前提条件):
        let mut reconnector = connected();
        reconnector.close_requested();

        // when (操作):
        let decision = reconnector.on_close(&CloseEvent::abnormal("dropped during close"));

        // then (期待する結果):
        assert_eq!(decision, CloseDecision::Stop);
        assert!(!reconnector.is_logged_in());
    }

    #[test]
    fn test_attempts_never_exceed_maximum() {
        // テスト項目: 再接続回数は上限 (10) を超えず、その後 Exhausted になる
        // given (前提条件):
        let mut reconnector = connected();
        let mut reconnects = 0;

        // when (操作):
        let exhausted = loop {
            match reconnector.on_close(&CloseEvent::abnormal("down")) {
                CloseDecision::Reconnect { attempt, .. } => {
                    reconnects += 1;
                    assert!(attempt <= 10);
                    reconnector.retry_started();
                }
                other => break other,
            }
        };

        // then (期待する結果):
        assert_eq!(reconnects, 10);
        assert_eq!(exhausted, CloseDecision::Exhausted { attempts: 10 });
    }

    #[test]
    fn test_successful_open_resets_attempts() {
        // テスト項目: 接続成功で再接続カウンタが 0 に戻る
        // given (前提条件):
        let mut reconnector = connected();
        reconnector.on_close(&CloseEvent::abnormal("down"));
        reconnector.retry_started();
        reconnector.on_close(&CloseEvent::abnormal("down"));
        assert_eq!(reconnector.attempts(), 2);

        // when (操作):
        reconnector.retry_started();
        reconnector.on_open();

        // then (期待する結果):
        assert_eq!(reconnector.attempts(), 0);
        assert_eq!(reconnector.phase(), ConnectionPhase::Open);
    }

    #[test]
    fn test_connect_requested_starts_a_fresh_budget() {
        // given (前提条件):
        let mut reconnector = connected();
        for _ in 0..10 {
            reconnector.on_close(&CloseEvent::abnormal("down"));
        }

        // when (操作):
        reconnector.connect_requested();

        // then (期待する結果):
        assert_eq!(reconnector.attempts(), 0);
        assert_eq!(reconnector.phase(), ConnectionPhase::Connecting);
        assert!(reconnector.is_logged_in());
    }
}
