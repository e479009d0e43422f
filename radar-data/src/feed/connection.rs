use crate::exchange::ExchangeId;
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential reconnect backoff: `delay(attempt) = min(base * 2^attempt, cap)`.
///
/// No jitter is applied, so delays are reproducible.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReconnectPolicy {
    pub base: Duration,
    pub cap: Duration,
}

impl ReconnectPolicy {
    /// Construct a new [`Self`]. A `cap` below `base` is raised to `base`.
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap: cap.max(base),
        }
    }

    /// Constant retry delay.
    pub fn fixed(delay: Duration) -> Self {
        Self::new(delay, delay)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.cap)
    }
}

/// Connectivity state of one exchange stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Display, Deserialize, Serialize)]
pub enum ConnectionStatus {
    #[default]
    Idle,
    Connecting,
    Live,
    Error,
    Reconnecting,
    Closed,
}

/// Reconnect state machine of one stream session.
///
/// `Idle -> Connecting -> Live -> (Error | Reconnecting) -> Connecting -> .. -> Closed`.
/// [`ConnectionStatus::Closed`] is terminal: every transition after [`FeedConnection::close`]
/// is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConnection {
    status: ConnectionStatus,
    attempt: u32,
    policy: ReconnectPolicy,
}

impl FeedConnection {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            status: ConnectionStatus::Idle,
            attempt: 0,
            policy,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn is_closed(&self) -> bool {
        self.status == ConnectionStatus::Closed
    }

    /// Returns `false` if the connection is closed and must not be re-opened.
    pub fn on_connecting(&mut self) -> bool {
        self.transition(ConnectionStatus::Connecting)
    }

    /// Connection established, resets the attempt counter.
    pub fn on_connected(&mut self) {
        if self.transition(ConnectionStatus::Live) {
            self.attempt = 0;
        }
    }

    pub fn on_error(&mut self) {
        self.transition(ConnectionStatus::Error);
    }

    /// Schedule the next reconnect, returning the delay to wait and incrementing the attempt
    /// counter. Returns `None` once closed.
    pub fn schedule_reconnect(&mut self) -> Option<Duration> {
        if !self.transition(ConnectionStatus::Reconnecting) {
            return None;
        }
        let delay = self.policy.delay(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        Some(delay)
    }

    pub fn close(&mut self) {
        self.status = ConnectionStatus::Closed;
    }

    fn transition(&mut self, next: ConnectionStatus) -> bool {
        if self.is_closed() {
            return false;
        }
        self.status = next;
        true
    }
}

/// Published snapshot of a [`FeedConnection`], used for liveness display.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeedStatus {
    pub exchange: ExchangeId,
    pub status: ConnectionStatus,
    pub attempt: u32,
    pub last_event: Option<DateTime<Utc>>,
    /// Sessions started so far, bumped each time the manager is (re)started for a symbol set.
    pub sessions: u64,
}

impl FeedStatus {
    pub fn new(exchange: ExchangeId) -> Self {
        Self {
            exchange,
            status: ConnectionStatus::Idle,
            attempt: 0,
            last_event: None,
            sessions: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconnect_policy_delay() {
        struct TestCase {
            policy: ReconnectPolicy,
            attempt: u32,
            expected: Duration,
        }

        let reference = ReconnectPolicy::new(Duration::from_secs(1), Duration::from_secs(15));
        let peer = ReconnectPolicy::fixed(Duration::from_secs(2));

        let tests = vec![
            TestCase {
                // TC0: delay(0) == base
                policy: reference,
                attempt: 0,
                expected: Duration::from_secs(1),
            },
            TestCase {
                // TC1: doubles
                policy: reference,
                attempt: 3,
                expected: Duration::from_secs(8),
            },
            TestCase {
                // TC2: capped
                policy: reference,
                attempt: 4,
                expected: Duration::from_secs(15),
            },
            TestCase {
                // TC3: shift overflow saturates to cap
                policy: reference,
                attempt: 64,
                expected: Duration::from_secs(15),
            },
            TestCase {
                // TC4: fixed policy
                policy: peer,
                attempt: 5,
                expected: Duration::from_secs(2),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.policy.delay(test.attempt);
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_reconnect_policy_delay_is_non_decreasing() {
        let policy = ReconnectPolicy::new(Duration::from_millis(250), Duration::from_secs(30));
        let delays = (0..100).map(|attempt| policy.delay(attempt)).collect::<Vec<_>>();
        assert!(delays.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(delays[0], policy.base);
        assert!(delays.iter().all(|delay| *delay <= policy.cap));
    }

    #[test]
    fn test_reconnect_policy_cap_below_base() {
        let policy = ReconnectPolicy::new(Duration::from_secs(5), Duration::from_secs(1));
        assert_eq!(policy.delay(0), Duration::from_secs(5));
    }

    #[test]
    fn test_feed_connection_lifecycle() {
        let policy = ReconnectPolicy::new(Duration::from_secs(1), Duration::from_secs(15));
        let mut connection = FeedConnection::new(policy);
        assert_eq!(connection.status(), ConnectionStatus::Idle);

        // Two failed attempts grow the delay
        assert!(connection.on_connecting());
        connection.on_error();
        assert_eq!(connection.status(), ConnectionStatus::Error);
        assert_eq!(connection.schedule_reconnect(), Some(Duration::from_secs(1)));
        assert!(connection.on_connecting());
        connection.on_error();
        assert_eq!(connection.schedule_reconnect(), Some(Duration::from_secs(2)));
        assert_eq!(connection.attempt(), 2);

        // Successful connect resets the attempt counter
        assert!(connection.on_connecting());
        connection.on_connected();
        assert_eq!(connection.status(), ConnectionStatus::Live);
        assert_eq!(connection.attempt(), 0);

        // Dropped while live
        assert_eq!(connection.schedule_reconnect(), Some(Duration::from_secs(1)));
        assert_eq!(connection.status(), ConnectionStatus::Reconnecting);

        // Closed is terminal
        connection.close();
        assert!(!connection.on_connecting());
        connection.on_connected();
        connection.on_error();
        assert_eq!(connection.schedule_reconnect(), None);
        assert_eq!(connection.status(), ConnectionStatus::Closed);
    }
}
