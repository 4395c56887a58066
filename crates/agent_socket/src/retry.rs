use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

/// Base delay before the first reconnect.
pub const BASE_DELAY_MS: u64 = 1000;
/// Upper bound for any reconnect delay.
pub const MAX_DELAY_MS: u64 = 10_000;

/// Application close code the chat server uses when the agent does not exist.
pub const AGENT_NOT_FOUND_CLOSE_CODE: u16 = 4404;
/// Standard WebSocket policy-violation close code.
pub const POLICY_VIOLATION_CLOSE_CODE: u16 = 1008;

fn agent_not_found_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"(?i)agent\b.*\bnot.?found|no.?such.?agent|unknown.?agent")
            .expect("agent-not-found regex must compile")
    })
}

/// Close frames that mean the target agent is gone. Everything else is transient.
pub fn is_fatal_close(code: Option<u16>, reason: &str) -> bool {
    match code {
        Some(AGENT_NOT_FOUND_CLOSE_CODE) => true,
        Some(POLICY_VIOLATION_CLOSE_CODE) => agent_not_found_regex().is_match(reason),
        _ => false,
    }
}

/// Handshake statuses that mean the target agent is gone.
pub fn is_fatal_handshake_status(status: u16) -> bool {
    status == 404
}

/// Exponential reconnect delay policy: `min(base * 2^(k-1), cap)` for retry `k >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(BASE_DELAY_MS),
            cap: Duration::from_millis(MAX_DELAY_MS),
        }
    }
}

impl BackoffPolicy {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap: cap.max(base),
        }
    }

    /// Delay before retry `attempt`, counting from 1. Attempt 0 is treated as 1.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(30);
        self.base
            .checked_mul(2u32.saturating_pow(exponent))
            .unwrap_or(self.cap)
            .min(self.cap)
    }
}

/// Retry counter over a [`BackoffPolicy`]; reset once a connection is established.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    attempt: u32,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Advances to the next retry and returns its delay.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        self.policy.delay_for_attempt(self.attempt)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Number of retries scheduled since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn policy(&self) -> BackoffPolicy {
        self.policy
    }
}
