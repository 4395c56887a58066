use std::time::Duration;

use crate::endpoint::DEFAULT_SOCKET_BASE_URL;
use crate::frames::FrameFormat;
use crate::retry::BackoffPolicy;

const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);

/// Settings for a [`crate::ChatSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Base URL of the chat server; `/ws/{agent_id}` is appended per connection.
    pub base_url: String,
    /// Reconnect delay policy for transient faults.
    pub backoff: BackoffPolicy,
    /// Wire shape of inbound and outbound frames.
    pub frame_format: FrameFormat,
    /// How long teardown waits for a graceful close handshake.
    pub close_timeout: Duration,
    /// Keepalive interval for envelope framing. `None` disables pings.
    pub ping_interval: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SOCKET_BASE_URL.to_string(),
            backoff: BackoffPolicy::default(),
            frame_format: FrameFormat::Raw,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            ping_interval: Some(DEFAULT_PING_INTERVAL),
        }
    }
}

impl SessionConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_frame_format(mut self, frame_format: FrameFormat) -> Self {
        self.frame_format = frame_format;
        self
    }

    pub fn with_close_timeout(mut self, close_timeout: Duration) -> Self {
        self.close_timeout = close_timeout;
        self
    }

    pub fn with_ping_interval(mut self, ping_interval: Option<Duration>) -> Self {
        self.ping_interval = ping_interval.filter(|interval| !interval.is_zero());
        self
    }
}
