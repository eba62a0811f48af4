//! Per-session tunables

use std::time::Duration;

/// Session behavior knobs. The defaults suit interactive use.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Reconnect automatically on retryable transport drops.
    pub auto_reconnect: bool,

    /// Bounded re-dial attempts per drop.
    pub max_reconnect_tries: u32,

    /// How long Configuring may wait for the setup acknowledgement.
    pub setup_timeout: Duration,

    /// Output stream channel capacity. Small on purpose: a stalled
    /// consumer suspends the receive loop rather than buffering without
    /// bound.
    pub output_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            max_reconnect_tries: 3,
            setup_timeout: Duration::from_secs(10),
            output_capacity: 32,
        }
    }
}

impl SessionOptions {
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    pub fn with_max_reconnect_tries(mut self, tries: u32) -> Self {
        self.max_reconnect_tries = tries;
        self
    }

    pub fn with_setup_timeout(mut self, timeout: Duration) -> Self {
        self.setup_timeout = timeout;
        self
    }
}
