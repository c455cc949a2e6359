//! Reconnect policy: decides how long an observer waits before reconnecting.

use std::time::Duration;

use crate::domain::errors::BusError;

/// Reconnect policy for observer connections.
///
/// The delay is fixed: every attempt waits the same amount of time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
}

impl ReconnectPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self { delay }
    }

    /// Delay before the next connect attempt.
    ///
    /// # Arguments
    /// * `attempts` - Number of failed attempts since the last successful connect.
    pub fn next_delay(&self, _attempts: u32) -> Duration {
        self.delay
    }

    /// Should a failed connect be retried at all?
    pub fn should_retry(&self, error: &BusError) -> bool {
        error.is_retryable()
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_millis(1000))
    }
}
