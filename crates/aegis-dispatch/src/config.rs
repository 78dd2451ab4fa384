//! Dispatcher configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning for the dispatch loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// How long to wait for a venue acknowledgment before treating the
    /// call as a connectivity failure, in milliseconds.
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
    /// Capacity of the venue event channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_ack_timeout_ms() -> u64 {
    5000
}

fn default_event_capacity() -> usize {
    1024
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: default_ack_timeout_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl DispatchConfig {
    /// Acknowledgment timeout as a [`Duration`].
    #[must_use]
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.ack_timeout(), Duration::from_secs(5));
        assert_eq!(config.event_capacity, 1024);
    }
}
