//! Reconnect backoff

use std::time::Duration;

use contracts::BackoffConfig;

/// Exponential delay sequence, capped at `max_delay`
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    current: Duration,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            current: config.min_delay(),
            config,
        }
    }

    /// Delay to wait before the next attempt
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current.min(self.config.max_delay());
        let grown = (self.current.as_millis() as f64 * self.config.factor.max(1.0)).round() as u64;
        self.current = Duration::from_millis(grown.min(self.config.max_delay_ms));
        delay
    }

    /// Start over after a successful dial
    pub fn reset(&mut self) {
        self.current = self.config.min_delay();
    }
}
