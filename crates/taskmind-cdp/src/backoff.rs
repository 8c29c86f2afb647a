//! Reconnect backoff.
//!
//! Pure state: the session supervisor asks for the next delay and sleeps on
//! it, so the schedule is testable without a clock.

use std::time::Duration;

use taskmind_config::SessionConfig;

/// Reconnect schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Maximum number of reconnect attempts before the session is dead.
    pub max_attempts: u32,
    /// Delay before the first attempt.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl ReconnectPolicy {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            max_attempts: config.max_reconnect_attempts,
            base_delay: config.reconnect_base_delay(),
            max_delay: config.reconnect_max_delay(),
        }
    }

    /// Delay before attempt `attempt` (zero-based): `base * 2^attempt`, capped.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    pub fn backoff(&self) -> Backoff {
        Backoff {
            policy: self.clone(),
            attempt: 0,
        }
    }
}

/// One reconnect episode.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    attempt: u32,
}

impl Backoff {
    /// Delay before the next attempt, or `None` once the budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.policy.max_attempts {
            return None;
        }
        let delay = self.policy.delay_for_attempt(self.attempt);
        self.attempt += 1;
        Some(delay)
    }

    /// Attempts handed out so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.policy.max_attempts
    }
}
