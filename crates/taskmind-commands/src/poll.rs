//! Deadline-bounded polling.
//!
//! [`Poller`] is a pure state machine over caller-supplied instants; the
//! async [`poll_until`] drives it with the tokio clock.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use taskmind_cdp::CommandFailure;

/// Fixed-interval poll schedule with a deadline.
#[derive(Debug, Clone)]
pub struct Poller {
    deadline: Instant,
    interval: Duration,
    checks: u32,
}

impl Poller {
    pub fn new(start: Instant, window: Duration, interval: Duration) -> Self {
        Self {
            deadline: start + window,
            interval,
            checks: 0,
        }
    }

    /// Record a failed check at `now`. Returns how long to wait before the
    /// next check, or `None` once the window is spent.
    pub fn next_delay(&mut self, now: Instant) -> Option<Duration> {
        self.checks += 1;
        if now >= self.deadline {
            return None;
        }
        Some(self.interval.min(self.deadline - now))
    }

    /// Checks recorded so far.
    pub fn checks(&self) -> u32 {
        self.checks
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }

    /// Time a single check may take when started at `now`: what is left of
    /// the window, but never less than one interval.
    pub fn check_budget(&self, now: Instant) -> Duration {
        self.remaining(now).max(self.interval)
    }
}

/// Outcome of [`poll_until`].
#[derive(Debug)]
pub(crate) enum Polled<T> {
    Ready { value: T, checks: u32 },
    Expired { checks: u32 },
}

/// Run `check` until it yields `Some`, the window expires or it fails.
/// The first check runs immediately; a zero window means exactly one check.
/// Each check receives its time budget from [`Poller::check_budget`].
pub(crate) async fn poll_until<T, F, Fut>(
    window: Duration,
    interval: Duration,
    mut check: F,
) -> Result<Polled<T>, CommandFailure>
where
    F: FnMut(Duration) -> Fut,
    Fut: Future<Output = Result<Option<T>, CommandFailure>>,
{
    let mut poller = Poller::new(Instant::now(), window, interval);
    loop {
        if let Some(value) = check(poller.check_budget(Instant::now())).await? {
            return Ok(Polled::Ready {
                value,
                checks: poller.checks() + 1,
            });
        }
        match poller.next_delay(Instant::now()) {
            Some(delay) => tokio::time::sleep(delay).await,
            None => {
                return Ok(Polled::Expired {
                    checks: poller.checks(),
                });
            }
        }
    }
}
