use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::{PresenceError, Result};

/// Retry policy shared by every bootstrap step.
///
/// Errors are retried while [`PresenceError::is_retryable`] holds and the
/// attempt budget lasts. `SessionNotReady` waits `not_ready_delay`, every
/// other retryable error waits `delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
    pub delay: Duration,
    pub not_ready_delay: Duration,
    /// Minimum spacing between user-visible retry notices.
    pub notice_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            delay: Duration::ZERO,
            not_ready_delay: Duration::from_millis(1500),
            notice_interval: Duration::from_millis(1000),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            delay: Duration::from_millis(cfg.retry_delay_ms),
            not_ready_delay: Duration::from_millis(cfg.not_ready_delay_ms),
            notice_interval: Duration::from_millis(cfg.notice_interval_ms),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt after `err`.
    pub fn delay_for(&self, err: &PresenceError) -> Duration {
        match err {
            PresenceError::SessionNotReady => self.not_ready_delay,
            _ => self.delay,
        }
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

/// Lets a notice through at most once per interval.
#[derive(Debug)]
pub struct NoticeThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl NoticeThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn should_notify(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the policy
/// runs out of attempts.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut throttle = NoticeThrottle::new(policy.notice_interval);
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_retryable() || policy.exhausted(attempts) {
            return Err(err);
        }

        debug!("{what}: attempt {attempts} failed: {err}");
        if throttle.should_notify(Instant::now()) {
            warn!("Unable to get {what} ({err}), retrying...");
        }

        let delay = policy.delay_for(&err);
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }
    }
}
