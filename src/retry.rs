use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::boundary::{BoundaryError, BoundaryResult};

/// Bounded retry with exponential backoff and jitter, for idempotent reads only.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// `attempts` counts the first try; zero is treated as one.
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
        }
    }

    /// Try exactly once.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay before retry number `retry` (zero-based): `base * 2^retry`
    /// plus up to half again of random jitter.
    pub fn delay(&self, retry: u32) -> Duration {
        let backoff = self.base_delay.saturating_mul(1 << retry.min(16));
        let jitter_ceiling = u64::try_from(backoff.as_millis() / 2).unwrap_or(u64::MAX);
        let jitter = if jitter_ceiling > 0 {
            rand::thread_rng().gen_range(0..=jitter_ceiling)
        } else {
            0
        };
        backoff + Duration::from_millis(jitter)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> BoundaryResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = BoundaryResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.attempts => {
                    let delay = self.delay(attempt - 1);
                    warn!(
                        "{what} failed (attempt {attempt}/{}): {err}; retrying in {}ms",
                        self.attempts,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_transient() {
                        error!("{what} failed after {attempt} attempt(s): {err}");
                    }
                    return Err(err);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(200))
    }
}

/// Convenience for the common case of a transport failure message.
pub(crate) fn describe(err: &BoundaryError) -> String {
    match err {
        BoundaryError::Http(e) => match e.status() {
            Some(status) => format!("HTTP {status}"),
            None => e.to_string(),
        },
        other => other.to_string(),
    }
}
