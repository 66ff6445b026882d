use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use rand::Rng;

use crate::config::AdvisorConfig;
use crate::error::{AdviceGenerationError, TransportError};

/// Suspends the current task between attempts. Injected so tests can skip real delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter: f64,
}

impl RetryPolicy {
    pub fn from_config(config: &AdvisorConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
            jitter: config.backoff_jitter.clamp(0.0, 1.0),
        }
    }

    /// Exponential delay after the `attempt`-th failure (1-based), capped at `max_backoff`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter == 0.0 || base.is_zero() {
            return base;
        }
        let factor = rand::thread_rng().gen_range(1.0 - self.jitter..=1.0 + self.jitter);
        // saturate instead of overflowing when max_backoff is near Duration::MAX
        Duration::try_from_secs_f64(base.as_secs_f64() * factor).unwrap_or(Duration::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::config::DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(8),
            jitter: 0.0,
        }
    }
}

/// Runs `call` until it succeeds or `policy.max_attempts` is spent.
///
/// Every attempt is bounded by `timeout`; a timeout counts as a failed attempt.
/// Dropping the returned future abandons the in-flight attempt and schedules
/// nothing further.
pub async fn call_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    timeout: Duration,
    mut call: F,
) -> std::result::Result<T, AdviceGenerationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, TransportError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        debug!("Advice API attempt {}/{}", attempt, max_attempts);

        let error = match tokio::time::timeout(timeout, call()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e,
            Err(_) => TransportError::Timeout {
                seconds: timeout.as_secs(),
            },
        };

        if attempt >= max_attempts {
            warn!(
                "Advice API attempt {}/{} failed, giving up: {}",
                attempt, max_attempts, error
            );
            return Err(AdviceGenerationError::Api {
                attempts: attempt,
                last_error: error,
            });
        }

        let delay = policy.delay_for(attempt);
        warn!(
            "Advice API attempt {}/{} failed: {}. Retrying in {:?}",
            attempt, max_attempts, error, delay
        );
        sleeper.sleep(delay).await;
    }
}
