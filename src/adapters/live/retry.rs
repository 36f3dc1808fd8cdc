use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng as _;
use tracing::{debug, warn};

use crate::config::types::RetryConfig;
use crate::error::{ProviderError, Result};

/// How a single HTTP status is treated by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Success,
    /// 429 or 5xx: worth another attempt.
    Transient,
    /// Any other status: the request will never succeed unmodified.
    Terminal,
}

pub fn classify(status: u16) -> Classification {
    match status {
        200..=299 => Classification::Success,
        429 | 500..=599 => Classification::Transient,
        _ => Classification::Terminal,
    }
}

/// A failed attempt, plus the provider's requested wait when it sent one.
#[derive(Debug)]
pub struct AttemptFailure {
    pub error: ProviderError,
    pub retry_after: Option<Duration>,
}

impl From<ProviderError> for AttemptFailure {
    fn from(error: ProviderError) -> Self {
        Self {
            error,
            retry_after: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    max_jitter: Duration,
    max_retry_after: Duration,
}

const DEFAULT_MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration, max_jitter: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
            max_jitter,
            max_retry_after: DEFAULT_MAX_RETRY_AFTER,
        }
    }

    /// Cap on a provider-requested `Retry-After` wait.
    #[must_use]
    pub fn with_max_retry_after(mut self, cap: Duration) -> Self {
        self.max_retry_after = cap;
        self
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            Duration::from_millis(config.max_jitter_ms),
        )
        .with_max_retry_after(Duration::from_millis(config.max_retry_after_ms))
    }

    /// Same delays, single attempt.
    #[must_use]
    pub fn without_retries(&self) -> Self {
        Self {
            max_retries: 0,
            ..self.clone()
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// `base_delay * 2^attempt`, capped at `max_delay`. `attempt` is the
    /// zero-based index of the attempt that just failed.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2_u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Wait before the next attempt: `Retry-After` (capped at
    /// `max_retry_after`) plus jitter when the provider sent one, the
    /// exponential schedule otherwise.
    pub fn retry_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(wait) => wait.min(self.max_retry_after).saturating_add(self.jitter()),
            None => self.backoff_delay(attempt),
        }
    }

    fn jitter(&self) -> Duration {
        if self.max_jitter.is_zero() {
            return Duration::ZERO;
        }
        let max_ms = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }

    /// Drive `attempt_fn` until it succeeds, fails terminally, or the budget
    /// runs out. Attempts never overlap.
    ///
    /// With a zero budget a transient failure is returned as-is; otherwise an
    /// exhausted budget yields `RetriesExhausted` wrapping the last failure.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut attempt_fn: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = std::result::Result<T, AttemptFailure>>,
    {
        let mut attempt = 0;
        loop {
            let failure = match attempt_fn(attempt).await {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };

            if !failure.error.is_transient() {
                debug!(operation, attempt, error = %failure.error, "Terminal provider failure");
                return Err(failure.error);
            }

            if attempt >= self.max_retries {
                if self.max_retries == 0 {
                    return Err(failure.error);
                }
                warn!(
                    operation,
                    attempts = attempt + 1,
                    error = %failure.error,
                    "Provider retry budget exhausted"
                );
                return Err(ProviderError::RetriesExhausted {
                    attempts: attempt + 1,
                    last: Box::new(failure.error),
                });
            }

            if let Some(wait) = failure.retry_after
                && wait > self.max_retry_after
            {
                warn!(
                    operation,
                    requested_secs = wait.as_secs(),
                    cap_ms = u64::try_from(self.max_retry_after.as_millis()).unwrap_or(u64::MAX),
                    "Provider Retry-After exceeds cap, waiting the cap instead"
                );
            }
            let delay = self.retry_delay(attempt, failure.retry_after);
            warn!(
                operation,
                attempt = attempt + 1,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                retry_after = failure.retry_after.is_some(),
                error = %failure.error,
                "Transient provider failure, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Parse a `Retry-After` value: delta-seconds or an HTTP-date. Dates in the
/// past mean "retry now". Values no `Duration` can hold count as absent.
pub fn parse_retry_after(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    if let Ok(secs) = raw.parse::<f64>() {
        return Duration::try_from_secs_f64(secs).ok();
    }
    let at = DateTime::parse_from_rfc2822(raw).ok()?.with_timezone(&Utc);
    Some((at - Utc::now()).to_std().unwrap_or(Duration::ZERO))
}
