//! Transient-failure classification and exponential backoff.

use std::collections::BTreeSet;
use std::time::Duration;

use strum::Display;

use crate::config::ClientConfig;
use crate::error::BelayError;

/// Randomization applied to each backoff delay.
#[derive(Debug, Clone, Copy, PartialEq, Default, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Jitter {
    /// Exact `base * 2^n` delays.
    #[default]
    None,
    /// Scale the delay by a random factor in `[1 - f, 1 + f]`; `f` is clamped to `[0, 1]`.
    Proportional(f64),
    /// Uniform in `[0, delay]`.
    Full,
}

impl Jitter {
    fn apply(self, delay: Duration) -> Duration {
        match self {
            Self::None => delay,
            Self::Proportional(spread) => {
                let spread = spread.clamp(0.0, 1.0);
                let factor = 1.0 - spread + fastrand::f64() * 2.0 * spread;
                scale(delay, factor)
            }
            Self::Full => scale(delay, fastrand::f64()),
        }
    }
}

fn scale(delay: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of replays after the first attempt.
    pub max_retries: u32,
    /// Delay before the first replay; doubled for each later one.
    pub base_delay: Duration,
    /// Optional ceiling applied before jitter.
    pub max_delay: Option<Duration>,
    /// Response statuses treated as transient.
    pub retryable_statuses: BTreeSet<u16>,
    pub jitter: Jitter,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: crate::config::DEFAULT_MAX_RETRIES,
            base_delay: crate::config::DEFAULT_RETRY_DELAY,
            max_delay: None,
            retryable_statuses: crate::config::DEFAULT_RETRYABLE_STATUSES
                .iter()
                .copied()
                .collect(),
            jitter: Jitter::None,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.base_retry_delay,
            max_delay: config.max_retry_delay,
            retryable_statuses: config.retryable_statuses.clone(),
            jitter: config.jitter,
        }
    }

    /// Whether a request that has already been replayed `retry_count` times
    /// may be replayed again after failing with `error`.
    pub fn should_retry(&self, error: &BelayError, retry_count: u32) -> bool {
        if retry_count >= self.max_retries {
            return false;
        }
        if error.is_no_response() {
            return true;
        }
        error
            .status_code()
            .is_some_and(|status| self.retryable_statuses.contains(&status))
    }

    /// Delay before replay number `retry_count + 1`: `base_delay * 2^retry_count`.
    pub fn delay(&self, retry_count: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry_count);
        let mut delay = self.base_delay.saturating_mul(factor);
        if let Some(max_delay) = self.max_delay {
            delay = delay.min(max_delay);
        }
        self.jitter.apply(delay)
    }
}
