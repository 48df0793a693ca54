//! Retry policy for queries.
//!
//! A query opts in through [`crate::Query::retry`]. Only transient failures
//! are retried: the server being unreachable, a timeout, or a 5xx answer.
//! Mutations never go through here.
//!
//! ```
//! use vanadristi_core::{Error, RetryConfig, with_retry};
//!
//! # async fn example() -> Result<(), Error> {
//! let value = with_retry(&RetryConfig::once(), "ai/analysis", || async {
//!     Ok::<_, Error>(42)
//! })
//! .await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// How often and how patiently a query is retried.
///
/// The delay doubles after every failed attempt, starting at `first_delay`
/// and never exceeding `delay_cap`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt; 0 disables retrying.
    pub max_retries: u32,
    pub first_delay: Duration,
    pub delay_cap: Duration,
    /// Spread retries by up to a quarter of the delay.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryConfig {
    /// Fail on the first error.
    pub fn none() -> Self {
        Self::with_retries(0)
    }

    /// One more attempt after a transient failure.
    pub fn once() -> Self {
        Self::with_retries(1)
    }

    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            first_delay: Duration::from_secs(1),
            delay_cap: Duration::from_secs(30),
            jitter: true,
        }
    }

    #[must_use]
    pub fn first_delay(mut self, delay: Duration) -> Self {
        self.first_delay = delay;
        self
    }

    #[must_use]
    pub fn delay_cap(mut self, cap: Duration) -> Self {
        self.delay_cap = cap;
        self
    }

    #[must_use]
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Pause before retry number `retry` (0-based).
    fn pause_before(&self, retry: u32) -> Duration {
        let doubled = self
            .first_delay
            .saturating_mul(2u32.saturating_pow(retry))
            .min(self.delay_cap);
        if !self.jitter {
            return doubled;
        }
        let spread = rand::rng().random_range(0.0..=0.25);
        doubled.mul_f64(1.0 + spread)
    }
}

/// Run `fetch`, retrying transient failures as `config` allows.
///
/// `label` names the request in logs, usually the cache key.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, label: &str, fetch: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retries = 0;
    loop {
        let error = match fetch().await {
            Ok(value) => {
                if retries > 0 {
                    debug!("{} recovered after {} retries", label, retries);
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if retries >= config.max_retries || !is_transient(&error) {
            return Err(error);
        }
        let pause = config.pause_before(retries);
        retries += 1;
        warn!(
            "{} failed ({}); retry {}/{} in {:?}",
            label, error, retries, config.max_retries, pause
        );
        tokio::time::sleep(pause).await;
    }
}

/// Whether a later attempt could succeed.
pub fn is_transient(error: &Error) -> bool {
    match error {
        Error::NotReachable { .. } => true,
        Error::Request(e) => e.is_timeout() || e.is_connect(),
        Error::Api { status, .. } => *status >= 500,
        _ => false,
    }
}
