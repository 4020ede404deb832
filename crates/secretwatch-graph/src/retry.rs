//! Retry policy for throttled and transient Graph responses.
//!
//! 429 responses honour `Retry-After` when present; otherwise, and for
//! 502/503/504, the delay grows exponentially with jitter.

use std::time::Duration;
use tracing::warn;

/// Backoff configuration shared by throttling and transient-error retries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Base delay for exponential backoff in milliseconds (default: 1000ms).
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds (default: 60000ms).
    pub max_delay_ms: u64,
    /// Jitter factor as a fraction of delay (default: 0.25 = 25%).
    pub jitter_factor: f64,
    /// Maximum retry attempts per request (default: 5).
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 60_000,
            jitter_factor: 0.25,
            max_retries: 5,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy optimized for testing (shorter delays).
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            base_delay_ms: 10,
            max_delay_ms: 100,
            jitter_factor: 0.25,
            max_retries: 3,
        }
    }

    /// Validates the policy.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_delay_ms == 0 {
            return Err("base_delay_ms must be > 0".to_string());
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err("max_delay_ms must be >= base_delay_ms".to_string());
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err("jitter_factor must be in range [0.0, 1.0]".to_string());
        }
        Ok(())
    }

    /// Parses the Retry-After header value.
    ///
    /// Only the delay-seconds form is supported; HTTP-date values fall back
    /// to exponential backoff.
    #[must_use]
    pub fn parse_retry_after(header_value: &str) -> Option<u64> {
        header_value.trim().parse::<u64>().ok()
    }

    /// Calculates backoff delay with exponential growth: `base * 2^attempt`.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay_ms as f64;
        let max = self.max_delay_ms as f64;
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);

        let delay_ms = (base * 2_f64.powi(exponent)).min(max);

        Duration::from_millis(delay_ms as u64)
    }

    /// Adds jitter to a delay using the configured factor.
    #[must_use]
    pub fn add_jitter(&self, delay: Duration) -> Duration {
        use rand::Rng;

        let delay_ms = delay.as_millis() as f64;
        let jitter_range = delay_ms * self.jitter_factor;
        let jitter = rand::thread_rng().gen_range(0.0..=jitter_range);

        Duration::from_millis((delay_ms + jitter) as u64)
    }

    /// Delay before the next attempt.
    ///
    /// A server-provided `Retry-After` wins over backoff but is capped at
    /// `max_delay_ms`. Jitter is applied only to computed backoff.
    #[must_use]
    pub fn delay_for(&self, retry_after_secs: Option<u64>, attempt: u32) -> Duration {
        match retry_after_secs {
            Some(secs) => {
                let requested = Duration::from_secs(secs);
                let cap = Duration::from_millis(self.max_delay_ms);
                if requested > cap {
                    warn!(
                        "Retry-After {} seconds exceeds max, capping at {:?}",
                        secs, cap
                    );
                    cap
                } else {
                    requested
                }
            }
            None => self.add_jitter(self.backoff_delay(attempt)),
        }
    }
}
