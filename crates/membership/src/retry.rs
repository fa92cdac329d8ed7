//! Retry with exponential backoff for transient directory errors.
//!
//! Only errors whose category is retryable (network failures, 5xx, 429) are
//! retried by [`with_retry`]. A 404 or any other client error is returned on
//! the first attempt unless the caller opts in through [`with_retry_if`].

use crate::error::{Error, Result};
use std::thread;
use std::time::Duration;

/// Retry configuration for directory requests.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
    /// Upper bound for a single delay
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Create a retry config with custom attempts and base delay.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            ..Default::default()
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Create a config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

/// Execute `operation`, retrying retryable errors with exponential backoff.
///
/// `what` names the request in log messages. Returns the first success, the
/// first non-retryable error, or the last error once attempts run out.
pub fn with_retry<T, F>(config: &RetryConfig, what: &str, operation: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    with_retry_if(config, what, Error::is_retryable, operation)
}

/// Like [`with_retry`], but `should_retry` decides which errors are retried.
pub fn with_retry_if<T, F, P>(
    config: &RetryConfig,
    what: &str,
    should_retry: P,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
    P: Fn(&Error) -> bool,
{
    let mut last_error: Option<Error> = None;

    for attempt in 0..config.max_attempts {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !should_retry(&e) || attempt + 1 >= config.max_attempts {
                    return Err(e);
                }

                let delay = config.delay_for_attempt(attempt);
                log::warn!(
                    "{what}: attempt {}/{} failed: {e}. Retrying in {}ms",
                    attempt + 1,
                    config.max_attempts,
                    delay.as_millis()
                );
                thread::sleep(delay);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::Other("retry exhausted".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
            max_delay: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_delay_for_attempt_backs_off_and_caps() {
        let config = RetryConfig {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(5),
        };
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(5));
    }

    #[test]
    fn test_not_found_is_not_retried() {
        let attempts = Cell::new(0);
        let result: Result<()> = with_retry(&fast(), "delete", || {
            attempts.set(attempts.get() + 1);
            Err(Error::not_found("user u1"))
        });
        assert!(result.unwrap_err().is_not_found());
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_server_error_retried_until_success() {
        let attempts = Cell::new(0);
        let result = with_retry(&fast(), "list", || {
            attempts.set(attempts.get() + 1);
            if attempts.get() < 3 {
                Err(Error::http("HTTP 503", Some(503)))
            } else {
                Ok(7)
            }
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let attempts = Cell::new(0);
        let result: Result<()> = with_retry(&fast(), "list", || {
            attempts.set(attempts.get() + 1);
            Err(Error::http("connection reset", None))
        });
        assert!(result.is_err());
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_custom_predicate_retries_not_found() {
        let attempts = Cell::new(0);
        let result = with_retry_if(
            &fast(),
            "list users",
            |e: &Error| e.is_not_found(),
            || {
                attempts.set(attempts.get() + 1);
                if attempts.get() < 2 {
                    Err(Error::not_found("application 0oa1"))
                } else {
                    Ok("page")
                }
            },
        );
        assert_eq!(result.unwrap(), "page");
        assert_eq!(attempts.get(), 2);
    }

    #[test]
    fn test_no_retry_config() {
        let config = RetryConfig::no_retry();
        assert_eq!(config.max_attempts, 1);
        assert_eq!(RetryConfig::new(0, Duration::ZERO).max_attempts, 1);
    }
}
