//! Bounded retry with exponential backoff.

use std::time::Duration;

use recodec_config::RetryConfig;

/// How many times to try a fallible step and how long to wait in between.
///
/// The delay before retry `n` (1-based) is `base * 2^(n-1)`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1 when used.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base: Duration,
    /// Upper bound on any single delay.
    pub max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base: Duration::from_millis(config.backoff_ms),
            max: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

impl RetryPolicy {
    /// A policy that tries once and never waits.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// `attempts` tries with no delay between them.
    pub fn immediate(attempts: u32) -> Self {
        Self {
            max_attempts: attempts,
            ..Self::none()
        }
    }

    /// Delay to wait before retry number `retry` (1 = first retry).
    pub fn delay(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(retry - 1).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Run `op` until it succeeds or the attempts are used up.
    ///
    /// `op` receives the 1-based attempt number. `on_failure` is told about
    /// every failed attempt that will be retried, along with the delay that
    /// follows. The last error is returned when every attempt fails.
    pub fn run<T, E>(
        &self,
        mut op: impl FnMut(u32) -> Result<T, E>,
        mut on_failure: impl FnMut(u32, &E, Duration),
    ) -> Result<T, E> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    let wait = self.delay(attempt);
                    on_failure(attempt, &e, wait);
                    if !wait.is_zero() {
                        std::thread::sleep(wait);
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base: Duration::from_millis(100),
            max: Duration::from_millis(500),
        };
        assert_eq!(policy.delay(0), Duration::ZERO);
        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(200));
        assert_eq!(policy.delay(3), Duration::from_millis(400));
        assert_eq!(policy.delay(4), Duration::from_millis(500));
        assert_eq!(policy.delay(64), Duration::from_millis(500));
    }

    #[test]
    fn from_config() {
        let policy = RetryPolicy::from(&RetryConfig {
            max_attempts: 4,
            backoff_ms: 10,
            max_backoff_ms: 80,
        });
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.base, Duration::from_millis(10));
        assert_eq!(policy.max, Duration::from_millis(80));
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let mut failures = Vec::new();
        let result: Result<u32, String> = RetryPolicy::immediate(3).run(
            |attempt| if attempt < 3 { Err(format!("fail {attempt}")) } else { Ok(attempt) },
            |attempt, e, _| failures.push((attempt, e.clone())),
        );
        assert_eq!(result, Ok(3));
        assert_eq!(failures, vec![(1, "fail 1".to_string()), (2, "fail 2".to_string())]);
    }

    #[test]
    fn returns_last_error_when_exhausted() {
        let mut calls = 0;
        let result: Result<(), u32> = RetryPolicy::immediate(4).run(
            |attempt| {
                calls += 1;
                Err(attempt)
            },
            |_, _, _| {},
        );
        assert_eq!(result, Err(4));
        assert_eq!(calls, 4);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let mut calls = 0;
        let _: Result<(), ()> = RetryPolicy::immediate(0).run(
            |_| {
                calls += 1;
                Err(())
            },
            |_, _, _| {},
        );
        assert_eq!(calls, 1);
    }
}
