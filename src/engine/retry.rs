use std::future::Future;
use std::time::Duration;

use crate::error::{CadError, Result};
use crate::observe::Observer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    pub const fn single_attempt() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(CadError::Config(
                "Retry max_attempts must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Runs `operation` until it succeeds, fails with a non-transient error,
    /// or `max_attempts` calls have been made. The closure receives the
    /// 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, observer: &dyn Observer, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.validate()?;

        let mut attempt = 1;
        loop {
            let err = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_transient() {
                return Err(err);
            }
            if attempt >= self.max_attempts {
                observer.on_exhausted(attempt, &err);
                return Err(err);
            }

            observer.on_retry(attempt, self.max_attempts, self.delay, &err);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            attempt += 1;
        }
    }
}
