/*!
 * Retry policy shared by every backend adapter.
 *
 * Each attempt runs under a timeout; transient failures are retried after a
 * fixed delay up to a fixed number of attempts, terminal failures are
 * returned at once.
 */

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};

use crate::errors::BackendError;

use super::Backend;

/// Attempt bound, delay and per-attempt timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Pause between two attempts
    pub delay: Duration,
    /// Upper bound for a single attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(90),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt
    pub fn no_retry(attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
            attempt_timeout,
        }
    }

    /// Run `attempt` until it succeeds, fails terminally or the attempts run out
    pub async fn run<T, F, Fut>(&self, label: &str, mut attempt: F) -> Result<T, BackendError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut number = 0;

        loop {
            number += 1;
            let result = match tokio::time::timeout(self.attempt_timeout, attempt()).await {
                Ok(result) => result,
                Err(_) => Err(BackendError::Timeout(self.attempt_timeout)),
            };

            let error = match result {
                Ok(value) => {
                    if number > 1 {
                        debug!("{} succeeded on attempt {}/{}", label, number, max_attempts);
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !error.is_transient() {
                return Err(error);
            }
            if number >= max_attempts {
                return Err(if max_attempts == 1 {
                    error
                } else {
                    BackendError::RetriesExhausted {
                        attempts: number,
                        last: Box::new(error),
                    }
                });
            }

            warn!(
                "{} failed (attempt {}/{}): {}, retrying in {:?}",
                label, number, max_attempts, error, self.delay
            );
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Applies a [`RetryPolicy`] to any backend
#[derive(Debug)]
pub struct Retrying<B> {
    inner: B,
    policy: RetryPolicy,
}

impl<B: Backend> Retrying<B> {
    /// Wrap `inner`
    pub fn new(inner: B, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// The wrapped backend
    pub fn inner(&self) -> &B {
        &self.inner
    }
}

#[async_trait]
impl<B: Backend> Backend for Retrying<B> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn translate(&self, text: &str) -> Result<String, BackendError> {
        let inner = &self.inner;
        self.policy
            .run(inner.id(), move || inner.translate(text))
            .await
    }
}
