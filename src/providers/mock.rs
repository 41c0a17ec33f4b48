/*!
 * Mock backend implementations for testing.
 *
 * This module provides a mock backend that simulates different behaviors:
 * - `MockBackend::working()` - Always succeeds with translated text
 * - `MockBackend::fail_first(n)` - Fails transiently n times, then succeeds
 * - `MockBackend::failing()` - Always fails with a transient error
 * - `MockBackend::terminal()` - Always fails with a non-retryable error
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::BackendError;
use crate::providers::Backend;

/// Behavior mode for the mock backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Fails transiently for the first `failures` requests, then succeeds
    FailFirst { failures: usize },
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with a transient error
    Failing,
    /// Always fails with an authentication error
    Terminal,
    /// Returns empty response
    Empty,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock backend for testing translation behavior
#[derive(Debug)]
pub struct MockBackend {
    /// Backend id
    id: String,
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Texts received, in order, shared between clones
    calls: Arc<Mutex<Vec<String>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&str) -> String>,
}

impl MockBackend {
    /// Create a new mock backend with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            id: "mock".to_string(),
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
        }
    }

    /// Create a working mock backend that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a mock backend failing transiently `failures` times before succeeding
    pub fn fail_first(failures: usize) -> Self {
        Self::new(MockBehavior::FailFirst { failures })
    }

    /// Create an intermittently failing mock backend
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a failing mock backend that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock backend whose failures are never worth retrying
    pub fn terminal() -> Self {
        Self::new(MockBehavior::Terminal)
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that answers after `delay_ms`
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Use a different backend id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&str) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Texts received so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// The default translation of `text`
    pub fn translated(text: &str) -> String {
        format!("[TRANSLATED] {}", text)
    }

    fn respond(&self, text: &str) -> String {
        match self.custom_response {
            Some(generator) => generator(text),
            None => Self::translated(text),
        }
    }
}

impl Clone for MockBackend {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            calls: Arc::clone(&self.calls),
            custom_response: self.custom_response,
        }
    }
}

fn transient(message: String) -> BackendError {
    BackendError::ApiError {
        status_code: 503,
        message,
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn id(&self) -> &str {
        &self.id
    }

    async fn translate(&self, text: &str) -> Result<String, BackendError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push(text.to_string());

        match self.behavior {
            MockBehavior::Working => Ok(self.respond(text)),

            MockBehavior::FailFirst { failures } => {
                if count < failures {
                    Err(transient(format!("Simulated failure (request #{})", count + 1)))
                } else {
                    Ok(self.respond(text))
                }
            }

            MockBehavior::Intermittent { fail_every } => {
                let fail_every = fail_every.max(1);
                if count % fail_every == fail_every - 1 {
                    Err(transient(format!(
                        "Simulated intermittent failure (request #{})",
                        count + 1
                    )))
                } else {
                    Ok(self.respond(text))
                }
            }

            MockBehavior::Failing => Err(transient("Simulated backend failure".to_string())),

            MockBehavior::Terminal => Err(BackendError::AuthenticationError(
                "Simulated invalid credentials".to_string(),
            )),

            MockBehavior::Empty => Ok(String::new()),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(self.respond(text))
            }
        }
    }
}
