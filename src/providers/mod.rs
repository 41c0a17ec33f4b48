/*!
 * Backend implementations for different translation services.
 *
 * This module contains client implementations for the supported backends:
 * - Ollama: Local LLM server
 * - DeepSeek: OpenAI-compatible chat completions API
 * - Mock: Scripted backend for tests and benchmarks
 *
 * plus the retry policy every adapter runs its requests through and a
 * fallback combinator.
 */

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::app_config::{BackendKind, Config};
use crate::errors::BackendError;

/// Common trait for all translation backends
///
/// Implementations must be usable interchangeably by the translation
/// pipeline. Retrying transient failures is the adapter's job.
#[async_trait]
pub trait Backend: Send + Sync + Debug {
    /// Stable identifier, also used to select the cache table
    fn id(&self) -> &str;

    /// Translate `text` into the configured target language
    async fn translate(&self, text: &str) -> Result<String, BackendError>;
}

#[async_trait]
impl<T: Backend + ?Sized> Backend for Arc<T> {
    fn id(&self) -> &str {
        (**self).id()
    }

    async fn translate(&self, text: &str) -> Result<String, BackendError> {
        (**self).translate(text).await
    }
}

/// Build the backend selected in `config`
pub fn build_backend(config: &Config) -> Result<Arc<dyn Backend>, BackendError> {
    let backend: Arc<dyn Backend> = match config.translation.backend {
        BackendKind::Ollama => Arc::new(ollama::Ollama::from_config(config)?),
        BackendKind::DeepSeek => Arc::new(deepseek::DeepSeek::from_config(config)?),
    };
    Ok(backend)
}

/// Map a non-success HTTP status to a backend error
pub(crate) fn classify_status(status: reqwest::StatusCode, body: String) -> BackendError {
    match status.as_u16() {
        401 | 403 => BackendError::AuthenticationError(body),
        code => BackendError::ApiError {
            status_code: code,
            message: body,
        },
    }
}

/// Map a transport error to a backend error
pub(crate) fn from_reqwest(error: reqwest::Error) -> BackendError {
    if error.is_connect() {
        BackendError::ConnectionError(error.to_string())
    } else if error.is_decode() {
        BackendError::ParseError(error.to_string())
    } else {
        BackendError::RequestFailed(error.to_string())
    }
}

static THINK_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

/// Remove reasoning blocks emitted by reasoning models and trim the result
pub(crate) fn clean_response(text: &str) -> String {
    THINK_BLOCK.replace_all(text, "").trim().to_string()
}

/// Substitute the `{target_language}` and `{text}` placeholders
pub(crate) fn render_prompt(template: &str, target_language: &str, text: &str) -> String {
    template
        .replace("{target_language}", target_language)
        .replace("{text}", text)
}

/// Display name of a language code, or the code itself
pub(crate) fn language_display_name(code: &str) -> String {
    crate::language_utils::get_language_name(code).unwrap_or_else(|_| code.to_string())
}

pub mod deepseek;
pub mod fallback;
pub mod mock;
pub mod ollama;
pub mod retry;
