/*!
 * Synchronous fallback between two interchangeable backends.
 */

use async_trait::async_trait;
use log::warn;

use crate::errors::BackendError;

use super::Backend;

/// Tries `primary` first and, when it fails, `secondary`
#[derive(Debug)]
pub struct FallbackBackend<P, S> {
    id: String,
    primary: P,
    secondary: S,
}

impl<P: Backend, S: Backend> FallbackBackend<P, S> {
    /// Combine two backends; the id is `primary+secondary`
    pub fn new(primary: P, secondary: S) -> Self {
        let id = format!("{}+{}", primary.id(), secondary.id());
        Self {
            id,
            primary,
            secondary,
        }
    }
}

#[async_trait]
impl<P: Backend, S: Backend> Backend for FallbackBackend<P, S> {
    fn id(&self) -> &str {
        &self.id
    }

    async fn translate(&self, text: &str) -> Result<String, BackendError> {
        match self.primary.translate(text).await {
            Ok(translated) if !translated.trim().is_empty() => Ok(translated),
            Ok(_) => {
                warn!("{} returned nothing, falling back to {}", self.primary.id(), self.secondary.id());
                self.secondary.translate(text).await
            }
            Err(e) => {
                warn!("{} failed ({}), falling back to {}", self.primary.id(), e, self.secondary.id());
                self.secondary.translate(text).await
            }
        }
    }
}
