//! Generation provider trait

use async_trait::async_trait;

use crate::error::Result;

/// Trait for the opaque text-completion service that turns a grounded
/// prompt into an answer. The service may be slow or rate-limited;
/// implementations are expected to bound each call with a timeout.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Complete a prompt, returning the raw text response
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model being used
    fn model(&self) -> &str;
}
