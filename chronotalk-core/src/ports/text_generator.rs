//! Generative-text provider port
//!
//! Defines the interface for turning a prompt into text. Prompt wording,
//! deadlines and fallbacks live in the AssistantService; providers only
//! perform a single request/response call.

use async_trait::async_trait;

use crate::domain::result::Result;

/// Generative-text provider trait
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Provider name (e.g., "gemini")
    fn name(&self) -> &str;

    /// Generate text for a prompt
    ///
    /// Returns `Ok(None)` when the provider answered without any text.
    async fn generate(&self, prompt: &str) -> Result<Option<String>>;
}
