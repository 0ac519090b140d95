//! Text-generation providers.
//!
//! Every provider honours the same two-field contract: a prompt plus a
//! [`GenerationRequest`] carrying the system instruction. Text comes back on
//! success; any failure is an error the controller turns into a fallback.

pub mod fallback;
pub mod gemini;
pub mod ollama;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::chat::core::config::{GenerationConfig, GenerationProvider};
use crate::chat::core::errors::ChatResult;

pub use fallback::{EMPTY_REPLY_TEXT, FallbackResponses};
pub use gemini::GeminiGenerator;
pub use ollama::OllamaGenerator;

/// Boxed future type for generation calls.
pub type GenerateFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Per-call options sent alongside the prompt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Persona instruction for the model.
    pub system_instruction: String,
}

impl GenerationRequest {
    /// Build a request carrying `system_instruction`.
    #[must_use]
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
        }
    }
}

/// Trait abstraction over text-generation services.
pub trait TextGenerator: Send + Sync {
    /// Generate a reply for `prompt`.
    ///
    /// # Errors
    /// Returns an error if the request fails or the response carries no text.
    fn generate(
        &self,
        prompt: &str,
        request: &GenerationRequest,
    ) -> GenerateFuture<'_, ChatResult<String>>;

    /// Provider label for logs.
    fn name(&self) -> &str;
}

/// Build the provider selected by configuration.
///
/// # Errors
/// Returns an error if the provider cannot be constructed.
pub fn build_generator(config: &GenerationConfig) -> ChatResult<Arc<dyn TextGenerator>> {
    match config.provider {
        GenerationProvider::Gemini => Ok(Arc::new(GeminiGenerator::new(config)?)),
        GenerationProvider::Ollama => Ok(Arc::new(OllamaGenerator::new(config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::core::errors::ChatError;

    #[test]
    fn test_build_gemini_requires_key() {
        let config = GenerationConfig::default();
        assert!(matches!(
            build_generator(&config),
            Err(ChatError::MissingApiKey(_))
        ));
    }

    #[test]
    fn test_build_gemini_with_key() {
        let config = GenerationConfig {
            api_key: Some("key".to_string()),
            ..GenerationConfig::default()
        };
        let generator = build_generator(&config).unwrap();
        assert_eq!(generator.name(), "gemini");
    }
}
