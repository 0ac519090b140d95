//! Local Ollama provider through Rig.

use std::time::Duration;

use reqwest::Client as ReqwestClient;
use rig::client::CompletionClient;
use rig::completion::CompletionModel;
use rig::message::AssistantContent;
use rig::providers::ollama;
use tracing::debug;

use crate::chat::core::config::GenerationConfig;
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::generation::{GenerateFuture, GenerationRequest, TextGenerator};

/// Ollama completion model wrapper.
pub struct OllamaGenerator {
    model: ollama::CompletionModel,
    temperature: f64,
    timeout: Duration,
}

impl OllamaGenerator {
    /// Create a new Ollama generator from config.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the client cannot be built.
    pub fn new(config: &GenerationConfig) -> ChatResult<Self> {
        let builder = ollama::Client::<ReqwestClient>::builder().api_key(rig::client::Nothing);
        let builder = if let Some(base_url) = &config.base_url {
            builder.base_url(base_url)
        } else {
            builder
        };
        let client = builder.build().map_err(ChatError::from)?;
        let model = client.completion_model(config.model.clone());

        Ok(Self {
            model,
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

impl TextGenerator for OllamaGenerator {
    fn generate(
        &self,
        prompt: &str,
        request: &GenerationRequest,
    ) -> GenerateFuture<'_, ChatResult<String>> {
        let prompt = prompt.to_string();
        let preamble = request.system_instruction.clone();
        Box::pin(async move {
            debug!("Ollama request with {} prompt chars", prompt.chars().count());

            let request = self
                .model
                .completion_request(prompt)
                .preamble(preamble)
                .temperature(self.temperature)
                .build();

            let response = tokio::time::timeout(self.timeout, self.model.completion(request))
                .await
                .map_err(|_| ChatError::Timeout {
                    provider: "ollama".to_string(),
                    secs: self.timeout.as_secs(),
                })??;
            let text = extract_text(&response.choice);
            if text.is_empty() {
                return Err(ChatError::MalformedResponse(
                    "ollama returned no text content".to_string(),
                ));
            }
            Ok(text)
        })
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Extract text from assistant response.
fn extract_text(choice: &rig::OneOrMany<AssistantContent>) -> String {
    let mut out = String::new();
    for content in choice.iter() {
        if let AssistantContent::Text(text) = content {
            out.push_str(&text.text);
        }
    }
    out
}
