//! Gemini REST provider.
//!
//! Calls `POST {base}/v1beta/models/{model}:generateContent` with the API key
//! in the `x-goog-api-key` header, one user turn, and the system instruction.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chat::core::config::GenerationConfig;
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::generation::{GenerateFuture, GenerationRequest, TextGenerator};

/// Public Gemini endpoint.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bytes of an error body kept in [`ChatError::HttpStatus`].
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationOptions {
    temperature: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationOptions,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Gemini client bound to one model and API key.
pub struct GeminiGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
    temperature: f64,
}

impl GeminiGenerator {
    /// Create a Gemini client from config.
    ///
    /// # Errors
    /// Returns an error if no API key is configured or the HTTP client cannot be built.
    pub fn new(config: &GenerationConfig) -> ChatResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ChatError::MissingApiKey("gemini".to_string()))?;

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_GEMINI_BASE_URL)
            .trim_end_matches('/');
        let endpoint = format!(
            "{base_url}/v1beta/models/{}:generateContent",
            config.model
        );

        Ok(Self {
            client,
            endpoint,
            api_key,
            temperature: config.temperature,
        })
    }

    async fn post_generate(&self, prompt: &str, system_instruction: &str) -> ChatResult<String> {
        let system_instruction = (!system_instruction.is_empty()).then(|| Content {
            role: None,
            parts: vec![Part {
                text: system_instruction,
            }],
        });
        let body = GenerateContentRequest {
            system_instruction,
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::HttpStatus {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        extract_text(parsed)
    }
}

impl TextGenerator for GeminiGenerator {
    fn generate(
        &self,
        prompt: &str,
        request: &GenerationRequest,
    ) -> GenerateFuture<'_, ChatResult<String>> {
        let prompt = prompt.to_string();
        let system_instruction = request.system_instruction.clone();
        Box::pin(async move {
            debug!("Gemini request with {} prompt chars", prompt.chars().count());
            self.post_generate(&prompt, &system_instruction).await
        })
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: GenerateContentResponse) -> ChatResult<String> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ChatError::MalformedResponse("no candidates".to_string()))?;
    let content = candidate
        .content
        .ok_or_else(|| ChatError::MalformedResponse("candidate without content".to_string()))?;

    let texts: Vec<String> = content.parts.into_iter().filter_map(|p| p.text).collect();
    if texts.is_empty() {
        return Err(ChatError::MalformedResponse(
            "candidate without text parts".to_string(),
        ));
    }
    Ok(texts.concat())
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};

    use super::*;

    fn config_for(base_url: Option<String>) -> GenerationConfig {
        GenerationConfig {
            api_key: Some("test-key".to_string()),
            base_url,
            timeout_secs: 5,
            ..GenerationConfig::default()
        }
    }

    async fn spawn_fake(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        addr
    }

    #[test]
    fn test_extract_text_concatenates_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Salom"},{"text":", dunyo"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "Salom, dunyo");
    }

    #[test]
    fn test_extract_text_without_candidates() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert!(matches!(
            extract_text(response),
            Err(ChatError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_request_body_shape() {
        let body = GenerateContentRequest {
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part { text: "be brief" }],
            }),
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: "hi" }],
            }],
            generation_config: GenerationOptions { temperature: 0.5 },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(value["generationConfig"]["temperature"], 0.5);
    }

    #[test]
    fn test_endpoint_uses_model_and_base() {
        let generator =
            GeminiGenerator::new(&config_for(Some("http://localhost:9/".to_string()))).unwrap();
        assert_eq!(
            generator.endpoint,
            "http://localhost:9/v1beta/models/gemini-3-flash-preview:generateContent"
        );
    }

    #[tokio::test]
    async fn test_generate_against_fake_server() {
        let router = Router::new().route(
            "/v1beta/models/{action}",
            post(
                |headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                    assert_eq!(headers["x-goog-api-key"], "test-key");
                    let prompt = body["contents"][0]["parts"][0]["text"]
                        .as_str()
                        .unwrap_or_default()
                        .to_string();
                    Json(serde_json::json!({
                        "candidates": [{"content": {"parts": [{"text": format!("echo: {prompt}")}]}}]
                    }))
                },
            ),
        );
        let addr = spawn_fake(router).await;
        let generator = GeminiGenerator::new(&config_for(Some(format!("http://{addr}")))).unwrap();

        let reply = generator
            .generate("salom", &GenerationRequest::new("be brief"))
            .await
            .unwrap();
        assert_eq!(reply, "echo: salom");
    }

    #[tokio::test]
    async fn test_generate_maps_error_status() {
        let router = Router::new().route(
            "/v1beta/models/{action}",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "quota exhausted") }),
        );
        let addr = spawn_fake(router).await;
        let generator = GeminiGenerator::new(&config_for(Some(format!("http://{addr}")))).unwrap();

        let err = generator
            .generate("salom", &GenerationRequest::default())
            .await
            .unwrap_err();
        match err {
            ChatError::HttpStatus { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "quota exhausted");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
