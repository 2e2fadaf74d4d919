//! OpenAI-compatible text generator.
//!
//! Works with OpenAI, OpenRouter, Ollama, vLLM and any endpoint exposing
//! `/chat/completions`. Asks for a JSON object response; the orchestrator
//! owns parsing it into a tip.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use stride_config::GenerationConfig;
use stride_core::{GenerationError, GenerationRequest, TextGenerator};
use tracing::{debug, warn};

/// A generator backed by an OpenAI-compatible chat completions endpoint.
pub struct OpenAiCompatGenerator {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiCompatGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatGenerator")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiCompatGenerator {
    /// Create a new generator.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| GenerationError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }

    /// Create an OpenAI generator (convenience constructor).
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, GenerationError> {
        Self::new(
            "openai",
            "https://api.openai.com/v1",
            api_key,
            model,
            Duration::from_secs(30),
        )
    }

    /// Build from the `[generation]` config section. Requires an API key.
    pub fn from_config(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| GenerationError::NotConfigured("no API key configured".into()))?;
        Self::new(
            "openai_compat",
            &config.api_url,
            api_key,
            &config.model,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_body(&self, request: &GenerationRequest) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.user_prompt },
            ],
            "temperature": request.temperature,
            "response_format": { "type": "json_object" },
            "stream": false,
        })
    }
}

/// Pull the first choice's text out of a completions response body.
fn extract_content(body: &str) -> Result<String, GenerationError> {
    let api_response: ApiResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::ApiError {
            status_code: 200,
            message: format!("Failed to parse response: {e}"),
        })?;

    api_response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| GenerationError::ApiError {
            status_code: 200,
            message: "No content in response".into(),
        })
}

#[async_trait]
impl TextGenerator for OpenAiCompatGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(&request);

        debug!(generator = %self.name, model = %self.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(e.to_string())
                } else {
                    GenerationError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(GenerationError::RateLimited { retry_after_secs });
        }

        if status == 401 || status == 403 {
            return Err(GenerationError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        if status != 200 {
            warn!(status, body = %text, "Generator returned error");
            return Err(GenerationError::ApiError {
                status_code: status,
                message: text,
            });
        }

        extract_content(&text)
    }
}

// --- OpenAI API response types ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
}
