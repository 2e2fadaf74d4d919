//! Generator fallback: an ordered retry chain with per-generator timeouts.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use stride_config::GenerationConfig;
use stride_core::{GenerationError, GenerationRequest, TextGenerator};
use tracing::{info, warn};

use crate::openai_compat::OpenAiCompatGenerator;

/// Tries each generator in turn until one returns text.
pub struct FallbackGenerator {
    name: String,
    chain: Vec<FallbackEntry>,
}

struct FallbackEntry {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl FallbackGenerator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain: Vec::new(),
        }
    }

    /// Add a generator with its own timeout.
    pub fn add(mut self, generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        self.chain.push(FallbackEntry { generator, timeout });
        self
    }

    /// The configured model followed by each fallback model, all on the
    /// configured endpoint. Requires an API key.
    pub fn from_config(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let mut chain = Self::new("generation_chain")
            .add(Arc::new(OpenAiCompatGenerator::from_config(config)?), timeout);

        for model in &config.fallback_models {
            let fallback = GenerationConfig {
                model: model.clone(),
                ..config.clone()
            };
            chain = chain.add(Arc::new(OpenAiCompatGenerator::from_config(&fallback)?), timeout);
        }
        Ok(chain)
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

#[async_trait]
impl TextGenerator for FallbackGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let mut last_error = GenerationError::NotConfigured("No generators in fallback chain".into());

        for (i, entry) in self.chain.iter().enumerate() {
            let generator_name = entry.generator.name().to_string();

            info!(
                generator = %generator_name,
                attempt = i + 1,
                total = self.chain.len(),
                "Fallback: trying generator"
            );

            match tokio::time::timeout(entry.timeout, entry.generator.generate(request.clone())).await {
                Ok(Ok(text)) => return Ok(text),
                Ok(Err(e)) => {
                    warn!(generator = %generator_name, error = %e, "Fallback: generator failed, trying next");
                    last_error = e;
                }
                Err(_) => {
                    warn!(
                        generator = %generator_name,
                        timeout_ms = entry.timeout.as_millis() as u64,
                        "Fallback: generator timed out, trying next"
                    );
                    last_error = GenerationError::Timeout(format!(
                        "Generator '{}' timed out after {}ms",
                        generator_name,
                        entry.timeout.as_millis()
                    ));
                }
            }
        }

        Err(last_error)
    }
}
