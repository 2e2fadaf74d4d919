//! Text generation trait: the abstraction over LLM backends.
//!
//! The orchestrator hands a system prompt, a formatted user prompt and a
//! sampling temperature to a generator and expects raw text back. Parsing
//! that text into a tip is the orchestrator's job, not the generator's.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// One generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_temperature() -> f32 {
    0.7
}

impl GenerationRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            temperature,
        }
    }
}

/// Turns a prompt into raw text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// A human-readable name for this generator (e.g., "openai", "scripted").
    fn name(&self) -> &str;

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;
}
