//! Agent execution trait: per-agent analysis of a context.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::AgentError;

/// What an agent concluded about a context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    pub agent_id: String,
    pub recommendation: String,
    /// Self-reported confidence, clamped to `[0, 1]`.
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

impl AgentOutput {
    pub fn new(agent_id: impl Into<String>, recommendation: impl Into<String>, confidence: f64) -> Self {
        Self {
            agent_id: agent_id.into(),
            recommendation: recommendation.into(),
            confidence: confidence.clamp(0.0, 1.0),
            data: serde_json::Value::Null,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// Runs a named analysis agent against a context.
///
/// Implementations must be cheap to share: the orchestrator holds them
/// behind an `Arc` and calls them from spawned tasks.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    async fn execute(&self, agent_id: &str, context: &Context) -> Result<AgentOutput, AgentError>;
}
