//! What callers send to the orchestrator and what they get back.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use stride_core::{AgentOutput, DomainId, ExperimentAssignment, FallbackLevel, OrchestrationType, Tip};
use stride_detectors::{CatchUpWeek, ComebackWindow, EnergyTrend, LowCapacitySignal};
use stride_guardian::ValidationResult;

use crate::algorithms::AlgorithmInsights;

/// Per-request switches. Unset fields fall back to configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_full_orchestration: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Experiments to evaluate, in precedence order. `None` uses the
    /// configured defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_ids: Option<Vec<String>>,
}

/// One tip request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationRequest {
    pub domain: DomainId,
    pub user_id: String,

    /// Live data deep-merged over the stored snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_override: Option<Value>,

    #[serde(default)]
    pub options: RequestOptions,
}

impl OrchestrationRequest {
    pub fn new(domain: DomainId, user_id: impl Into<String>) -> Self {
        Self {
            domain,
            user_id: user_id.into(),
            context_override: None,
            options: RequestOptions::default(),
        }
    }

    pub fn with_override(mut self, overlay: Value) -> Self {
        self.context_override = Some(overlay);
        self
    }

    pub fn with_full_orchestration(mut self, enabled: bool) -> Self {
        self.options.enable_full_orchestration = Some(enabled);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.options.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_experiments(mut self, ids: Vec<String>) -> Self {
        self.options.experiment_ids = Some(ids);
        self
    }
}

/// Everything the pipeline learned on the way to the tip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_debt: Option<LowCapacitySignal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comeback: Option<ComebackWindow>,

    #[serde(default)]
    pub catch_up_plan: Vec<CatchUpWeek>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_trend: Option<EnergyTrend>,

    #[serde(default)]
    pub agent_outputs: Vec<AgentOutput>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,

    #[serde(default)]
    pub experiments: Vec<ExperimentAssignment>,
}

impl Insights {
    pub(crate) fn from_algorithms(algorithms: AlgorithmInsights) -> Self {
        Self {
            energy_debt: algorithms.energy_debt,
            comeback: algorithms.comeback,
            catch_up_plan: algorithms.catch_up_plan,
            energy_trend: algorithms.energy_trend,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingInfo {
    pub agents_used: Vec<String>,
    pub fallback_level: FallbackLevel,
    pub duration_ms: u64,
    pub orchestration_type: OrchestrationType,
    /// Whether diagnostics were recorded for this call.
    pub sampled: bool,
}

/// The orchestrator's answer. Always carries a well-formed tip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationResult {
    pub tip: Tip,
    pub insights: Insights,
    pub processing_info: ProcessingInfo,
}
