//! Diagnostics sink trait: best-effort recording of pipeline traces.
//!
//! Recording must never block or fail a call, so [`DiagnosticsSink::record`]
//! is synchronous and returns nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::DomainId;
use crate::pipeline::{
    ExperimentAssignment, FallbackLevel, OrchestrationType, PipelineFault, SampleReason,
};

/// Detailed record of one orchestrator call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationTrace {
    pub id: String,
    pub user_id: String,
    pub domain: DomainId,
    pub fallback_level: FallbackLevel,
    pub orchestration_type: OrchestrationType,
    pub duration_ms: u64,
    pub agents_used: Vec<String>,
    pub faults: Vec<PipelineFault>,
    /// Set when the root catch-all absorbed an error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub experiments: Vec<ExperimentAssignment>,
    pub sample_reason: SampleReason,
    pub recorded_at: DateTime<Utc>,
}

impl OrchestrationTrace {
    pub fn new(user_id: impl Into<String>, domain: DomainId, sample_reason: SampleReason) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            domain,
            fallback_level: FallbackLevel::FULL,
            orchestration_type: OrchestrationType::Full,
            duration_ms: 0,
            agents_used: Vec::new(),
            faults: Vec::new(),
            error: None,
            experiments: Vec::new(),
            sample_reason,
            recorded_at: Utc::now(),
        }
    }

    pub fn had_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Where sampled traces go.
pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, trace: &OrchestrationTrace);
}

/// A sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticsSink for NullSink {
    fn record(&self, _trace: &OrchestrationTrace) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trace_starts_clean() {
        let trace = OrchestrationTrace::new("u1", DomainId::Goals, SampleReason::Random);
        assert!(!trace.id.is_empty());
        assert!(!trace.had_error());
        assert_eq!(trace.fallback_level, FallbackLevel::FULL);
    }
}
