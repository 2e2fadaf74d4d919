//! Log-based and composite diagnostics sinks.

use std::sync::Arc;
use stride_core::{DiagnosticsSink, OrchestrationTrace};

/// Emits every trace as one structured `info!` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnosticsSink;

impl DiagnosticsSink for TracingDiagnosticsSink {
    fn record(&self, trace: &OrchestrationTrace) {
        let experiments = trace
            .experiments
            .iter()
            .map(|a| format!("{}={}", a.experiment_id, a.variant))
            .collect::<Vec<_>>()
            .join(",");
        let faults = serde_json::to_string(&trace.faults).unwrap_or_default();

        tracing::info!(
            trace_id = %trace.id,
            user_id = %trace.user_id,
            domain = %trace.domain,
            fallback_level = trace.fallback_level.value(),
            orchestration_type = %trace.orchestration_type,
            duration_ms = trace.duration_ms,
            agents = %trace.agents_used.join(","),
            experiments = %experiments,
            faults = %faults,
            error = trace.error.as_deref().unwrap_or(""),
            reason = ?trace.sample_reason,
            "Orchestration trace"
        );
    }
}

/// Forwards each trace to every inner sink, in order.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn DiagnosticsSink>>,
}

impl std::fmt::Debug for FanoutSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutSink")
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn DiagnosticsSink>>) -> Self {
        Self { sinks }
    }

    pub fn with(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl DiagnosticsSink for FanoutSink {
    fn record(&self, trace: &OrchestrationTrace) {
        for sink in &self.sinks {
            sink.record(trace);
        }
    }
}
