//! Thread-safe bounded trace recorder.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::RwLock;
use stride_core::{DiagnosticsSink, OrchestrationTrace};

/// Default number of traces kept in memory.
pub const DEFAULT_CAPACITY: usize = 1_000;

/// Aggregate view over every trace recorded since creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceSummary {
    /// Traces recorded, including evicted ones.
    pub total: u64,
    /// Traces still held in memory.
    pub retained: usize,
    /// Count per fallback level, index = level.
    pub by_level: [u64; 4],
    pub errors: u64,
    pub mean_duration_ms: f64,
}

#[derive(Debug, Default)]
struct RunningTotals {
    total: u64,
    by_level: [u64; 4],
    errors: u64,
    duration_ms_sum: u128,
}

/// In-memory diagnostics store. The oldest trace is evicted once
/// `capacity` is reached.
pub struct TraceRecorder {
    capacity: usize,
    traces: RwLock<VecDeque<OrchestrationTrace>>,
    totals: RwLock<RunningTotals>,
}

impl Default for TraceRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TraceRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceRecorder")
            .field("capacity", &self.capacity)
            .field("retained", &self.len())
            .finish()
    }
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A zero capacity is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            traces: RwLock::new(VecDeque::with_capacity(capacity)),
            totals: RwLock::new(RunningTotals::default()),
        }
    }

    /// Most recent traces first.
    pub fn recent(&self, limit: usize) -> Vec<OrchestrationTrace> {
        let traces = self.traces.read().unwrap();
        traces.iter().rev().take(limit).cloned().collect()
    }

    /// Traces held in memory.
    pub fn len(&self) -> usize {
        self.traces.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summary(&self) -> TraceSummary {
        let totals = self.totals.read().unwrap();
        let mean_duration_ms = if totals.total == 0 {
            0.0
        } else {
            totals.duration_ms_sum as f64 / totals.total as f64
        };
        TraceSummary {
            total: totals.total,
            retained: self.len(),
            by_level: totals.by_level,
            errors: totals.errors,
            mean_duration_ms,
        }
    }
}

impl DiagnosticsSink for TraceRecorder {
    fn record(&self, trace: &OrchestrationTrace) {
        {
            let mut totals = self.totals.write().unwrap();
            totals.total += 1;
            let level = usize::from(trace.fallback_level.value()).min(3);
            totals.by_level[level] += 1;
            if trace.had_error() {
                totals.errors += 1;
            }
            totals.duration_ms_sum += u128::from(trace.duration_ms);
        }

        let mut traces = self.traces.write().unwrap();
        if traces.len() >= self.capacity {
            traces.pop_front();
        }
        traces.push_back(trace.clone());
    }
}
