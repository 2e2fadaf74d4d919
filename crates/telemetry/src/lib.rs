//! Diagnostics sinks for the Stride tip pipeline.
//!
//! The orchestrator hands each sampled [`OrchestrationTrace`] to a
//! [`DiagnosticsSink`]. This crate provides:
//!
//! - [`TraceRecorder`]: bounded in-memory store with summary statistics
//! - [`TracingDiagnosticsSink`]: emits each trace as a structured log event
//! - [`FanoutSink`]: forwards to several sinks
//!
//! [`OrchestrationTrace`]: stride_core::OrchestrationTrace
//! [`DiagnosticsSink`]: stride_core::DiagnosticsSink

pub mod recorder;
pub mod sinks;

pub use recorder::{TraceRecorder, TraceSummary};
pub use sinks::{FanoutSink, TracingDiagnosticsSink};
