//! # Stride Core
//!
//! Domain types, collaborator traits, and error definitions for the Stride
//! tip pipeline. It holds no I/O of its own and defines the
//! domain model that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external capability the pipeline consumes is a trait here:
//! - [`ContextStore`]: where user snapshots come from
//! - [`AgentExecutor`]: per-agent analysis of a context
//! - [`TextGenerator`]: turns a formatted prompt into a tip payload
//! - [`DiagnosticsSink`]: best-effort recording of pipeline traces
//!
//! Implementations live in their own crates, so the orchestrator can be
//! exercised end to end with in-process stubs.

pub mod agent;
pub mod context;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod generation;
pub mod pipeline;
pub mod store;
pub mod tip;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentExecutor, AgentOutput};
pub use context::{Context, EnergyEntry, Goal, InventoryItem, UserSnapshot};
pub use diagnostics::{DiagnosticsSink, NullSink, OrchestrationTrace};
pub use domain::DomainId;
pub use error::{AgentError, Error, GenerationError, Result, StoreError};
pub use generation::{GenerationRequest, TextGenerator};
pub use pipeline::{
    ExperimentAssignment, FallbackLevel, OrchestrationType, PipelineFault, SampleReason,
};
pub use store::ContextStore;
pub use tip::Tip;
