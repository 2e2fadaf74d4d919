//! The Stride tip pipeline.
//!
//! A request for a tip on one [`DomainId`](stride_core::DomainId) flows
//! through the domain's [`Strategy`], the agents it names, the guardian and
//! finally the text generator:
//!
//! 1. **Load** the user's context and merge any live override
//! 2. **Analyse** it with the detectors (always)
//! 3. **Ask** the domain's agents for recommendations
//! 4. **Validate** the best recommendation with the guardian
//! 5. **Generate** the tip, or fall back to detector output or a static tip
//!
//! Each step has a time slice. Whatever goes wrong, [`Orchestrator::run`]
//! returns a well-formed tip and reports how far it degraded.

pub mod algorithms;
pub mod local_agents;
pub mod orchestrator;
pub mod request;
pub mod strategy;
pub mod tip_parse;
pub mod warmup;

#[cfg(test)]
mod test_helpers;

pub use algorithms::{AlgorithmInsights, algorithm_tip, analyse};
pub use local_agents::LocalAgents;
pub use orchestrator::{Orchestrator, OrchestratorBuilder, OrchestratorSettings};
pub use request::{Insights, OrchestrationRequest, OrchestrationResult, ProcessingInfo, RequestOptions};
pub use strategy::{Strategy, StrategyRegistry};
pub use tip_parse::parse_tip;
pub use warmup::{WarmupReport, prefetch, warmup};
