//! Experiment assignment and diagnostics sampling.
//!
//! The chain is pure from end to end:
//!
//! ```text
//! hash(experiment_id, user_id) ──▶ variant ──▶ ConfigFragment
//!                                                   │
//!   defaults ─▶ app config ─▶ fragments (request order) ─▶ request options
//!                                                   │
//!                                            EffectiveConfig
//! ```
//!
//! Concurrent evaluations for the same (user, experiment) agree without any
//! shared state. Sampling is the one place randomness enters, and it only
//! decides whether diagnostics are recorded.

pub mod assignment;
pub mod catalog;
pub mod sampling;

pub use assignment::{assign_variant, bucket};
pub use catalog::{
    ConfigFragment, EffectiveConfig, Experiment, ExperimentCatalog, ExperimentSelection,
    ExperimentSource, Variant,
};
pub use sampling::{SamplingInput, SamplingPolicy};

/// Errors from the experiment subsystem.
#[derive(Debug, thiserror::Error)]
pub enum ExperimentError {
    #[error("invalid experiment '{id}': {reason}")]
    InvalidExperiment { id: String, reason: String },

    #[error("duplicate experiment id '{0}'")]
    DuplicateId(String),
}
