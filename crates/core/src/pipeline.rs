//! Pipeline bookkeeping types shared by the orchestrator and its sinks.

use serde::{Deserialize, Serialize};

/// Degradation tier, 0 (full pipeline) through 3 (static fallback).
///
/// The level can only be raised; [`FallbackLevel::raise`] ignores attempts
/// to lower it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FallbackLevel(u8);

impl FallbackLevel {
    pub const FULL: Self = Self(0);
    pub const PARTIAL: Self = Self(1);
    pub const ALGORITHMS: Self = Self(2);
    pub const STATIC: Self = Self(3);

    pub fn value(self) -> u8 {
        self.0
    }

    /// Raise to `to` if it is higher than the current level.
    pub fn raise(&mut self, to: FallbackLevel) {
        if to > *self {
            *self = to;
        }
    }

    pub fn orchestration_type(self) -> OrchestrationType {
        match self.0 {
            0 => OrchestrationType::Full,
            1 => OrchestrationType::Partial,
            2 => OrchestrationType::Algorithms,
            _ => OrchestrationType::Static,
        }
    }
}

impl std::fmt::Display for FallbackLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-facing name of the tier a call ended on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestrationType {
    Full,
    Partial,
    Algorithms,
    Static,
}

impl std::fmt::Display for OrchestrationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Partial => write!(f, "partial"),
            Self::Algorithms => write!(f, "algorithms"),
            Self::Static => write!(f, "static"),
        }
    }
}

/// Everything that can go wrong inside one call. None of these reach the
/// caller; they are absorbed and recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineFault {
    /// A stage exceeded its time slice.
    StageTimeout { stage: String, budget_ms: u64 },
    /// The text generator returned something that is not a tip.
    GenerationParseFailure { reason: String },
    /// A collaborator returned an error.
    CollaboratorFailure { collaborator: String, reason: String },
    /// The guardian rejected the candidate recommendation.
    ValidationBlocked { issues: Vec<String> },
}

/// Why a call's diagnostics were recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleReason {
    Error,
    Degraded,
    NewUser,
    Feedback,
    Random,
}

/// Which variant of an experiment a user landed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExperimentAssignment {
    pub experiment_id: String,
    pub variant: String,
}
