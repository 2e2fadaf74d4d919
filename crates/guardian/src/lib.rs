//! # Stride Guardian
//!
//! The rule-based validation layer that can block or down-weight a candidate
//! recommendation before any tip is generated from it.
//!
//! ```text
//! candidate text ──▶ enabled rules ──▶ risk classifier ──▶ min-confidence gate
//!                    (feasibility,       (keywords)          (clamp to [0,1])
//!                     solvency,
//!                     realism,
//!                     timeline)
//! ```
//!
//! Each strategy declares which [`ValidationRule`]s apply to its domain; the
//! risk pass always runs.

pub mod risk;
pub mod rules;
pub mod validator;

pub use risk::{KeywordRiskClassifier, RiskAssessment, RiskClassifier, RiskLevel};
pub use rules::{GoalTimeline, GuardianInput, ValidationRule};
pub use validator::{Guardian, ValidationResult};
