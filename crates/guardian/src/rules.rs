//! Validation rules and the context facts they read.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stride_core::Context;

/// Average month length used to turn days-until-deadline into months.
const DAYS_PER_MONTH: f64 = 30.44;

/// A check a strategy can enable for its domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationRule {
    /// Enough energy and hours to act on the advice.
    Feasibility,
    /// No speculative advice while running a deficit.
    Solvency,
    /// Valuations within a sanity ceiling.
    Realism,
    /// Goal deadlines reachable at the current margin.
    Timeline,
}

impl ValidationRule {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Feasibility => "feasibility",
            Self::Solvency => "solvency",
            Self::Realism => "realism",
            Self::Timeline => "timeline",
        }
    }
}

impl std::fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A goal with a deadline, reduced to what the timeline rule needs.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalTimeline {
    pub name: String,
    pub remaining: f64,
    pub months_left: f64,
}

/// The facts the guardian reads from a context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuardianInput {
    /// Latest energy level (0–100).
    pub capacity: Option<f64>,
    pub available_hours: Option<f64>,
    /// Monthly income minus expenses.
    pub margin: f64,
    pub valuations: Vec<f64>,
    pub goals: Vec<GoalTimeline>,
}

impl GuardianInput {
    /// Extract the guardian's view of `context` as of `today`.
    pub fn from_context(context: &Context, today: NaiveDate) -> Self {
        let data = &context.data;
        let goals = data
            .goals
            .iter()
            .filter_map(|goal| {
                let deadline = goal.deadline?;
                let days = (deadline - today).num_days() as f64;
                Some(GoalTimeline {
                    name: goal.name.clone(),
                    remaining: goal.remaining(),
                    months_left: days / DAYS_PER_MONTH,
                })
            })
            .collect();

        Self {
            capacity: data.current_energy(),
            available_hours: data.available_hours_per_week,
            margin: data.margin(),
            valuations: data.inventory.iter().map(|i| i.estimated_value).collect(),
            goals,
        }
    }
}
