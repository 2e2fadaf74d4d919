//! Built-in deterministic agents.
//!
//! Each agent id the strategies reference maps to a small rule-based
//! analysis of the context. Identical contexts give identical outputs.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use stride_config::DetectorsConfig;
use stride_core::{AgentError, AgentExecutor, AgentOutput, Context, Goal};
use tracing::debug;

use crate::algorithms::analyse;

/// Energy below this trims the hours an agent will suggest.
const LOW_ENERGY: f64 = 40.0;

/// Agent ids served by [`LocalAgents`].
pub const AGENT_IDS: [&str; 7] = [
    "budget-coach",
    "goal-planner",
    "energy-calibrator",
    "job-matcher",
    "trade-appraiser",
    "profile-curator",
    "discovery-scout",
];

/// Rule-based agents running in-process.
#[derive(Debug, Clone, Default)]
pub struct LocalAgents {
    detectors: DetectorsConfig,
}

impl LocalAgents {
    pub fn new(detectors: DetectorsConfig) -> Self {
        Self { detectors }
    }

    fn budget_coach(&self, context: &Context) -> Result<AgentOutput, AgentError> {
        let data = &context.data;
        if data.monthly_income <= 0.0 && data.monthly_expenses <= 0.0 {
            return Err(AgentError::ExecutionFailed {
                agent_id: "budget-coach".into(),
                reason: "no income or expense data".into(),
            });
        }

        let margin = data.margin();
        let output = if margin < 0.0 {
            AgentOutput::new(
                "budget-coach",
                format!("Cut {:.0} per month from expenses to break even.", -margin),
                0.8,
            )
        } else {
            let reserve = (margin * 0.2).round();
            AgentOutput::new(
                "budget-coach",
                format!("Set aside {reserve:.0} of the {margin:.0} monthly margin as a buffer."),
                0.75,
            )
        };
        Ok(output.with_data(json!({ "margin": margin })))
    }

    fn goal_planner(&self, context: &Context) -> AgentOutput {
        let today = chrono::Utc::now().date_naive();
        let Some(goal) = most_urgent_goal(&context.data.goals, today) else {
            return AgentOutput::new("goal-planner", "Set a first savings goal with a deadline.", 0.4);
        };

        let remaining = goal.remaining();
        let weekly = match goal.deadline {
            Some(deadline) => {
                let weeks = ((deadline - today).num_days() as f64 / 7.0).max(1.0);
                remaining / weeks
            }
            None => goal.weekly_target.unwrap_or(remaining / 12.0),
        };
        AgentOutput::new(
            "goal-planner",
            format!(
                "Put {weekly:.0} per week toward '{}' to close the remaining {remaining:.0}.",
                goal.name
            ),
            if goal.deadline.is_some() { 0.8 } else { 0.6 },
        )
        .with_data(json!({ "goal": goal.name, "weekly": weekly, "remaining": remaining }))
    }

    fn energy_calibrator(&self, context: &Context) -> AgentOutput {
        let insights = analyse(context, &self.detectors);
        let (recommendation, confidence) = if let Some(window) = &insights.comeback {
            (
                format!(
                    "Energy recovered after {} low weeks; catch up over {} weeks.",
                    window.deficit_weeks, window.suggested_catch_up_weeks
                ),
                window.confidence_score.max(0.6),
            )
        } else if let Some(streak) = insights.active_streak() {
            (
                format!(
                    "Low energy for {} weeks; keep commitments minimal.",
                    streak.consecutive_low_weeks
                ),
                0.85,
            )
        } else if context.data.energy_history.is_empty() {
            ("No energy history yet; plan a normal week.".to_string(), 0.3)
        } else {
            ("Energy is stable; a normal workload is fine.".to_string(), 0.7)
        };

        let data = serde_json::to_value(&insights).unwrap_or_default();
        AgentOutput::new("energy-calibrator", recommendation, confidence).with_data(data)
    }

    fn job_matcher(&self, context: &Context) -> AgentOutput {
        let data = &context.data;
        let mut hours = data.available_hours_per_week.unwrap_or(10.0).min(15.0);
        if data.current_energy().is_some_and(|e| e < LOW_ENERGY) {
            hours = (hours / 2.0).floor();
        }

        let output = match data.skills.first() {
            Some(skill) => AgentOutput::new(
                "job-matcher",
                format!("Look for about {hours:.0} hours a week of flexible work using {skill}."),
                0.7,
            ),
            None => AgentOutput::new(
                "job-matcher",
                format!("Try a one-off task of about {hours:.0} hours, such as tutoring or delivery."),
                0.4,
            ),
        };
        output.with_data(json!({ "hours": hours }))
    }

    fn trade_appraiser(&self, context: &Context) -> AgentOutput {
        let best = context
            .data
            .inventory
            .iter()
            .max_by(|a, b| a.estimated_value.total_cmp(&b.estimated_value));
        match best {
            Some(item) => AgentOutput::new(
                "trade-appraiser",
                format!("Sell {} for about {:.0}.", item.name, item.estimated_value),
                0.7,
            )
            .with_data(json!({ "item": item.name, "value": item.estimated_value })),
            None => AgentOutput::new("trade-appraiser", "List something you no longer use.", 0.3),
        }
    }

    fn profile_curator(&self, context: &Context) -> AgentOutput {
        let data = &context.data;
        let missing: Vec<&str> = [
            ("energy check-ins", data.energy_history.is_empty()),
            ("monthly income", data.monthly_income <= 0.0),
            ("weekly hours", data.available_hours_per_week.is_none()),
            ("skills", data.skills.is_empty()),
            ("goals", data.goals.is_empty()),
        ]
        .into_iter()
        .filter_map(|(field, is_missing)| is_missing.then_some(field))
        .collect();

        match missing.first() {
            Some(field) => AgentOutput::new(
                "profile-curator",
                format!("Add your {field} next."),
                0.6,
            )
            .with_data(json!({ "missing": missing })),
            None => AgentOutput::new("profile-curator", "Profile is complete.", 0.9),
        }
    }

    fn discovery_scout(&self, context: &Context) -> AgentOutput {
        let data = &context.data;
        let (idea, confidence) = if data.skills.is_empty() && data.inventory.is_empty() {
            ("Try a one-off paid task this week to find what suits you.", 0.4)
        } else if data.inventory.len() > data.skills.len() {
            ("Rent out an item you rarely use instead of selling it.", 0.6)
        } else {
            ("Offer one of your skills as a short weekend service.", 0.6)
        };
        AgentOutput::new("discovery-scout", idea, confidence)
    }
}

/// Earliest deadline first; goals without one rank by remaining amount.
fn most_urgent_goal(goals: &[Goal], today: NaiveDate) -> Option<&Goal> {
    let open = goals.iter().filter(|g| g.remaining() > 0.0);
    let dated = open
        .clone()
        .filter(|g| g.deadline.is_some_and(|d| d >= today))
        .min_by_key(|g| g.deadline);
    dated.or_else(|| open.max_by(|a, b| a.remaining().total_cmp(&b.remaining())))
}

#[async_trait]
impl AgentExecutor for LocalAgents {
    async fn execute(&self, agent_id: &str, context: &Context) -> Result<AgentOutput, AgentError> {
        debug!(agent = agent_id, user_id = %context.user_id, "Running local agent");
        match agent_id {
            "budget-coach" => self.budget_coach(context),
            "goal-planner" => Ok(self.goal_planner(context)),
            "energy-calibrator" => Ok(self.energy_calibrator(context)),
            "job-matcher" => Ok(self.job_matcher(context)),
            "trade-appraiser" => Ok(self.trade_appraiser(context)),
            "profile-curator" => Ok(self.profile_curator(context)),
            "discovery-scout" => Ok(self.discovery_scout(context)),
            other => Err(AgentError::UnknownAgent(other.to_string())),
        }
    }
}
