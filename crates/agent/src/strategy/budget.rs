use std::fmt::Write;
use stride_core::{Context, DomainId, Tip};
use stride_guardian::ValidationRule;

use super::{Strategy, describe_basics};

#[derive(Debug, Default, Clone, Copy)]
pub struct BudgetStrategy;

impl Strategy for BudgetStrategy {
    fn domain(&self) -> DomainId {
        DomainId::Budget
    }

    fn primary_agent_id(&self) -> &'static str {
        "budget-coach"
    }

    fn secondary_agent_ids(&self) -> &'static [&'static str] {
        &["goal-planner", "energy-calibrator"]
    }

    fn validation_rules(&self) -> &'static [ValidationRule] {
        &[ValidationRule::Solvency, ValidationRule::Feasibility]
    }

    fn format_context_for_prompt(&self, context: &Context) -> String {
        let mut out = describe_basics(context);
        if let Some(deficit) = context.data.savings_deficit {
            let _ = writeln!(out, "Savings shortfall: {deficit:.0}");
        }
        let _ = writeln!(out, "Active goals: {}", context.data.goals.len());
        out
    }

    fn system_prompt(&self) -> &'static str {
        with_json_contract!(
            "You are a budgeting coach for students. Suggest one concrete, low-effort way to ",
            "improve this month's margin that fits the student's current energy. Never suggest ",
            "loans, credit or speculative investments. ",
        )
    }

    fn fallback_message(&self) -> Tip {
        Tip::new(
            "Check one expense this week",
            "Pick a single recurring expense and see whether it can shrink or pause for a month.",
            "budget",
        )
        .with_action("Review subscriptions")
    }
}
