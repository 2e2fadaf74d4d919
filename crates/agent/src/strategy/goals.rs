use std::fmt::Write;
use stride_core::{Context, DomainId, Tip};
use stride_guardian::ValidationRule;

use super::{Strategy, describe_basics};

#[derive(Debug, Default, Clone, Copy)]
pub struct GoalsStrategy;

impl Strategy for GoalsStrategy {
    fn domain(&self) -> DomainId {
        DomainId::Goals
    }

    fn primary_agent_id(&self) -> &'static str {
        "goal-planner"
    }

    fn secondary_agent_ids(&self) -> &'static [&'static str] {
        &["energy-calibrator", "budget-coach"]
    }

    fn validation_rules(&self) -> &'static [ValidationRule] {
        &[
            ValidationRule::Feasibility,
            ValidationRule::Timeline,
            ValidationRule::Solvency,
        ]
    }

    fn format_context_for_prompt(&self, context: &Context) -> String {
        let mut out = describe_basics(context);
        for goal in &context.data.goals {
            let deadline = goal
                .deadline
                .map(|d| d.to_string())
                .unwrap_or_else(|| "no deadline".into());
            let _ = writeln!(
                out,
                "Goal '{}': {:.0} of {:.0} saved, {deadline}",
                goal.name, goal.current_amount, goal.target_amount
            );
        }
        out
    }

    fn system_prompt(&self) -> &'static str {
        with_json_contract!(
            "You help students reach savings goals. Given their goals, margin and energy, ",
            "suggest the next step for the most urgent goal, paced to what their energy allows. ",
        )
    }

    fn fallback_message(&self) -> Tip {
        Tip::new(
            "Take one small step toward a goal",
            "Move a small fixed amount toward your most urgent goal this week. Consistency beats size.",
            "goals",
        )
    }
}
