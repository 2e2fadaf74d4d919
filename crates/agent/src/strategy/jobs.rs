use std::fmt::Write;
use stride_core::{Context, DomainId, Tip};
use stride_guardian::ValidationRule;

use super::{Strategy, describe_basics};

#[derive(Debug, Default, Clone, Copy)]
pub struct JobsStrategy;

impl Strategy for JobsStrategy {
    fn domain(&self) -> DomainId {
        DomainId::Jobs
    }

    fn primary_agent_id(&self) -> &'static str {
        "job-matcher"
    }

    fn secondary_agent_ids(&self) -> &'static [&'static str] {
        &["energy-calibrator", "budget-coach"]
    }

    fn validation_rules(&self) -> &'static [ValidationRule] {
        &[ValidationRule::Feasibility, ValidationRule::Solvency]
    }

    fn format_context_for_prompt(&self, context: &Context) -> String {
        let mut out = describe_basics(context);
        if context.data.skills.is_empty() {
            let _ = writeln!(out, "Skills: none listed");
        } else {
            let _ = writeln!(out, "Skills: {}", context.data.skills.join(", "));
        }
        out
    }

    fn system_prompt(&self) -> &'static str {
        with_json_contract!(
            "You match students to flexible side work that fits their skills and the hours ",
            "their energy allows this week. ",
        )
    }

    fn fallback_message(&self) -> Tip {
        Tip::new(
            "Turn one skill into a gig",
            "Write down one thing you are good at and look for a short, flexible task that uses it.",
            "jobs",
        )
    }
}
