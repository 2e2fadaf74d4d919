use std::fmt::Write;
use stride_core::{Context, DomainId, Tip};
use stride_guardian::ValidationRule;

use super::{Strategy, describe_basics};

#[derive(Debug, Default, Clone, Copy)]
pub struct ProfileStrategy;

impl Strategy for ProfileStrategy {
    fn domain(&self) -> DomainId {
        DomainId::Profile
    }

    fn primary_agent_id(&self) -> &'static str {
        "profile-curator"
    }

    fn secondary_agent_ids(&self) -> &'static [&'static str] {
        &["energy-calibrator"]
    }

    fn validation_rules(&self) -> &'static [ValidationRule] {
        &[ValidationRule::Feasibility]
    }

    fn format_context_for_prompt(&self, context: &Context) -> String {
        let mut out = describe_basics(context);
        let data = &context.data;
        let _ = writeln!(
            out,
            "Profile: {} skills, {} goals, {} inventory items",
            data.skills.len(),
            data.goals.len(),
            data.inventory.len()
        );
        out
    }

    fn system_prompt(&self) -> &'static str {
        with_json_contract!(
            "You help students complete their profile so later advice can be personal. ",
            "Suggest the single most useful detail to add next. ",
        )
    }

    fn fallback_message(&self) -> Tip {
        Tip::new(
            "Tell us a bit more about you",
            "Adding your weekly hours and one skill makes every other tip more useful.",
            "profile",
        )
        .with_action("Edit profile")
    }
}
