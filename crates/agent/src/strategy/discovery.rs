use std::fmt::Write;
use stride_core::{Context, DomainId, Tip};
use stride_guardian::ValidationRule;

use super::{Strategy, describe_basics};

#[derive(Debug, Default, Clone, Copy)]
pub struct DiscoveryStrategy;

impl Strategy for DiscoveryStrategy {
    fn domain(&self) -> DomainId {
        DomainId::Discovery
    }

    fn primary_agent_id(&self) -> &'static str {
        "discovery-scout"
    }

    fn secondary_agent_ids(&self) -> &'static [&'static str] {
        &["job-matcher", "trade-appraiser"]
    }

    fn validation_rules(&self) -> &'static [ValidationRule] {
        &[ValidationRule::Feasibility]
    }

    fn format_context_for_prompt(&self, context: &Context) -> String {
        let mut out = describe_basics(context);
        let data = &context.data;
        let _ = writeln!(
            out,
            "Skills: {}; sellable items: {}",
            data.skills.len(),
            data.inventory.len()
        );
        out
    }

    fn system_prompt(&self) -> &'static str {
        with_json_contract!(
            "You suggest one new, low-commitment way for a student to earn or save that they ",
            "have not tried yet, sized to their current energy. ",
        )
    }

    fn fallback_message(&self) -> Tip {
        Tip::new(
            "Try something new this week",
            "Pick one small money idea you have not tried yet and give it thirty minutes.",
            "discovery",
        )
    }
}
