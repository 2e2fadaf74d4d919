use std::fmt::Write;
use stride_core::{Context, DomainId, Tip};
use stride_guardian::ValidationRule;

use super::{Strategy, describe_basics};

#[derive(Debug, Default, Clone, Copy)]
pub struct TradeStrategy;

impl Strategy for TradeStrategy {
    fn domain(&self) -> DomainId {
        DomainId::Trade
    }

    fn primary_agent_id(&self) -> &'static str {
        "trade-appraiser"
    }

    fn secondary_agent_ids(&self) -> &'static [&'static str] {
        &["budget-coach"]
    }

    fn validation_rules(&self) -> &'static [ValidationRule] {
        &[ValidationRule::Realism, ValidationRule::Solvency]
    }

    fn format_context_for_prompt(&self, context: &Context) -> String {
        let mut out = describe_basics(context);
        if context.data.inventory.is_empty() {
            let _ = writeln!(out, "Inventory: empty");
        }
        for item in &context.data.inventory {
            let _ = writeln!(out, "Item '{}': estimated {:.0}", item.name, item.estimated_value);
        }
        out
    }

    fn system_prompt(&self) -> &'static str {
        with_json_contract!(
            "You help students turn unused belongings into money through selling, swapping or ",
            "renting. Use realistic second-hand prices. ",
        )
    }

    fn fallback_message(&self) -> Tip {
        Tip::new(
            "List one thing you no longer use",
            "Pick one item you have not touched in months and list it at a fair second-hand price.",
            "trade",
        )
    }
}
