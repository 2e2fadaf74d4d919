//! Per-domain strategies.
//!
//! A strategy bundles everything domain-specific about a tip request: how
//! the context is loaded, which agents analyse it, which guardian rules
//! apply, how it is rendered into a prompt, and the static tip used when
//! everything else fails.
//!
//! The set of domains is closed, so [`StrategyRegistry`] holds one concrete
//! strategy per [`DomainId`] and dispatches with an exhaustive match.

/// Expand to the given prompt text followed by the output contract every
/// system prompt ends with.
macro_rules! with_json_contract {
    ($($part:literal),* $(,)?) => {
        concat!(
            $($part,)*
            "Reply with a single JSON object with the string fields \"title\", \"message\" and ",
            "\"category\", and optionally \"action\". No prose outside the JSON."
        )
    };
}

mod budget;
mod discovery;
mod goals;
mod jobs;
mod profile;
mod trade;

pub use budget::BudgetStrategy;
pub use discovery::DiscoveryStrategy;
pub use goals::GoalsStrategy;
pub use jobs::JobsStrategy;
pub use profile::ProfileStrategy;
pub use trade::TradeStrategy;

use async_trait::async_trait;
use std::fmt::Write;
use stride_core::{Context, ContextStore, DomainId, StoreError, Tip};
use stride_guardian::ValidationRule;

/// Domain-specific behaviour for one [`DomainId`].
#[async_trait]
pub trait Strategy: Send + Sync {
    fn domain(&self) -> DomainId;

    /// Build the context for `user_id` from the store.
    async fn load_context(&self, store: &dyn ContextStore, user_id: &str) -> Result<Context, StoreError> {
        let snapshot = store.load(user_id).await?;
        Ok(Context::new(user_id, self.domain(), snapshot))
    }

    fn primary_agent_id(&self) -> &'static str;

    fn secondary_agent_ids(&self) -> &'static [&'static str];

    fn validation_rules(&self) -> &'static [ValidationRule];

    fn format_context_for_prompt(&self, context: &Context) -> String;

    fn system_prompt(&self) -> &'static str;

    /// The static tip for this domain. Always well formed.
    fn fallback_message(&self) -> Tip;
}

/// One strategy per domain, constructed once and shared by `Arc`.
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    profile: ProfileStrategy,
    goals: GoalsStrategy,
    budget: BudgetStrategy,
    trade: TradeStrategy,
    jobs: JobsStrategy,
    discovery: DiscoveryStrategy,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, domain: DomainId) -> &dyn Strategy {
        match domain {
            DomainId::Profile => &self.profile,
            DomainId::Goals => &self.goals,
            DomainId::Budget => &self.budget,
            DomainId::Trade => &self.trade,
            DomainId::Jobs => &self.jobs,
            DomainId::Discovery => &self.discovery,
        }
    }
}

/// Energy and money lines every domain prompt starts with.
pub(crate) fn describe_basics(context: &Context) -> String {
    let data = &context.data;
    let mut out = String::new();
    let _ = writeln!(out, "Domain: {}", context.domain);

    let levels = data.energy_levels();
    if levels.is_empty() {
        let _ = writeln!(out, "Energy history: none recorded");
    } else {
        let recent: Vec<String> = levels
            .iter()
            .rev()
            .take(6)
            .rev()
            .map(|l| format!("{l:.0}"))
            .collect();
        let _ = writeln!(out, "Energy (last weeks, oldest first): {}", recent.join(", "));
    }

    let _ = writeln!(
        out,
        "Monthly income: {:.0}, expenses: {:.0}, margin: {:.0}",
        data.monthly_income,
        data.monthly_expenses,
        data.margin()
    );
    if let Some(hours) = data.available_hours_per_week {
        let _ = writeln!(out, "Available hours per week: {hours:.0}");
    }
    out
}
