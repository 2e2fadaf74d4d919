//! The algorithms-only tier.
//!
//! Runs the detectors over a context at every fallback level. At level 2
//! the result is also turned into a tip without touching the generator.

use serde::{Deserialize, Serialize};
use stride_config::DetectorsConfig;
use stride_core::{Context, Tip, UserSnapshot};
use stride_detectors::{
    CatchUpWeek, ComebackWindow, EnergyTrend, LowCapacitySignal, Severity, detect_comeback,
    detect_energy_debt, energy_trend, plan_catch_up,
};

use crate::strategy::Strategy;

/// Projected capacity never drops below this when no forecast is stored.
const CAPACITY_FLOOR: f64 = 40.0;

/// Projected capacity loss per week when no forecast is stored.
const CAPACITY_STEP: f64 = 10.0;

/// Detector output for one context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmInsights {
    /// Present whenever there is any energy history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_debt: Option<LowCapacitySignal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comeback: Option<ComebackWindow>,
    #[serde(default)]
    pub catch_up_plan: Vec<CatchUpWeek>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_trend: Option<EnergyTrend>,
}

impl AlgorithmInsights {
    /// The active low-capacity streak, if one was detected.
    pub fn active_streak(&self) -> Option<&LowCapacitySignal> {
        self.energy_debt.as_ref().filter(|s| s.detected)
    }
}

/// Run every detector over `context`.
pub fn analyse(context: &Context, settings: &DetectorsConfig) -> AlgorithmInsights {
    let data = &context.data;
    let levels = data.energy_levels();
    if levels.is_empty() {
        return AlgorithmInsights::default();
    }

    let low_weeks = levels
        .iter()
        .filter(|&&l| l < settings.comeback.low_threshold)
        .count() as u32;
    let deficit = deficit_amount(data, low_weeks);

    let comeback = detect_comeback(&levels, deficit, &settings.comeback);
    let catch_up_plan = match &comeback {
        Some(window) if window.deficit_amount > 0.0 => {
            let capacities = upcoming_capacities(data, window.suggested_catch_up_weeks as usize);
            plan_catch_up(window.deficit_amount, &capacities)
        }
        _ => Vec::new(),
    };

    AlgorithmInsights {
        energy_debt: Some(detect_energy_debt(&levels, &settings.streak)),
        comeback,
        catch_up_plan,
        energy_trend: energy_trend(&levels, settings.trend_window),
    }
}

/// The stored shortfall, or what the missed low weeks cost in planned
/// goal contributions.
pub fn deficit_amount(data: &UserSnapshot, low_weeks: u32) -> f64 {
    let deficit = data.savings_deficit.unwrap_or_else(|| {
        let weekly: f64 = data.goals.iter().filter_map(|g| g.weekly_target).sum();
        weekly * f64::from(low_weeks)
    });
    deficit.max(0.0)
}

/// Capacity for the next `weeks` weeks, nearest first.
///
/// Uses the stored forecast when there is one; otherwise projects from the
/// current level, losing a step per week down to the floor.
pub fn upcoming_capacities(data: &UserSnapshot, weeks: usize) -> Vec<f64> {
    if !data.upcoming_capacity.is_empty() {
        return data.upcoming_capacity.iter().copied().take(weeks).collect();
    }
    let Some(current) = data.current_energy() else {
        return Vec::new();
    };
    (0..weeks)
        .map(|i| (current - CAPACITY_STEP * i as f64).max(CAPACITY_FLOOR))
        .collect()
}

/// A tip built from detector output alone.
///
/// Prefers a comeback plan, then an active streak, then the strategy's
/// static tip.
pub fn algorithm_tip(insights: &AlgorithmInsights, strategy: &dyn Strategy) -> Tip {
    let category = strategy.domain().as_str();

    if let Some(window) = &insights.comeback {
        if insights.catch_up_plan.is_empty() {
            return Tip::new(
                "Your energy is back",
                format!(
                    "You bounced back after {} low weeks. Pick one thing you paused and restart it this week.",
                    window.deficit_weeks
                ),
                category,
            );
        }
        let weeks: Vec<String> = insights
            .catch_up_plan
            .iter()
            .map(|w| format!("week {}: {:.0}", w.week, w.target))
            .collect();
        return Tip::new(
            "Catch up at your own pace",
            format!(
                "You are back after {} low weeks. Spread the {:.0} you missed over the next {} weeks ({}).",
                window.deficit_weeks,
                window.deficit_amount,
                insights.catch_up_plan.len(),
                weeks.join(", ")
            ),
            category,
        )
        .with_action("Start week 1");
    }

    if let Some(streak) = insights.active_streak() {
        let advice = match streak.severity {
            Severity::Low => "Keep this week's plans light and protect your rest.",
            Severity::Medium => "Drop anything optional this week and keep only fixed commitments.",
            Severity::High => "Pause extra goals for now. Recovering comes first, the plan can wait.",
        };
        return Tip::new(
            "Go easy this week",
            format!(
                "Your energy has been low for {} weeks in a row. {advice}",
                streak.consecutive_low_weeks
            ),
            category,
        );
    }

    strategy.fallback_message()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{BudgetStrategy, GoalsStrategy};
    use stride_core::{DomainId, EnergyEntry, Goal};

    fn context(levels: &[f64], data: UserSnapshot) -> Context {
        Context::new(
            "u1",
            DomainId::Goals,
            UserSnapshot {
                energy_history: levels
                    .iter()
                    .enumerate()
                    .map(|(i, &l)| EnergyEntry::new(i as u32 + 1, l))
                    .collect(),
                ..data
            },
        )
    }

    #[test]
    fn empty_history_yields_nothing() {
        let insights = analyse(&Context::empty("u1", DomainId::Budget), &DetectorsConfig::default());
        assert_eq!(insights, AlgorithmInsights::default());
        let tip = algorithm_tip(&insights, &BudgetStrategy);
        assert_eq!(tip, BudgetStrategy.fallback_message());
    }

    #[test]
    fn comeback_produces_a_plan() {
        let ctx = context(
            &[30.0, 35.0, 85.0],
            UserSnapshot {
                savings_deficit: Some(240.0),
                upcoming_capacity: vec![90.0, 80.0, 70.0],
                ..Default::default()
            },
        );
        let insights = analyse(&ctx, &DetectorsConfig::default());
        let window = insights.comeback.as_ref().unwrap();
        assert_eq!(window.suggested_catch_up_weeks, 3);
        assert_eq!(insights.catch_up_plan.len(), 3);
        let total: f64 = insights.catch_up_plan.iter().map(|w| w.target).sum();
        assert!((total - 240.0).abs() <= 1.0);

        let tip = algorithm_tip(&insights, &GoalsStrategy);
        assert_eq!(tip.category, "goals");
        assert!(tip.message.contains("240"));
        assert!(tip.is_well_formed());
    }

    #[test]
    fn comeback_without_deficit_has_no_plan() {
        let ctx = context(&[30.0, 35.0, 85.0], UserSnapshot::default());
        let insights = analyse(&ctx, &DetectorsConfig::default());
        assert!(insights.comeback.is_some());
        assert!(insights.catch_up_plan.is_empty());
        assert_eq!(algorithm_tip(&insights, &GoalsStrategy).title, "Your energy is back");
    }

    #[test]
    fn deficit_falls_back_to_goal_targets() {
        let data = UserSnapshot {
            goals: vec![
                Goal {
                    name: "laptop".into(),
                    target_amount: 900.0,
                    current_amount: 100.0,
                    deadline: None,
                    weekly_target: Some(25.0),
                },
                Goal {
                    name: "trip".into(),
                    target_amount: 300.0,
                    current_amount: 0.0,
                    deadline: None,
                    weekly_target: Some(15.0),
                },
            ],
            ..Default::default()
        };
        assert!((deficit_amount(&data, 2) - 80.0).abs() < f64::EPSILON);

        let explicit = UserSnapshot {
            savings_deficit: Some(-10.0),
            ..data
        };
        assert_eq!(deficit_amount(&explicit, 2), 0.0);
    }

    #[test]
    fn projected_capacity_steps_down_to_floor() {
        let data = UserSnapshot {
            energy_history: vec![EnergyEntry::new(1, 55.0)],
            ..Default::default()
        };
        assert_eq!(upcoming_capacities(&data, 3), vec![55.0, 45.0, 40.0]);
        assert!(upcoming_capacities(&UserSnapshot::default(), 3).is_empty());
    }

    #[test]
    fn stored_forecast_is_sliced() {
        let data = UserSnapshot {
            upcoming_capacity: vec![90.0, 80.0, 70.0, 60.0],
            ..Default::default()
        };
        assert_eq!(upcoming_capacities(&data, 2), vec![90.0, 80.0]);
    }

    #[test]
    fn active_streak_becomes_a_rest_tip() {
        let ctx = context(&[70.0, 30.0, 25.0, 20.0, 15.0], UserSnapshot::default());
        let insights = analyse(&ctx, &DetectorsConfig::default());
        let streak = insights.active_streak().unwrap();
        assert_eq!(streak.consecutive_low_weeks, 4);
        assert_eq!(streak.severity, Severity::Medium);
        let tip = algorithm_tip(&insights, &BudgetStrategy);
        assert_eq!(tip.title, "Go easy this week");
        assert!(tip.message.contains("4 weeks"));
    }

    #[test]
    fn analysis_is_pure() {
        let ctx = context(&[30.0, 35.0, 85.0], UserSnapshot::default());
        let first = analyse(&ctx, &DetectorsConfig::default());
        for _ in 0..10 {
            assert_eq!(analyse(&ctx, &DetectorsConfig::default()), first);
        }
    }
}
