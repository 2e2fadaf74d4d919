//! Proportional catch-up planning.
//!
//! Each upcoming week takes a share of the deficit proportional to its
//! capacity. Callers slice `capacities` to the suggested window length
//! before calling; the plan is exactly as long as the slice.

use serde::{Deserialize, Serialize};

/// How hard a catch-up week is relative to half of its capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffortLevel {
    Light,
    Moderate,
    Intense,
}

impl EffortLevel {
    fn from_ratio(ratio: f64) -> Self {
        if ratio < 0.7 {
            Self::Light
        } else if ratio < 1.2 {
            Self::Moderate
        } else {
            Self::Intense
        }
    }
}

/// One week of a catch-up plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchUpWeek {
    /// 1-based offset from the recovery week.
    pub week: u32,
    pub target: f64,
    pub capacity: f64,
    pub effort_level: EffortLevel,
}

/// Spread `deficit_amount` across `capacities`.
pub fn plan_catch_up(deficit_amount: f64, capacities: &[f64]) -> Vec<CatchUpWeek> {
    if deficit_amount <= 0.0 || capacities.is_empty() {
        return Vec::new();
    }

    let total: f64 = capacities.iter().sum();
    if total <= 0.0 {
        return Vec::new();
    }

    capacities
        .iter()
        .enumerate()
        .map(|(i, &capacity)| {
            let target = (capacity / total * deficit_amount).round();
            let effort_ratio = if capacity > 0.0 {
                target / (capacity * 0.5)
            } else {
                f64::INFINITY
            };
            CatchUpWeek {
                week: i as u32 + 1,
                target,
                capacity,
                effort_level: EffortLevel::from_ratio(effort_ratio),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(plan: &[CatchUpWeek]) -> Vec<f64> {
        plan.iter().map(|w| w.target).collect()
    }

    #[test]
    fn non_positive_deficit_yields_empty_plan() {
        assert!(plan_catch_up(0.0, &[90.0, 80.0, 70.0]).is_empty());
        assert!(plan_catch_up(-100.0, &[90.0, 80.0, 70.0]).is_empty());
    }

    #[test]
    fn no_capacities_yields_empty_plan() {
        assert!(plan_catch_up(300.0, &[]).is_empty());
    }

    #[test]
    fn zero_total_capacity_yields_empty_plan() {
        assert!(plan_catch_up(300.0, &[0.0, 0.0]).is_empty());
    }

    #[test]
    fn allocation_is_proportional_not_front_loaded() {
        let plan = plan_catch_up(240.0, &[90.0, 80.0, 70.0]);
        assert_eq!(targets(&plan), vec![90.0, 80.0, 70.0]);
        assert_eq!(plan[0].week, 1);
        assert_eq!(plan[2].week, 3);
    }

    #[test]
    fn plan_length_matches_capacities() {
        for caps in [&[50.0][..], &[90.0, 60.0][..], &[90.0, 80.0, 70.0, 60.0, 50.0][..]] {
            assert_eq!(plan_catch_up(500.0, caps).len(), caps.len());
        }
    }

    #[test]
    fn targets_sum_to_deficit_within_rounding() {
        let cases: [(f64, &[f64]); 4] = [
            (500.0, &[90.0, 80.0, 70.0]),
            (333.0, &[85.0, 85.0, 40.0]),
            (1000.0, &[95.0, 60.0]),
            (17.0, &[33.0, 33.0, 34.0]),
        ];
        for (deficit, caps) in cases {
            let sum: f64 = plan_catch_up(deficit, caps).iter().map(|w| w.target).sum();
            assert!(
                (sum - deficit).abs() <= caps.len() as f64 * 0.5,
                "deficit {deficit} planned as {sum}"
            );
        }
    }

    #[test]
    fn effort_levels_follow_ratio_bands() {
        // target 20 on capacity 90 -> ratio 0.44 -> light
        let plan = plan_catch_up(20.0, &[90.0]);
        assert_eq!(plan[0].effort_level, EffortLevel::Light);

        // target 50 on capacity 100 -> ratio 1.0 -> moderate
        let plan = plan_catch_up(50.0, &[100.0]);
        assert_eq!(plan[0].effort_level, EffortLevel::Moderate);

        // target 240 spread over 90/80/70 -> ratio 2.0 -> intense
        let plan = plan_catch_up(240.0, &[90.0, 80.0, 70.0]);
        assert!(plan.iter().all(|w| w.effort_level == EffortLevel::Intense));
    }

    #[test]
    fn planning_is_pure() {
        let caps = [90.0, 80.0, 70.0];
        let first = plan_catch_up(500.0, &caps);
        for _ in 0..10 {
            assert_eq!(plan_catch_up(500.0, &caps), first);
        }
    }

    #[test]
    fn serializes_effort_in_snake_case() {
        let json = serde_json::to_string(&plan_catch_up(20.0, &[90.0])[0]).unwrap();
        assert!(json.contains("\"effort_level\":\"light\""));
    }
}
