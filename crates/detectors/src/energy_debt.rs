//! Low-capacity streak detection.
//!
//! A streak is a run of consecutive below-threshold weeks ending at the most
//! recent entry. Only the run that is still active counts; an older streak
//! followed by a normal week is over.

use serde::{Deserialize, Serialize};

/// How bad an active streak is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Result of [`detect_energy_debt`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowCapacitySignal {
    pub detected: bool,
    pub severity: Severity,
    pub consecutive_low_weeks: u32,
}

/// Thresholds for the streak detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakConfig {
    /// Levels strictly below this are low.
    #[serde(default = "default_low_threshold")]
    pub low_threshold: f64,
    /// Minimum run length for a streak to count.
    #[serde(default = "default_min_weeks")]
    pub min_weeks: u32,
    /// Run length at which severity becomes medium.
    #[serde(default = "default_medium_weeks")]
    pub medium_weeks: u32,
    /// Run length at which severity becomes high.
    #[serde(default = "default_high_weeks")]
    pub high_weeks: u32,
}

fn default_low_threshold() -> f64 {
    40.0
}
fn default_min_weeks() -> u32 {
    3
}
fn default_medium_weeks() -> u32 {
    4
}
fn default_high_weeks() -> u32 {
    5
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            low_threshold: default_low_threshold(),
            min_weeks: default_min_weeks(),
            medium_weeks: default_medium_weeks(),
            high_weeks: default_high_weeks(),
        }
    }
}

/// Detect an active low-capacity streak at the end of `levels`.
pub fn detect_energy_debt(levels: &[f64], config: &StreakConfig) -> LowCapacitySignal {
    let run = levels
        .iter()
        .rev()
        .take_while(|&&level| level < config.low_threshold)
        .count() as u32;

    let severity = if run >= config.high_weeks {
        Severity::High
    } else if run >= config.medium_weeks {
        Severity::Medium
    } else {
        Severity::Low
    };

    LowCapacitySignal {
        detected: run >= config.min_weeks,
        severity,
        consecutive_low_weeks: run,
    }
}
