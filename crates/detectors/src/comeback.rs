//! Comeback window detection.
//!
//! A comeback is a sharp recovery right after a sustained low period: enough
//! low weeks in the history, a previous week still below par, and a current
//! week well above it. A detected window carries a suggested catch-up length
//! and a confidence that grows with the size of the jump.

use serde::{Deserialize, Serialize};

use crate::clamp01;

/// Thresholds for [`detect_comeback`]. Defaults are part of the contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComebackConfig {
    #[serde(default = "default_low_threshold")]
    pub low_threshold: f64,
    #[serde(default = "default_min_low_weeks")]
    pub min_low_weeks: u32,
    #[serde(default = "default_recovery_threshold")]
    pub recovery_threshold: f64,
    #[serde(default = "default_previous_threshold")]
    pub previous_threshold: f64,
    #[serde(default = "default_max_catch_up_weeks")]
    pub max_catch_up_weeks: u32,
}

fn default_low_threshold() -> f64 {
    40.0
}
fn default_min_low_weeks() -> u32 {
    2
}
fn default_recovery_threshold() -> f64 {
    80.0
}
fn default_previous_threshold() -> f64 {
    50.0
}
fn default_max_catch_up_weeks() -> u32 {
    3
}

impl Default for ComebackConfig {
    fn default() -> Self {
        Self {
            low_threshold: default_low_threshold(),
            min_low_weeks: default_min_low_weeks(),
            recovery_threshold: default_recovery_threshold(),
            previous_threshold: default_previous_threshold(),
            max_catch_up_weeks: default_max_catch_up_weeks(),
        }
    }
}

/// A detected recovery window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComebackWindow {
    pub detected: bool,
    /// 1-based index of the recovery week (the series length).
    pub recovery_week: u32,
    pub deficit_weeks: u32,
    pub suggested_catch_up_weeks: u32,
    pub deficit_amount: f64,
    pub confidence_score: f64,
}

/// Detect a comeback at the end of `history`.
///
/// Returns `None` for series shorter than three weeks and whenever any of
/// the three conditions fails. Both level comparisons are strict.
pub fn detect_comeback(
    history: &[f64],
    deficit_amount: f64,
    config: &ComebackConfig,
) -> Option<ComebackWindow> {
    if history.len() < 3 {
        return None;
    }

    let low_weeks = history
        .iter()
        .filter(|&&level| level < config.low_threshold)
        .count() as u32;

    let &[.., previous, current] = history else {
        return None;
    };

    let detected = low_weeks >= config.min_low_weeks
        && current > config.recovery_threshold
        && previous < config.previous_threshold;
    if !detected {
        return None;
    }

    let suggested = ((f64::from(low_weeks) * 1.5).ceil() as u32).min(config.max_catch_up_weeks);

    Some(ComebackWindow {
        detected: true,
        recovery_week: history.len() as u32,
        deficit_weeks: low_weeks,
        suggested_catch_up_weeks: suggested,
        deficit_amount,
        confidence_score: clamp01((current - previous) / 50.0),
    })
}
