//! Rolling energy trend.
//!
//! Summarises the tail of an energy series as a rolling mean (partial
//! windows allowed) plus the week-over-week delta.

use serde::{Deserialize, Serialize};

/// Deltas smaller than this (in level points) count as steady.
const STEADY_BAND: f64 = 5.0;

/// Default rolling window, in weeks.
pub const DEFAULT_WINDOW: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Falling,
    Steady,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyTrend {
    pub rolling_mean: f64,
    /// Current minus previous level; `None` with a single entry.
    pub lag1_delta: Option<f64>,
    pub direction: TrendDirection,
    pub window: usize,
}

/// Summarise the last `window` entries of `levels`.
///
/// Returns `None` for an empty series. A zero window is treated as one.
pub fn energy_trend(levels: &[f64], window: usize) -> Option<EnergyTrend> {
    let current = *levels.last()?;
    let window = window.max(1);
    let tail = &levels[levels.len().saturating_sub(window)..];
    let rolling_mean = tail.iter().sum::<f64>() / tail.len() as f64;

    let lag1_delta = levels
        .len()
        .checked_sub(2)
        .map(|i| current - levels[i]);

    let direction = match lag1_delta {
        Some(delta) if delta >= STEADY_BAND => TrendDirection::Rising,
        Some(delta) if delta <= -STEADY_BAND => TrendDirection::Falling,
        _ => TrendDirection::Steady,
    };

    Some(EnergyTrend {
        rolling_mean,
        lag1_delta,
        direction,
        window,
    })
}
