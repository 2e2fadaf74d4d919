//! Deterministic analysis layer over weekly energy series.
//!
//! Every function in this crate is pure: identical inputs produce
//! bit-identical outputs, with no hidden state and no I/O. The orchestrator
//! runs them at every fallback level, so they also serve as the
//! "algorithms-only" tier of the pipeline.
//!
//! - [`detect_energy_debt`]: is a low-capacity streak active right now?
//! - [`detect_comeback`]: has the user just recovered from one?
//! - [`plan_catch_up`]: spread a deficit over upcoming weeks by capacity
//! - [`energy_trend`]: rolling mean and week-over-week direction

pub mod catch_up;
pub mod comeback;
pub mod energy_debt;
pub mod trend;

pub use catch_up::{CatchUpWeek, EffortLevel, plan_catch_up};
pub use comeback::{ComebackConfig, ComebackWindow, detect_comeback};
pub use energy_debt::{LowCapacitySignal, Severity, StreakConfig, detect_energy_debt};
pub use trend::{EnergyTrend, TrendDirection, energy_trend};

/// Clamp a value into `[0, 1]`.
pub(crate) fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
