//! `stride detect` and `stride plan`: Run the detectors without a store.

use std::path::Path;
use stride_agent::analyse;
use stride_core::{Context, DomainId, EnergyEntry, UserSnapshot};
use stride_detectors::plan_catch_up;

use super::{CliResult, load_config, print_json};

pub fn run(
    config_path: Option<&Path>,
    levels: Vec<f64>,
    deficit: f64,
    capacities: Vec<f64>,
) -> CliResult {
    let config = load_config(config_path)?;

    let snapshot = UserSnapshot {
        energy_history: levels
            .into_iter()
            .enumerate()
            .map(|(i, level)| EnergyEntry::new(i as u32 + 1, level))
            .collect(),
        savings_deficit: Some(deficit),
        upcoming_capacity: capacities,
        ..Default::default()
    };
    let context = Context::new("cli", DomainId::Goals, snapshot);
    print_json(&analyse(&context, &config.detectors))
}

pub fn plan(deficit: f64, capacities: &[f64]) -> CliResult {
    print_json(&plan_catch_up(deficit, capacities))
}
