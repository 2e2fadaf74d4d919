//! `stride assign`: Show which experiment variants a user lands in.

use std::path::Path;
use stride_experiments::ExperimentSource;

use super::{CliResult, load_config, print_json};

pub fn run(config_path: Option<&Path>, user: &str, experiments: Vec<String>) -> CliResult {
    let config = load_config(config_path)?;
    let catalog = config.catalog()?;
    let ids = (!experiments.is_empty()).then_some(experiments);
    let selection = catalog.select(user, ids.as_deref(), config.effective_base());
    print_json(&selection)
}
