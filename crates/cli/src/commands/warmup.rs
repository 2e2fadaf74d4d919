//! `stride warmup`: Run cheap passes for every domain.

use std::path::Path;
use stride_core::DomainId;

use super::{CliResult, build_orchestrator, load_config, print_json};

pub async fn run(config_path: Option<&Path>, user: &str, domains: Vec<DomainId>) -> CliResult {
    let config = load_config(config_path)?;
    let orchestrator = build_orchestrator(&config)?;
    let domains = (!domains.is_empty()).then_some(domains);
    let report = stride_agent::warmup(&orchestrator, user, domains.as_deref()).await;
    print_json(&report)
}
