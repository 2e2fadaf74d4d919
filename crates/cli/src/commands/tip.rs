//! `stride tip`: Run the tip pipeline for one domain.

use std::path::Path;
use stride_agent::OrchestrationRequest;
use stride_core::DomainId;

use super::{CliResult, build_orchestrator, load_config, print_json};

pub struct TipArgs {
    pub domain: DomainId,
    pub user: String,
    pub context_override: Option<String>,
    pub timeout_ms: Option<u64>,
    pub algorithms_only: bool,
    pub experiments: Vec<String>,
}

pub async fn run(config_path: Option<&Path>, args: TipArgs) -> CliResult {
    let config = load_config(config_path)?;
    let orchestrator = build_orchestrator(&config)?;

    let mut request = OrchestrationRequest::new(args.domain, args.user);
    if let Some(raw) = args.context_override {
        let overlay: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| format!("--override is not valid JSON: {e}"))?;
        request = request.with_override(overlay);
    }
    if let Some(ms) = args.timeout_ms {
        request = request.with_timeout_ms(ms);
    }
    if args.algorithms_only || !orchestrator.has_generator() {
        request = request.with_full_orchestration(false);
    }
    if !args.experiments.is_empty() {
        request = request.with_experiments(args.experiments);
    }

    let result = orchestrator.run(request).await;
    print_json(&result)
}
