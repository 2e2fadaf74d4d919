//! CLI subcommands and the wiring they share.

pub mod assign;
pub mod detect;
pub mod doctor;
pub mod tip;
pub mod warmup;

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use stride_agent::{LocalAgents, Orchestrator};
use stride_config::{AppConfig, ConfigError};
use stride_providers::FallbackGenerator;
use stride_store::JsonDirContextStore;
use stride_telemetry::TracingDiagnosticsSink;
use tracing::info;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Load `path` if given, else the default config, with env overrides.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let Some(path) = path else {
        return AppConfig::load();
    };
    let mut config = AppConfig::load_from(path)?;
    config.apply_env(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Orchestrator over the JSON store and local agents. The text generator
/// is attached only when an API key is configured.
pub fn build_orchestrator(config: &AppConfig) -> Result<Orchestrator, Box<dyn std::error::Error>> {
    let store = Arc::new(JsonDirContextStore::new(config.store_dir()));
    let agents = Arc::new(LocalAgents::new(config.detectors.clone()));
    let mut builder = Orchestrator::builder(store, agents)
        .with_config(config)?
        .sink(Arc::new(TracingDiagnosticsSink));

    if config.has_api_key() {
        let chain = FallbackGenerator::from_config(&config.generation)?;
        info!(model = %config.generation.model, fallbacks = chain.len() - 1, "Text generation enabled");
        builder = builder.generator(Arc::new(chain));
    } else {
        info!("No API key configured, serving algorithm tips");
    }
    Ok(builder.build())
}

pub fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
