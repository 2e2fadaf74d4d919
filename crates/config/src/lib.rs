//! Configuration loading, validation, and management for Stride.
//!
//! Loads configuration from `~/.stride/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use stride_detectors::{ComebackConfig, StreakConfig};
use stride_experiments::{EffectiveConfig, Experiment, ExperimentCatalog, SamplingPolicy};

/// The root configuration structure.
///
/// Maps directly to `~/.stride/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Budgets and switches for the orchestrator
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Detector thresholds
    #[serde(default)]
    pub detectors: DetectorsConfig,

    /// Guardian validator settings
    #[serde(default)]
    pub guardian: GuardianConfig,

    /// Diagnostics sampling
    #[serde(default)]
    pub sampling: SamplingPolicy,

    /// Text generation endpoint
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Context store location
    #[serde(default)]
    pub store: StoreConfig,

    /// Experiment catalogue. Defaults to the built-in experiments.
    #[serde(default = "Experiment::builtin")]
    pub experiments: Vec<Experiment>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            detectors: DetectorsConfig::default(),
            guardian: GuardianConfig::default(),
            sampling: SamplingPolicy::default(),
            generation: GenerationConfig::default(),
            store: StoreConfig::default(),
            experiments: Experiment::builtin(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Total time budget for one call, in milliseconds
    #[serde(default = "default_total_timeout_ms")]
    pub total_timeout_ms: u64,

    /// When false every call starts at the algorithms tier
    #[serde(default = "default_true")]
    pub enable_full_orchestration: bool,

    #[serde(default = "default_load_context_cap_ms")]
    pub load_context_cap_ms: u64,

    #[serde(default = "default_agents_cap_ms")]
    pub agents_cap_ms: u64,

    #[serde(default = "default_guardian_cap_ms")]
    pub guardian_cap_ms: u64,

    #[serde(default = "default_temperature")]
    pub generation_temperature: f32,

    #[serde(default)]
    pub skip_secondary_agents: bool,

    /// Experiments applied when a request names none. Empty means all
    /// enabled experiments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_experiments: Vec<String>,
}

fn default_total_timeout_ms() -> u64 {
    5000
}
fn default_load_context_cap_ms() -> u64 {
    1500
}
fn default_agents_cap_ms() -> u64 {
    2000
}
fn default_guardian_cap_ms() -> u64 {
    1000
}
fn default_temperature() -> f32 {
    0.7
}
fn default_true() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            total_timeout_ms: default_total_timeout_ms(),
            enable_full_orchestration: true,
            load_context_cap_ms: default_load_context_cap_ms(),
            agents_cap_ms: default_agents_cap_ms(),
            guardian_cap_ms: default_guardian_cap_ms(),
            generation_temperature: default_temperature(),
            skip_secondary_agents: false,
            default_experiments: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorsConfig {
    #[serde(default)]
    pub streak: StreakConfig,

    #[serde(default)]
    pub comeback: ComebackConfig,

    #[serde(default = "default_trend_window")]
    pub trend_window: usize,
}

fn default_trend_window() -> usize {
    stride_detectors::trend::DEFAULT_WINDOW
}

impl Default for DetectorsConfig {
    fn default() -> Self {
        Self {
            streak: StreakConfig::default(),
            comeback: ComebackConfig::default(),
            trend_window: default_trend_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardianConfig {
    /// Results below this confidence fail
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Item valuations above this are flagged as unrealistic
    #[serde(default = "default_valuation_ceiling")]
    pub valuation_ceiling: f64,
}

fn default_min_confidence() -> f64 {
    0.7
}
fn default_valuation_ceiling() -> f64 {
    5000.0
}

impl Default for GuardianConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            valuation_ceiling: default_valuation_ceiling(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Models tried in order on the same endpoint when `model` fails.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_models: Vec<String>,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            request_timeout_secs: default_request_timeout_secs(),
            fallback_models: Vec::new(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("fallback_models", &self.fallback_models)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory of `<user_id>.json` snapshots. Defaults to `~/.stride/users`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.stride/config.toml).
    ///
    /// Environment overrides:
    /// - `STRIDE_API_KEY`, then `OPENAI_API_KEY`
    /// - `STRIDE_MODEL`
    /// - `STRIDE_STORE_DIR`
    /// - `STRIDE_TIMEOUT_MS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.generation.api_key.is_none() {
            self.generation.api_key = lookup("STRIDE_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(model) = lookup("STRIDE_MODEL") {
            self.generation.model = model;
        }

        if let Some(dir) = lookup("STRIDE_STORE_DIR") {
            self.store.dir = Some(PathBuf::from(dir));
        }

        if let Some(raw) = lookup("STRIDE_TIMEOUT_MS") {
            match raw.parse::<u64>() {
                Ok(ms) => self.pipeline.total_timeout_ms = ms,
                Err(_) => tracing::warn!(value = %raw, "Ignoring unparseable STRIDE_TIMEOUT_MS"),
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".stride")
    }

    /// Directory the JSON context store reads from.
    pub fn store_dir(&self) -> PathBuf {
        self.store
            .dir
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("users"))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let temperature = self.pipeline.generation_temperature;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::ValidationError(
                "pipeline.generation_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.pipeline.total_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.total_timeout_ms must be > 0".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.guardian.min_confidence) {
            return Err(ConfigError::ValidationError(
                "guardian.min_confidence must be between 0.0 and 1.0".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.sampling.base_rate) {
            return Err(ConfigError::ValidationError(
                "sampling.base_rate must be between 0.0 and 1.0".into(),
            ));
        }

        ExperimentCatalog::new(self.experiments.clone())
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        Ok(())
    }

    /// Build the validated experiment catalogue.
    pub fn catalog(&self) -> Result<ExperimentCatalog, ConfigError> {
        ExperimentCatalog::new(self.experiments.clone())
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Built-in defaults overlaid with this config's pipeline values.
    pub fn effective_base(&self) -> EffectiveConfig {
        EffectiveConfig {
            skip_secondary_agents: self.pipeline.skip_secondary_agents,
            generation_temperature: self.pipeline.generation_temperature,
            guardian_min_confidence: self.guardian.min_confidence,
            total_timeout_ms: self.pipeline.total_timeout_ms,
        }
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.generation.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
