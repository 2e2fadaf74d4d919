//! Experiment catalogue and config merging.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use stride_core::ExperimentAssignment;
use tracing::debug;

use crate::ExperimentError;
use crate::assignment::assign_variant;

/// The pipeline parameters a variant may perturb. Unset fields leave the
/// lower-precedence value alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_secondary_agents: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian_min_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_timeout_ms: Option<u64>,
}

impl ConfigFragment {
    fn validate(&self) -> Result<(), String> {
        if let Some(t) = self.generation_temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(format!("generation_temperature {t} outside 0.0..=2.0"));
            }
        }
        if let Some(c) = self.guardian_min_confidence {
            if !(0.0..=1.0).contains(&c) {
                return Err(format!("guardian_min_confidence {c} outside 0.0..=1.0"));
            }
        }
        if self.total_timeout_ms == Some(0) {
            return Err("total_timeout_ms must be > 0".into());
        }
        Ok(())
    }
}

/// One arm of an experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(flatten)]
    pub fragment: ConfigFragment,
}

fn default_weight() -> u32 {
    1
}

/// A named experiment with weighted variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub variants: Vec<Variant>,
}

fn default_true() -> bool {
    true
}

impl Experiment {
    pub fn total_weight(&self) -> u64 {
        self.variants.iter().map(|v| u64::from(v.weight)).sum()
    }

    pub fn validate(&self) -> Result<(), ExperimentError> {
        let invalid = |reason: String| ExperimentError::InvalidExperiment {
            id: self.id.clone(),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id must not be empty".into()));
        }
        if self.variants.is_empty() {
            return Err(invalid("at least one variant is required".into()));
        }
        if self.total_weight() == 0 {
            return Err(invalid("total variant weight must be > 0".into()));
        }

        let mut names = HashSet::new();
        for variant in &self.variants {
            if !names.insert(variant.name.as_str()) {
                return Err(invalid(format!("duplicate variant '{}'", variant.name)));
            }
            variant
                .fragment
                .validate()
                .map_err(|e| invalid(format!("variant '{}': {e}", variant.name)))?;
        }
        Ok(())
    }

    /// The experiments shipped with the pipeline.
    pub fn builtin() -> Vec<Experiment> {
        vec![
            Experiment {
                id: "secondary-agents".into(),
                enabled: true,
                variants: vec![
                    variant("control", ConfigFragment::default()),
                    variant(
                        "primary-only",
                        ConfigFragment {
                            skip_secondary_agents: Some(true),
                            ..Default::default()
                        },
                    ),
                ],
            },
            Experiment {
                id: "tip-temperature".into(),
                enabled: true,
                variants: vec![
                    variant("control", ConfigFragment::default()),
                    variant(
                        "precise",
                        ConfigFragment {
                            generation_temperature: Some(0.4),
                            ..Default::default()
                        },
                    ),
                    variant(
                        "creative",
                        ConfigFragment {
                            generation_temperature: Some(0.9),
                            ..Default::default()
                        },
                    ),
                ],
            },
            Experiment {
                id: "guardian-strictness".into(),
                enabled: true,
                variants: vec![
                    variant("control", ConfigFragment::default()),
                    variant(
                        "strict",
                        ConfigFragment {
                            guardian_min_confidence: Some(0.8),
                            ..Default::default()
                        },
                    ),
                ],
            },
        ]
    }
}

fn variant(name: &str, fragment: ConfigFragment) -> Variant {
    Variant {
        name: name.into(),
        weight: 1,
        fragment,
    }
}

/// The merged parameters consumed by the agent, guardian and generation
/// stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub skip_secondary_agents: bool,
    pub generation_temperature: f32,
    pub guardian_min_confidence: f64,
    pub total_timeout_ms: u64,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            skip_secondary_agents: false,
            generation_temperature: 0.7,
            guardian_min_confidence: 0.7,
            total_timeout_ms: 5000,
        }
    }
}

impl EffectiveConfig {
    /// Overlay a fragment; set fields win.
    pub fn apply(&mut self, fragment: &ConfigFragment) {
        if let Some(skip) = fragment.skip_secondary_agents {
            self.skip_secondary_agents = skip;
        }
        if let Some(t) = fragment.generation_temperature {
            self.generation_temperature = t;
        }
        if let Some(c) = fragment.guardian_min_confidence {
            self.guardian_min_confidence = c;
        }
        if let Some(ms) = fragment.total_timeout_ms {
            self.total_timeout_ms = ms;
        }
    }
}

/// Assignments plus the config they produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSelection {
    pub assignments: Vec<ExperimentAssignment>,
    pub merged: EffectiveConfig,
}

/// Source of experiment assignments for a user.
pub trait ExperimentSource: Send + Sync {
    /// Assign `user_id` to the requested experiments (all enabled ones when
    /// `experiment_ids` is `None`) and merge their fragments over `base` in
    /// request order, later experiments winning.
    fn select(
        &self,
        user_id: &str,
        experiment_ids: Option<&[String]>,
        base: EffectiveConfig,
    ) -> ExperimentSelection;
}

/// A validated, in-process set of experiments.
#[derive(Debug, Clone, Default)]
pub struct ExperimentCatalog {
    experiments: Vec<Experiment>,
}

impl ExperimentCatalog {
    pub fn new(experiments: Vec<Experiment>) -> Result<Self, ExperimentError> {
        let mut ids = HashSet::new();
        for experiment in &experiments {
            experiment.validate()?;
            if !ids.insert(experiment.id.clone()) {
                return Err(ExperimentError::DuplicateId(experiment.id.clone()));
            }
        }
        Ok(Self { experiments })
    }

    /// The built-in catalogue.
    pub fn builtin() -> Self {
        Self {
            experiments: Experiment::builtin(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Experiment> {
        self.experiments.iter().find(|e| e.id == id)
    }

    pub fn experiments(&self) -> &[Experiment] {
        &self.experiments
    }
}

impl ExperimentSource for ExperimentCatalog {
    fn select(
        &self,
        user_id: &str,
        experiment_ids: Option<&[String]>,
        base: EffectiveConfig,
    ) -> ExperimentSelection {
        let chosen: Vec<&Experiment> = match experiment_ids {
            Some(ids) => ids
                .iter()
                .filter_map(|id| {
                    let found = self.get(id);
                    if found.is_none() {
                        debug!(experiment = %id, "Unknown experiment requested, skipping");
                    }
                    found
                })
                .collect(),
            None => self.experiments.iter().collect(),
        };

        let mut merged = base;
        let mut assignments = Vec::new();
        for experiment in chosen.into_iter().filter(|e| e.enabled) {
            if let Some(variant) = assign_variant(user_id, experiment) {
                merged.apply(&variant.fragment);
                assignments.push(ExperimentAssignment {
                    experiment_id: experiment.id.clone(),
                    variant: variant.name.clone(),
                });
            }
        }

        ExperimentSelection {
            assignments,
            merged,
        }
    }
}
