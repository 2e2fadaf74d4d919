//! The guardian validator.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::risk::{KeywordRiskClassifier, RiskClassifier, RiskLevel};
use crate::rules::{GuardianInput, ValidationRule};

const STARTING_CONFIDENCE: f64 = 0.8;
const LOW_CAPACITY: f64 = 30.0;
const LOW_HOURS: f64 = 5.0;
const DEFICIT_FLOOR: f64 = -100.0;
const TIMELINE_MARGIN_FACTOR: f64 = 1.5;
const DEFAULT_VALUATION_CEILING: f64 = 5000.0;

const SPECULATIVE_TERMS: &[&str] = &[
    "invest",
    "stock",
    "shares",
    "crypto",
    "bitcoin",
    "trading",
    "speculat",
    "etf",
];

/// Outcome of validating one candidate recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub issues: Vec<String>,
    /// Rule names in evaluation order, ending with `risk`.
    pub rules_applied: Vec<String>,
}

/// Validates candidate recommendations against strategy rules plus a
/// general risk pass.
#[derive(Clone)]
pub struct Guardian {
    classifier: Arc<dyn RiskClassifier>,
    valuation_ceiling: f64,
}

impl std::fmt::Debug for Guardian {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guardian")
            .field("classifier", &self.classifier.name())
            .field("valuation_ceiling", &self.valuation_ceiling)
            .finish()
    }
}

impl Default for Guardian {
    fn default() -> Self {
        Self::new(Arc::new(KeywordRiskClassifier::default()))
    }
}

impl Guardian {
    pub fn new(classifier: Arc<dyn RiskClassifier>) -> Self {
        Self {
            classifier,
            valuation_ceiling: DEFAULT_VALUATION_CEILING,
        }
    }

    pub fn with_valuation_ceiling(mut self, ceiling: f64) -> Self {
        self.valuation_ceiling = ceiling;
        self
    }

    /// Validate `text` under the enabled `rules`.
    pub fn validate(
        &self,
        text: &str,
        rules: &[ValidationRule],
        input: &GuardianInput,
        min_confidence: f64,
    ) -> ValidationResult {
        let mut result = ValidationResult {
            passed: true,
            confidence: STARTING_CONFIDENCE,
            issues: Vec::new(),
            rules_applied: Vec::new(),
        };

        for rule in rules {
            match rule {
                ValidationRule::Feasibility => self.check_feasibility(input, &mut result),
                ValidationRule::Solvency => self.check_solvency(text, input, &mut result),
                ValidationRule::Realism => self.check_realism(input, &mut result),
                ValidationRule::Timeline => self.check_timeline(input, &mut result),
            }
            result.rules_applied.push(rule.name().to_string());
        }

        let risk = self.classifier.classify(text);
        match risk.level {
            RiskLevel::High => {
                result.passed = false;
                result
                    .issues
                    .push(format!("High-risk advice: {}", risk.matched.join(", ")));
            }
            RiskLevel::Medium => {
                result.confidence -= 0.1;
                result
                    .issues
                    .push(format!("Risky advice: {}", risk.matched.join(", ")));
            }
            RiskLevel::Low => {}
        }
        result.rules_applied.push("risk".to_string());

        result.confidence = result.confidence.clamp(0.0, 1.0);
        if result.confidence < min_confidence {
            result.passed = false;
        }

        if result.passed {
            debug!(confidence = result.confidence, "Guardian passed candidate");
        } else {
            info!(
                confidence = result.confidence,
                issues = result.issues.len(),
                "Guardian blocked candidate"
            );
        }
        result
    }

    fn check_feasibility(&self, input: &GuardianInput, result: &mut ValidationResult) {
        if let Some(capacity) = input.capacity.filter(|c| *c < LOW_CAPACITY) {
            result.confidence -= 0.2;
            result
                .issues
                .push(format!("Energy at {capacity:.0} is too low for demanding actions"));
        }
        if let Some(hours) = input.available_hours.filter(|h| *h < LOW_HOURS) {
            result.confidence -= 0.1;
            result
                .issues
                .push(format!("Only {hours:.1} hours available per week"));
        }
    }

    fn check_solvency(&self, text: &str, input: &GuardianInput, result: &mut ValidationResult) {
        if input.margin >= DEFICIT_FLOOR {
            return;
        }
        result.confidence -= 0.2;

        let lower = text.to_lowercase();
        if SPECULATIVE_TERMS.iter().any(|t| lower.contains(t)) {
            result.passed = false;
            result.issues.push(format!(
                "Speculative advice while running a monthly deficit of {:.0}",
                -input.margin
            ));
        }
    }

    fn check_realism(&self, input: &GuardianInput, result: &mut ValidationResult) {
        if let Some(max) = input
            .valuations
            .iter()
            .copied()
            .filter(|v| *v > self.valuation_ceiling)
            .reduce(f64::max)
        {
            result.confidence -= 0.15;
            result.issues.push(format!(
                "Valuation of {max:.0} exceeds the ceiling of {:.0}",
                self.valuation_ceiling
            ));
        }
    }

    fn check_timeline(&self, input: &GuardianInput, result: &mut ValidationResult) {
        for goal in input.goals.iter().filter(|g| g.remaining > 0.0) {
            let required = goal.remaining / goal.months_left.max(1.0);
            if required > TIMELINE_MARGIN_FACTOR * input.margin {
                result.confidence -= 0.1;
                result.issues.push(format!(
                    "Goal '{}' needs {required:.0}/month against a margin of {:.0}",
                    goal.name, input.margin
                ));
            }
        }
    }
}
