//! Domain-agnostic risk classification.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    /// Terms that triggered the level, in match order.
    pub matched: Vec<String>,
}

impl RiskAssessment {
    pub fn low() -> Self {
        Self {
            level: RiskLevel::Low,
            matched: Vec::new(),
        }
    }
}

/// Classifies a candidate recommendation by how risky acting on it is.
pub trait RiskClassifier: Send + Sync {
    fn name(&self) -> &str;

    fn classify(&self, text: &str) -> RiskAssessment;
}

/// Case-insensitive keyword matching against two term lists.
#[derive(Debug, Clone)]
pub struct KeywordRiskClassifier {
    high: Vec<String>,
    medium: Vec<String>,
}

impl Default for KeywordRiskClassifier {
    fn default() -> Self {
        Self::new(
            [
                "payday loan",
                "gambling",
                "casino",
                "betting",
                "guaranteed return",
                "get rich quick",
                "skip rent",
                "max out",
            ],
            [
                "crypto",
                "leverage",
                "margin trading",
                "options trading",
                "borrow",
                "credit card",
                "all-nighter",
            ],
        )
    }
}

impl KeywordRiskClassifier {
    pub fn new<H, M, S>(high: H, medium: M) -> Self
    where
        H: IntoIterator<Item = S>,
        M: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lower = |s: S| s.into().to_lowercase();
        Self {
            high: high.into_iter().map(lower).collect(),
            medium: medium.into_iter().map(lower).collect(),
        }
    }
}

impl RiskClassifier for KeywordRiskClassifier {
    fn name(&self) -> &str {
        "keyword"
    }

    fn classify(&self, text: &str) -> RiskAssessment {
        let text = text.to_lowercase();
        let hits = |terms: &[String]| -> Vec<String> {
            terms.iter().filter(|t| text.contains(t.as_str())).cloned().collect()
        };

        let high = hits(&self.high);
        if !high.is_empty() {
            return RiskAssessment {
                level: RiskLevel::High,
                matched: high,
            };
        }

        let medium = hits(&self.medium);
        if !medium.is_empty() {
            return RiskAssessment {
                level: RiskLevel::Medium,
                matched: medium,
            };
        }

        RiskAssessment::low()
    }
}
