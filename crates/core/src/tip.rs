//! The tip: the pipeline's only user-facing deliverable.

use serde::{Deserialize, Serialize};

/// A single actionable recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tip {
    pub title: String,
    pub message: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl Tip {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            category: category.into(),
            action: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Title, message and category are all non-blank.
    pub fn is_well_formed(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.message.trim().is_empty()
            && !self.category.trim().is_empty()
    }
}
