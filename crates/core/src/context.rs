//! Per-request context: the snapshot every pipeline stage reads from.
//!
//! A [`Context`] is rebuilt on every call: the domain strategy loads a
//! [`UserSnapshot`] from the store, trims it to what the domain needs, and
//! the caller's live override payload is deep-merged on top.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::DomainId;

/// One weekly energy reading. Levels are on a 0–100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyEntry {
    pub week: u32,
    pub level: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

impl EnergyEntry {
    pub fn new(week: u32, level: f64) -> Self {
        Self {
            week,
            level,
            date: None,
        }
    }
}

/// A savings goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub name: String,
    pub target_amount: f64,
    #[serde(default)]
    pub current_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    /// Planned weekly contribution, if the user set one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_target: Option<f64>,
}

impl Goal {
    pub fn remaining(&self) -> f64 {
        (self.target_amount - self.current_amount).max(0.0)
    }
}

/// An item the user could sell or trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: String,
    pub estimated_value: f64,
}

/// Everything the store knows about a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSnapshot {
    /// Weekly energy readings, most recent last.
    #[serde(default)]
    pub energy_history: Vec<EnergyEntry>,

    #[serde(default)]
    pub monthly_income: f64,

    #[serde(default)]
    pub monthly_expenses: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_hours_per_week: Option<f64>,

    #[serde(default)]
    pub goals: Vec<Goal>,

    #[serde(default)]
    pub inventory: Vec<InventoryItem>,

    #[serde(default)]
    pub skills: Vec<String>,

    /// Explicit savings shortfall; derived from goals when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub savings_deficit: Option<f64>,

    /// Forecast capacity for the coming weeks (0–100), nearest week first.
    #[serde(default)]
    pub upcoming_capacity: Vec<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_created_at: Option<DateTime<Utc>>,

    /// Explicit feedback attached to this request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,

    /// Domain-specific fields this crate does not model.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl UserSnapshot {
    /// Monthly income minus monthly expenses.
    pub fn margin(&self) -> f64 {
        self.monthly_income - self.monthly_expenses
    }

    /// The energy series as bare levels, most recent last.
    pub fn energy_levels(&self) -> Vec<f64> {
        self.energy_history.iter().map(|e| e.level).collect()
    }

    /// The most recent energy level, if any.
    pub fn current_energy(&self) -> Option<f64> {
        self.energy_history.last().map(|e| e.level)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// The ephemeral per-request snapshot keyed by (user, domain).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub user_id: String,
    pub domain: DomainId,
    #[serde(flatten)]
    pub data: UserSnapshot,
}

impl Context {
    pub fn new(user_id: impl Into<String>, domain: DomainId, data: UserSnapshot) -> Self {
        Self {
            user_id: user_id.into(),
            domain,
            data,
        }
    }

    /// A context with no stored data, used when loading is abandoned.
    pub fn empty(user_id: impl Into<String>, domain: DomainId) -> Self {
        Self::new(user_id, domain, UserSnapshot::default())
    }

    /// Deep-merge a live override payload on top of the stored data.
    ///
    /// Objects merge key by key; arrays and scalars in the override replace
    /// the stored value. `user_id` and `domain` can never be overridden.
    pub fn with_override(self, overlay: &Value) -> crate::Result<Self> {
        if overlay.is_null() {
            return Ok(self);
        }
        if !overlay.is_object() {
            return Err(crate::Error::Internal(
                "context override must be a JSON object".into(),
            ));
        }

        let user_id = self.user_id.clone();
        let domain = self.domain;
        let mut base = serde_json::to_value(&self)?;
        merge_json(&mut base, overlay);

        let mut merged: Context = serde_json::from_value(base)?;
        merged.user_id = user_id;
        merged.domain = domain;
        tracing::debug!(user_id = %merged.user_id, domain = %merged.domain, "Context override merged");
        Ok(merged)
    }
}

/// Recursively merge `overlay` into `base`.
fn merge_json(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}
