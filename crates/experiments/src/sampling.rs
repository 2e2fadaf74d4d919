//! Diagnostics sampling.
//!
//! Interesting calls are always recorded; the rest are sampled at the base
//! rate. The decision never changes the result a caller sees.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use stride_core::{FallbackLevel, SampleReason};

/// What the sampler needs to know about a finished call.
#[derive(Debug, Clone)]
pub struct SamplingInput {
    pub had_error: bool,
    pub fallback_level: FallbackLevel,
    pub account_created_at: Option<DateTime<Utc>>,
    pub has_feedback: bool,
    pub now: DateTime<Utc>,
}

impl SamplingInput {
    pub fn new(fallback_level: FallbackLevel) -> Self {
        Self {
            had_error: false,
            fallback_level,
            account_created_at: None,
            has_feedback: false,
            now: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingPolicy {
    /// Probability of recording an unremarkable call.
    #[serde(default = "default_base_rate")]
    pub base_rate: f64,
    /// Accounts younger than this are always recorded.
    #[serde(default = "default_new_user_days")]
    pub new_user_days: i64,
}

fn default_base_rate() -> f64 {
    0.10
}

fn default_new_user_days() -> i64 {
    7
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self {
            base_rate: default_base_rate(),
            new_user_days: default_new_user_days(),
        }
    }
}

impl SamplingPolicy {
    /// Decide with an explicit roll in `[0, 1)`.
    pub fn decide(&self, input: &SamplingInput, roll: f64) -> Option<SampleReason> {
        if input.had_error {
            return Some(SampleReason::Error);
        }
        if input.fallback_level > FallbackLevel::FULL {
            return Some(SampleReason::Degraded);
        }
        if let Some(created) = input.account_created_at {
            if input.now - created < Duration::days(self.new_user_days) {
                return Some(SampleReason::NewUser);
            }
        }
        if input.has_feedback {
            return Some(SampleReason::Feedback);
        }
        (roll < self.base_rate).then_some(SampleReason::Random)
    }

    /// Decide with a fresh random roll.
    pub fn sample(&self, input: &SamplingInput) -> Option<SampleReason> {
        let roll = rand::rng().random::<f64>();
        self.decide(input, roll)
    }
}
