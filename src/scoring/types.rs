use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CONFIDENCE_HIGH, DEFAULT_CONFIDENCE_LOW, DEFAULT_CONFIDENCE_MEDIUM, is_unit_interval,
};

use super::error::ScoringError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Qualitative confidence in an answer. Ordered `Low < Medium < High`.
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceTier::Low => "low",
            ConfidenceTier::Medium => "medium",
            ConfidenceTier::High => "high",
        }
    }

    /// Lowers `self` to at most `ceiling`.
    #[inline]
    pub fn capped_at(self, ceiling: ConfidenceTier) -> ConfidenceTier {
        self.min(ceiling)
    }
}

impl std::fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Score thresholds separating the tiers.
pub struct ConfidenceThresholds {
    /// Minimum top score for [`ConfidenceTier::High`].
    pub high: f32,
    /// Minimum score of a corroborating chunk.
    pub medium: f32,
    /// Top scores below this are [`ConfidenceTier::Low`].
    pub low: f32,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: DEFAULT_CONFIDENCE_HIGH,
            medium: DEFAULT_CONFIDENCE_MEDIUM,
            low: DEFAULT_CONFIDENCE_LOW,
        }
    }
}

impl ConfidenceThresholds {
    pub fn new(high: f32, medium: f32, low: f32) -> Result<Self, ScoringError> {
        let thresholds = Self { high, medium, low };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        for (name, value) in [("high", self.high), ("medium", self.medium), ("low", self.low)] {
            if !is_unit_interval(value) {
                return Err(ScoringError::OutOfRange { name, value });
            }
        }
        if !(self.low <= self.medium && self.medium <= self.high) {
            return Err(ScoringError::Unordered {
                low: self.low,
                medium: self.medium,
                high: self.high,
            });
        }
        Ok(())
    }
}
