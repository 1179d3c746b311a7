//! Scheduler configuration

use serde::{Deserialize, Serialize};

use super::algorithm::{DEFAULT_EASE_FACTOR, MAX_INTERVAL_DAYS, MIN_EASE_FACTOR, SUCCESS_THRESHOLD};
use super::quality::Quality;
use crate::error::EngineError;
use crate::schedule::PerformanceEntry;

/// How much performance history a record keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum HistoryRetention {
    /// Keep every observation
    #[default]
    Unbounded,
    /// Keep only the most recent `count` observations
    KeepLast { count: usize },
}

impl HistoryRetention {
    /// Drop the oldest entries that fall outside the policy
    pub fn apply(&self, history: &mut Vec<PerformanceEntry>) {
        if let HistoryRetention::KeepLast { count } = *self {
            if history.len() > count {
                let excess = history.len() - count;
                history.drain(..excess);
            }
        }
    }
}

/// Tunables for the review scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Ease factor of a freshly created record
    pub initial_ease_factor: f64,
    /// Floor for the ease factor
    pub minimum_ease_factor: f64,
    /// Lowest quality counted as a successful recall
    pub success_threshold: u8,
    /// Cap on any computed interval, at most [`MAX_INTERVAL_DAYS`]
    pub maximum_interval_days: u32,
    /// Performance history retention
    pub history_retention: HistoryRetention,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_ease_factor: DEFAULT_EASE_FACTOR,
            minimum_ease_factor: MIN_EASE_FACTOR,
            success_threshold: SUCCESS_THRESHOLD,
            maximum_interval_days: MAX_INTERVAL_DAYS,
            history_retention: HistoryRetention::Unbounded,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.minimum_ease_factor.is_finite() || self.minimum_ease_factor <= 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "minimum_ease_factor must be positive, got {}",
                self.minimum_ease_factor
            )));
        }
        if !self.initial_ease_factor.is_finite() || self.initial_ease_factor < self.minimum_ease_factor {
            return Err(EngineError::InvalidConfig(format!(
                "initial_ease_factor {} is below minimum_ease_factor {}",
                self.initial_ease_factor, self.minimum_ease_factor
            )));
        }
        if self.success_threshold == 0 || self.success_threshold > Quality::MAX {
            return Err(EngineError::InvalidConfig(format!(
                "success_threshold must be within 1..={}, got {}",
                Quality::MAX,
                self.success_threshold
            )));
        }
        if !(1..=MAX_INTERVAL_DAYS).contains(&self.maximum_interval_days) {
            return Err(EngineError::InvalidConfig(format!(
                "maximum_interval_days must be within 1..={}, got {}",
                MAX_INTERVAL_DAYS, self.maximum_interval_days
            )));
        }
        if let HistoryRetention::KeepLast { count: 0 } = self.history_retention {
            return Err(EngineError::InvalidConfig(
                "history retention must keep at least one observation".to_string(),
            ));
        }
        Ok(())
    }
}
