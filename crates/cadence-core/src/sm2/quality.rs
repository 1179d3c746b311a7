//! Recall quality and review observations
//!
//! Quality ratings (0-5):
//! - 0: Complete blackout, no recall
//! - 1: Incorrect, but remembered once the answer was shown
//! - 2: Incorrect, but the answer felt familiar
//! - 3: Correct with serious difficulty
//! - 4: Correct after hesitation
//! - 5: Perfect, effortless recall
//!
//! Out-of-range numbers are clamped, never rejected. Only input that is not
//! a number at all is an [`EngineError::InvalidObservation`].

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;

/// Recall quality, always within 0..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 5;

    /// Clamp any integer into the accepted range
    pub fn new(raw: i64) -> Self {
        Self(raw.clamp(i64::from(Self::MIN), i64::from(Self::MAX)) as u8)
    }

    /// Round and clamp a floating-point score; NaN and infinities are rejected
    pub fn from_f64(raw: f64) -> Result<Self, EngineError> {
        if !raw.is_finite() {
            return Err(EngineError::InvalidObservation(format!(
                "quality must be a finite number, got {}",
                raw
            )));
        }
        let clamped = raw.round().clamp(f64::from(Self::MIN), f64::from(Self::MAX));
        Ok(Self(clamped as u8))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Whether this quality counts as a successful recall under `threshold`
    pub fn is_success(self, threshold: u8) -> bool {
        self.0 >= threshold
    }

    /// Every quality value, lowest first
    pub fn all() -> impl Iterator<Item = Quality> {
        (Self::MIN..=Self::MAX).map(Quality)
    }
}

impl From<i64> for Quality {
    fn from(raw: i64) -> Self {
        Self::new(raw)
    }
}

impl From<u8> for Quality {
    fn from(raw: u8) -> Self {
        Self::new(i64::from(raw))
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

impl FromStr for Quality {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(raw) = trimmed.parse::<i64>() {
            return Ok(Self::new(raw));
        }
        match trimmed.parse::<f64>() {
            Ok(raw) => Self::from_f64(raw),
            Err(_) => Err(EngineError::InvalidObservation(format!(
                "quality must be numeric, got '{}'",
                s
            ))),
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// OBSERVATION
// ============================================================================

/// One answered review prompt as reported by the completion handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewObservation {
    pub quality: Quality,
    /// Stored for analytics only; does not affect scheduling
    pub response_time_ms: Option<u64>,
}

impl ReviewObservation {
    pub fn new(quality: impl Into<Quality>) -> Self {
        Self {
            quality: quality.into(),
            response_time_ms: None,
        }
    }

    pub fn with_response_time(mut self, response_time: Duration) -> Self {
        self.response_time_ms = Some(u64::try_from(response_time.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_response_time_ms(mut self, millis: u64) -> Self {
        self.response_time_ms = Some(millis);
        self
    }

    /// Parse a `{ "quality": .., "responseTime": .. }` payload
    ///
    /// `quality` may be a JSON number or a numeric string. `responseTime` is
    /// optional milliseconds and must be non-negative when present.
    pub fn from_json(value: &Value) -> Result<Self, EngineError> {
        let object = value.as_object().ok_or_else(|| {
            EngineError::InvalidObservation("observation must be a JSON object".to_string())
        })?;

        let quality = match object.get("quality") {
            Some(Value::Number(n)) => match n.as_i64() {
                Some(raw) => Quality::new(raw),
                None => Quality::from_f64(n.as_f64().unwrap_or(f64::NAN))?,
            },
            Some(Value::String(s)) => s.parse()?,
            Some(other) => {
                return Err(EngineError::InvalidObservation(format!(
                    "quality must be numeric, got {}",
                    other
                )));
            }
            None => {
                return Err(EngineError::InvalidObservation(
                    "missing quality".to_string(),
                ));
            }
        };

        let response_time_ms = match object.get("responseTime") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => {
                let millis = n.as_f64().unwrap_or(f64::NAN);
                if !millis.is_finite() || millis < 0.0 {
                    return Err(EngineError::InvalidObservation(format!(
                        "responseTime must be a non-negative number of milliseconds, got {}",
                        n
                    )));
                }
                Some(millis.round() as u64)
            }
            Some(other) => {
                return Err(EngineError::InvalidObservation(format!(
                    "responseTime must be numeric, got {}",
                    other
                )));
            }
        };

        Ok(Self {
            quality,
            response_time_ms,
        })
    }
}
