//! SM-2 Core Algorithm
//!
//! Pure functions over the scheduling state. Nothing here reads the clock
//! or touches storage.

use super::config::SchedulerConfig;
use super::quality::Quality;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Ease factor assigned to a concept on its first review
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Floor for the ease factor
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Lowest quality that counts as a successful recall
pub const SUCCESS_THRESHOLD: u8 = 3;

/// Interval after the first successful review
pub const FIRST_INTERVAL_DAYS: u32 = 1;

/// Interval after the second consecutive successful review
pub const SECOND_INTERVAL_DAYS: u32 = 6;

/// Interval after a lapse
pub const LAPSE_INTERVAL_DAYS: u32 = 1;

/// Upper bound on any interval (100 years)
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

// ============================================================================
// STATE
// ============================================================================

/// The numeric part of a schedule record that the algorithm evolves
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sm2State {
    pub ease_factor: f64,
    pub interval: u32,
    pub repetitions: u32,
}

impl Default for Sm2State {
    fn default() -> Self {
        Self {
            ease_factor: DEFAULT_EASE_FACTOR,
            interval: 0,
            repetitions: 0,
        }
    }
}

// ============================================================================
// CORE FUNCTIONS
// ============================================================================

/// Ease factor after a review of the given quality
///
/// EF' = max(min, EF + (0.1 - (5 - q) × (0.08 + (5 - q) × 0.02)))
pub fn next_ease_factor(ease_factor: f64, quality: Quality, minimum: f64) -> f64 {
    let miss = f64::from(Quality::MAX - quality.value());
    let updated = ease_factor + (0.1 - miss * (0.08 + miss * 0.02));
    updated.max(minimum)
}

/// Interval after a successful review, given the state before it
///
/// `ease_factor` is the pre-review ease factor.
pub fn success_interval(repetitions: u32, previous_interval: u32, ease_factor: f64, max_interval: u32) -> u32 {
    let interval = match repetitions {
        0 => FIRST_INTERVAL_DAYS,
        1 => SECOND_INTERVAL_DAYS,
        _ => {
            let grown = (f64::from(previous_interval) * ease_factor).round();
            // `as` saturates on overflow
            (grown as u32).max(previous_interval).max(FIRST_INTERVAL_DAYS)
        }
    };
    interval.min(max_interval)
}

/// Interval after a lapse
pub fn lapse_interval() -> u32 {
    LAPSE_INTERVAL_DAYS
}

/// Apply one review of `quality` to `state`
pub fn next_state(state: Sm2State, quality: Quality, config: &SchedulerConfig) -> Sm2State {
    let (interval, repetitions) = if quality.is_success(config.success_threshold) {
        (
            success_interval(
                state.repetitions,
                state.interval,
                state.ease_factor,
                config.maximum_interval_days,
            ),
            state.repetitions.saturating_add(1),
        )
    } else {
        (lapse_interval(), 0)
    };

    Sm2State {
        ease_factor: next_ease_factor(state.ease_factor, quality, config.minimum_ease_factor),
        interval,
        repetitions,
    }
}
