//! SM-2 (SuperMemo 2) Module
//!
//! Quality-driven review interval scheduling.
//!
//! ## Core Rules:
//! - Quality 0-5 per review; below 3 is a lapse
//! - Successful reviews grow the interval 1 day -> 6 days -> interval × EF
//! - A lapse resets repetitions to 0 and the interval to 1 day
//! - EF' = EF + (0.1 - (5 - q) × (0.08 + (5 - q) × 0.02)), floored at 1.3
//!
//! The same ease-factor formula applies to successes and lapses alike.

mod algorithm;
mod config;
mod quality;

pub use algorithm::{
    lapse_interval,
    // Core functions
    next_ease_factor,
    next_state,
    success_interval,
    Sm2State,
    // Constants
    DEFAULT_EASE_FACTOR,
    FIRST_INTERVAL_DAYS,
    LAPSE_INTERVAL_DAYS,
    MAX_INTERVAL_DAYS,
    MIN_EASE_FACTOR,
    SECOND_INTERVAL_DAYS,
    SUCCESS_THRESHOLD,
};

pub use config::{HistoryRetention, SchedulerConfig};
pub use quality::{Quality, ReviewObservation};
