//! End-to-end test support for Cadence
//!
//! - `harness`: isolated SQLite-backed engines
//! - `mocks`: generated learners, concepts and review sequences

pub mod harness;
pub mod mocks;

pub use harness::TestDatabaseManager;
pub use mocks::{ReviewScript, TestDataFactory};
