//! Test data generation


pub use fixtures::{ReviewScript, TestDataFactory};
