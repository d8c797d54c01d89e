//! Encore CLI
//!
//! Command surface over the Encore libraries: list the challenge catalog,
//! show statistics and achievements, and play a challenge against the
//! simulated backend while progress is persisted to SQLite.

pub mod catalog;
pub mod commands;
pub mod config;

pub use commands::{PlayOptions, PlayOutcome, StatsReport};
pub use config::AppConfig;
