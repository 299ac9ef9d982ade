//! Batch crate for the ReelRecs recommendation engine.
//!
//! This crate contains the run configuration and the orchestrator that
//! drives one offline training run from raw files to persisted tables.

pub mod config;
pub mod orchestrator;

pub use config::PipelineConfig;
pub use orchestrator::{BatchOrchestrator, RUN_SUMMARY_FILE, RunSummary, StageTimings};
