//! Post-processing of trained models into ranked, persisted tables.
//!
//! This crate provides:
//! - Filter trait and implementations for candidate filtering
//! - FilterPipeline for composing filters
//! - In-sample evaluation of the content models
//! - Top-N ranking for both model families and for observed ratings
//! - Gzip CSV persistence of the resulting tables
//!
//! ## Architecture
//! For every user the pipeline runs in stages:
//! 1. A model produces candidate scores (content: all items, collaborative: anti-testset)
//! 2. Filters remove non-finite scores and items the user already rated
//! 3. The survivors are ranked and cut to the top N
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{content_top_n, persist, TOP_N};
//!
//! let table = content_top_n(&index, &models, &features, TOP_N)?;
//! persist::write_top_n(&out.join(persist::CONTENT_TABLE_FILE), persist::SCORE_COLUMN, &table)?;
//! ```

pub mod traits;
pub mod filters;
pub mod filter_pipeline;
pub mod evaluation;
pub mod top_n;
pub mod recommend;
pub mod persist;

// Re-export main types
pub use traits::{Filter, UserContext};
pub use filter_pipeline::FilterPipeline;
pub use evaluation::{CombinedGrid, EvaluationReport, UserEvaluation, evaluate_in_sample};
pub use top_n::{TOP_N, TopNTable, group_top_n, top_n, top_rated};
pub use recommend::{collaborative_top_n, content_top_n};
pub use persist::{TableRow, read_table, write_file_atomic, write_table, write_top_n};
