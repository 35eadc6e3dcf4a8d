//! Transformation module.
//!
//! This module applies compiled templates to datasets:
//! - Evaluator: one input row to one output mapping
//! - Pipeline: dataset-level passes, cascading, and the `Remapper` surface

pub mod evaluator;
pub mod pipeline;

pub use evaluator::evaluate;
pub use pipeline::{apply_template, Remapper};
