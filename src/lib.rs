//! # csvremap - declarative CSV column remapping
//!
//! csvremap maps the rows of a CSV file into a new table whose columns are
//! derived from the input columns by a JSON transformation template. A
//! column can be renamed, exploded into several output columns through
//! pipeline expressions, combined with other columns into one output value,
//! or replaced by a constant. Passes can be cascaded so one transform's
//! output feeds the next.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│  Transform  │────▶│  CSV Output │
//! │  (auto-enc) │     │  (Dataset)  │     │ (template)  │     │ (quoted)    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use csvremap::{Remapper, Template};
//!
//! let mut remapper = Remapper::new();
//! remapper.load_data("input.csv")?;
//! remapper.apply(&Template::from_path("template.json")?, false)?;
//! remapper.save_data("output.csv")?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`dataset`] - The dataset value type
//! - [`parser`] - CSV reading/writing with auto-detection
//! - [`template`] - Template model, pipeline expressions, operation registry
//! - [`transform`] - Row evaluation, dataset passes, the `Remapper`

// Core modules
pub mod dataset;
pub mod error;

// Parsing
pub mod parser;

// Templates
pub mod template;

// Transformation
pub mod transform;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CsvError, CsvResult, DatasetError, RemapError, RemapResult, TemplateError, TemplateResult,
    TransformError, TransformResult,
};

// =============================================================================
// Re-exports - Dataset
// =============================================================================

pub use dataset::Dataset;

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, read_bytes_auto, read_path, read_str,
    write_path, write_str, ParsedCsv,
};

// =============================================================================
// Re-exports - Templates
// =============================================================================

pub use template::{
    example_template, operations_description, ColumnRule, CompiledTemplate, FieldRule, Op, Param,
    Pipeline, Template,
};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{apply_template, evaluate, Remapper};
