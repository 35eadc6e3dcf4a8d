//! Error types for the csvremap transformation engine.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`CsvError`] - CSV parsing and serialization errors
//! - [`DatasetError`] - dataset shape invariant violations
//! - [`TemplateError`] - template loading and compilation errors
//! - [`TransformError`] - per-row evaluation errors
//! - [`RemapError`] - top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors during CSV parsing and serialization.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read or write a file.
    #[error("Failed to access file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to decode the file's byte encoding.
    #[error("Failed to decode input: {0}")]
    EncodingError(String),

    /// Malformed row on input.
    #[error("Invalid CSV row: {0}")]
    ParseError(String),

    /// Failed to serialize a row on output.
    #[error("Cannot serialize row: {0}")]
    SerializeError(String),

    /// Empty file.
    #[error("CSV input is empty")]
    EmptyInput,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,
}

// =============================================================================
// Dataset Errors
// =============================================================================

/// Errors constructing a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// A row's length does not match the header length.
    #[error("Row {row} has {actual} values, expected {expected}")]
    RowLength {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

// =============================================================================
// Template Errors
// =============================================================================

/// Errors loading or compiling a transformation template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A pipeline expression failed to compile.
    #[error("Invalid pipeline expression '{text}': {message}")]
    Compile { text: String, message: String },

    /// A structurally malformed template node (e.g. combine spec without `func`).
    #[error("Invalid template: {0}")]
    Format(String),

    /// The template document is not valid JSON.
    #[error("Template JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Failed to read the template file.
    #[error("Failed to read template: {0}")]
    IoError(#[from] std::io::Error),
}

// =============================================================================
// Transform Errors
// =============================================================================

/// Errors during row evaluation.
#[derive(Debug, Error)]
pub enum TransformError {
    /// A combine spec references a column missing from the input.
    #[error("Missing source column: {0}")]
    MissingColumn(String),

    /// An operation failed while evaluating a row.
    #[error("Operation failed on column '{column}': {message}")]
    Execution { column: String, message: String },

    /// A later row does not cover the output header fixed by the first row.
    #[error("Row {row} produced no value for output column '{column}' fixed by the first row")]
    InconsistentRow { row: usize, column: String },
}

// =============================================================================
// Remap Errors (top-level)
// =============================================================================

/// Top-level orchestration errors.
///
/// This is the main error type returned by [`crate::transform::Remapper`].
/// It wraps all lower-level errors and adds remapper-specific variants.
#[derive(Debug, Error)]
pub enum RemapError {
    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Dataset shape error.
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// Template error.
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Transformation error.
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// No dataset has been loaded yet.
    #[error("No input dataset loaded")]
    NoInput,

    /// Cascade requested with no previous apply-call's output available.
    #[error("Cascade requested but no prior output exists")]
    NoPriorOutput,

    /// No output produced yet.
    #[error("No output dataset available")]
    NoOutput,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Result type for transformation operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for top-level remap operations.
pub type RemapResult<T> = Result<T, RemapError>;
