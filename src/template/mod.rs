//! Declarative transformation templates.
//!
//! This module provides:
//! - `model`: the raw template document and its compiled, typed form
//! - `expr`: the pipeline expression mini-language
//! - `ops`: the registry of named operations pipelines can use
//!
//! ## Usage Flow
//!
//! ```text
//! JSON document → Template::from_json → Template::compile → CompiledTemplate
//! ```
//!
//! A template maps each input column to either a rename string or a set of
//! output fields. Field specs are pipeline-expression strings (explode),
//! `{args, func}` objects (combine), or plain JSON values (literals):
//!
//! ```json
//! {
//!     "address": {
//!         "door": "split(', ') | nth(0)",
//!         "street": "split(', ') | nth(1)"
//!     },
//!     "name": "full_name",
//!     "first_name": {
//!         "display_name": {"args": ["first_name", "last_name"],
//!                          "func": "concat(' ') | concat(_1)"}
//!     }
//! }
//! ```

pub mod expr;
pub mod model;
pub mod ops;

// Re-exports for convenience
pub use expr::Pipeline;
pub use model::{example_template, ColumnRule, CompiledTemplate, FieldRule, Template};
pub use ops::{operations_description, Op, Param};
