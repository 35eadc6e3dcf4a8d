//! Template document model and compilation.
//!
//! A raw template is a JSON object mapping input column names to output
//! field descriptions. Compilation walks that document once per apply-call
//! and resolves every pipeline-expression leaf against the operation
//! registry, producing a [`CompiledTemplate`] of typed rules.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{json, Value};

use super::expr::Pipeline;
use crate::error::{TemplateError, TemplateResult};

/// A raw transformation template, as parsed from a JSON document.
///
/// Holding the raw [`Value`] keeps loading cheap; all structural validation
/// happens in [`Template::compile`]. Templates are compiled fresh on every
/// apply-call and never cached across calls.
#[derive(Debug, Clone)]
pub struct Template {
    raw: Value,
}

impl Template {
    /// Wrap an already-parsed JSON document.
    pub fn from_value(raw: Value) -> Self {
        Self { raw }
    }

    /// Parse a template from JSON text.
    pub fn from_json(text: &str) -> TemplateResult<Self> {
        Ok(Self {
            raw: serde_json::from_str(text)?,
        })
    }

    /// Load a template from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> TemplateResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// The raw document.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Compile the raw document into typed rules.
    ///
    /// The walk builds a new structure; the raw document is left untouched.
    /// Compiling the same template twice yields rules that evaluate
    /// identically.
    pub fn compile(&self) -> TemplateResult<CompiledTemplate> {
        let root = self.raw.as_object().ok_or_else(|| {
            TemplateError::Format("template root must be an object mapping input columns".into())
        })?;

        let mut rules = BTreeMap::new();
        for (column, description) in root {
            rules.insert(column.clone(), compile_column(column, description)?);
        }

        Ok(CompiledTemplate { rules })
    }
}

/// A compiled template: one rule per mapped input column.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    rules: BTreeMap<String, ColumnRule>,
}

impl CompiledTemplate {
    /// Look up the rule for an input column, if any.
    pub fn rule(&self, column: &str) -> Option<&ColumnRule> {
        self.rules.get(column)
    }

    /// Number of mapped input columns.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when no input column is mapped.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// How one input column contributes to the output row.
#[derive(Debug, Clone)]
pub enum ColumnRule {
    /// Copy the input value unchanged under a new column name.
    Rename(String),

    /// Derive one or more output fields, keyed by output column name.
    Fields(BTreeMap<String, FieldRule>),
}

/// How one output field is produced.
#[derive(Debug, Clone)]
pub enum FieldRule {
    /// Run a pipeline over the owning input column's value (explode).
    Apply(Pipeline),

    /// Gather the named input columns and run an n-ary pipeline (combine).
    Combine { args: Vec<String>, func: Pipeline },

    /// Emit this value verbatim for every row.
    Literal(Value),
}

fn compile_column(column: &str, description: &Value) -> TemplateResult<ColumnRule> {
    match description {
        Value::String(target) => Ok(ColumnRule::Rename(target.clone())),
        Value::Object(fields) => {
            let mut compiled = BTreeMap::new();
            for (out_name, spec) in fields {
                compiled.insert(out_name.clone(), compile_field(column, out_name, spec)?);
            }
            Ok(ColumnRule::Fields(compiled))
        }
        _ => Err(TemplateError::Format(format!(
            "column '{}': description must be a rename string or a field object",
            column
        ))),
    }
}

fn compile_field(column: &str, out_name: &str, spec: &Value) -> TemplateResult<FieldRule> {
    match spec {
        // Explode: pipeline over the single input value.
        Value::String(text) => Ok(FieldRule::Apply(Pipeline::compile(text, 1)?)),

        // Objects in field-spec position are always combine specs; a
        // malformed one is an error, never a silent literal.
        Value::Object(map) => {
            for key in map.keys() {
                if key != "args" && key != "func" {
                    return Err(TemplateError::Format(format!(
                        "combine spec '{}.{}': unexpected key '{}'",
                        column, out_name, key
                    )));
                }
            }

            let args = match map.get("args") {
                Some(Value::Array(items)) => {
                    let mut args = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            Value::String(name) => args.push(name.clone()),
                            _ => {
                                return Err(TemplateError::Format(format!(
                                    "combine spec '{}.{}': 'args' entries must be column names",
                                    column, out_name
                                )));
                            }
                        }
                    }
                    args
                }
                Some(_) => {
                    return Err(TemplateError::Format(format!(
                        "combine spec '{}.{}': 'args' must be an array of column names",
                        column, out_name
                    )));
                }
                None => {
                    return Err(TemplateError::Format(format!(
                        "combine spec '{}.{}': missing 'args'",
                        column, out_name
                    )));
                }
            };

            if args.is_empty() {
                return Err(TemplateError::Format(format!(
                    "combine spec '{}.{}': 'args' must name at least one column",
                    column, out_name
                )));
            }

            let func = match map.get("func") {
                Some(Value::String(text)) => Pipeline::compile(text, args.len())?,
                Some(_) => {
                    return Err(TemplateError::Format(format!(
                        "combine spec '{}.{}': 'func' must be a pipeline string",
                        column, out_name
                    )));
                }
                None => {
                    return Err(TemplateError::Format(format!(
                        "combine spec '{}.{}': missing 'func'",
                        column, out_name
                    )));
                }
            };

            Ok(FieldRule::Combine { args, func })
        }

        // Everything else is a constant output value.
        other => Ok(FieldRule::Literal(other.clone())),
    }
}

/// A worked example template, for documentation and the CLI.
pub fn example_template() -> Template {
    Template::from_value(json!({
        "address": {
            "door": "split(', ') | nth(0)",
            "street": "split(', ') | nth(1)",
            "city": "split(', ') | nth(2)",
            "state": "split(', ') | nth(3)",
            "country": "split(', ') | nth(4)"
        },
        "name": "full_name",
        "first_name": {
            "display_name": {
                "args": ["first_name", "last_name"],
                "func": "concat(' ') | concat(_1)"
            }
        },
        "reference": {
            "reference": "trim | replace('[-. ]', '') | prefix('R')"
        },
        "batch": {
            "import_batch": 1
        }
    }))
}
