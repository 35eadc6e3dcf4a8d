//! Per-row template evaluation.
//!
//! Turns one named input row into one output mapping according to the
//! compiled template's rules. Column-level policies live here: unmapped
//! input columns are silently dropped, and colliding output names are
//! resolved later-wins (later per input header order across columns, later
//! per lexicographic field order within one column).

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{TransformError, TransformResult};
use crate::template::{ColumnRule, CompiledTemplate, FieldRule};

/// Evaluate one row against a compiled template.
///
/// `input_columns` fixes the evaluation order; `input_row` is the same row
/// keyed by column name. The result maps output column names to values,
/// ordered lexicographically (which is also the output header order).
pub fn evaluate(
    input_row: &Map<String, Value>,
    input_columns: &[String],
    template: &CompiledTemplate,
) -> TransformResult<BTreeMap<String, Value>> {
    let mut output = BTreeMap::new();

    for column in input_columns {
        let rule = match template.rule(column) {
            Some(rule) => rule,
            // Unmapped input columns produce no output.
            None => continue,
        };

        let value = input_row
            .get(column)
            .cloned()
            .ok_or_else(|| TransformError::MissingColumn(column.clone()))?;

        match rule {
            ColumnRule::Rename(target) => {
                output.insert(target.clone(), value);
            }
            ColumnRule::Fields(fields) => {
                for (out_name, field) in fields {
                    let produced = match field {
                        FieldRule::Apply(pipeline) => pipeline
                            .eval(std::slice::from_ref(&value))
                            .map_err(|message| TransformError::Execution {
                                column: column.clone(),
                                message,
                            })?,
                        FieldRule::Combine { args, func } => {
                            let mut gathered = Vec::with_capacity(args.len());
                            for arg in args {
                                let arg_value = input_row.get(arg).cloned().ok_or_else(|| {
                                    TransformError::MissingColumn(arg.clone())
                                })?;
                                gathered.push(arg_value);
                            }
                            func.eval(&gathered).map_err(|message| {
                                TransformError::Execution {
                                    column: column.clone(),
                                    message,
                                }
                            })?
                        }
                        FieldRule::Literal(v) => v.clone(),
                    };
                    output.insert(out_name.clone(), produced);
                }
            }
        }
    }

    Ok(output)
}
