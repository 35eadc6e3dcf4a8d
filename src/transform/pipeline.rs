//! Dataset-level transformation and the stateful remapper surface.
//!
//! [`apply_template`] is the engine: a pure function from one dataset and a
//! compiled template to a fresh dataset. [`Remapper`] is a thin wrapper that
//! threads datasets between calls so callers get the classic
//! load / apply / cascade / save surface without the engine itself holding
//! any hidden state.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::dataset::Dataset;
use crate::error::{CsvError, RemapError, RemapResult, TransformError, TransformResult};
use crate::parser;
use crate::template::{CompiledTemplate, Template};

use super::evaluator::evaluate;

/// Transform every row of a dataset with a compiled template.
///
/// The output header is fixed by the first processed row: the sorted
/// sequence of its output column names. Every subsequent row is projected
/// onto that header; a row lacking one of the fixed columns fails with
/// [`TransformError::InconsistentRow`], extra columns are dropped.
///
/// An input with no rows produces an empty dataset.
pub fn apply_template(data: &Dataset, template: &CompiledTemplate) -> TransformResult<Dataset> {
    if data.is_empty() {
        return Ok(Dataset::empty());
    }

    let mut columns: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(data.len());

    for index in 0..data.len() {
        let input_row = data.row_map(index);
        let mut output = evaluate(&input_row, data.columns(), template)?;

        if index == 0 {
            // BTreeMap keys are already sorted, so this is the sorted header.
            columns = output.keys().cloned().collect();
        }

        rows.push(project_row(&columns, output, index)?);
    }

    Ok(Dataset::from_parts(columns, rows))
}

/// Project one row's output mapping onto the fixed header.
///
/// A missing key fails the whole pass; extra keys are dropped.
fn project_row(
    columns: &[String],
    mut output: BTreeMap<String, Value>,
    row: usize,
) -> TransformResult<Vec<Value>> {
    let mut values = Vec::with_capacity(columns.len());
    for column in columns {
        let value = output
            .remove(column)
            .ok_or_else(|| TransformError::InconsistentRow {
                row,
                column: column.clone(),
            })?;
        values.push(value);
    }
    Ok(values)
}

/// Stateful convenience wrapper over the transform engine.
///
/// Holds the most recently loaded input dataset and the output of the most
/// recent apply-call, so transforms can be cascaded without the caller
/// threading datasets by hand. A `Remapper` is a single-owner value:
/// `apply` takes `&mut self`, so concurrent apply-calls on one instance are
/// ruled out by the borrow checker.
#[derive(Debug, Default)]
pub struct Remapper {
    input: Option<Dataset>,
    output: Option<Dataset>,
}

impl Remapper {
    /// A remapper with no data loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the input dataset from a CSV file, auto-detecting encoding and
    /// delimiter. Replaces any previously loaded input.
    pub fn load_data<P: AsRef<Path>>(&mut self, path: P) -> RemapResult<&Dataset> {
        let parsed = parser::read_path(path)?;
        log::debug!(
            "loaded {} rows, {} columns (encoding {}, delimiter '{}')",
            parsed.dataset.len(),
            parsed.dataset.columns().len(),
            parsed.encoding,
            parsed.delimiter,
        );
        Ok(&*self.input.insert(parsed.dataset))
    }

    /// Load the input dataset from CSV text, auto-detecting the delimiter.
    pub fn load_str(&mut self, content: &str) -> RemapResult<&Dataset> {
        let delimiter = parser::detect_delimiter(content);
        let dataset = parser::read_str(content, delimiter)?;
        Ok(&*self.input.insert(dataset))
    }

    /// Use an already-built dataset as input.
    pub fn set_input(&mut self, dataset: Dataset) {
        self.input = Some(dataset);
    }

    /// The currently loaded input dataset.
    pub fn input(&self) -> Option<&Dataset> {
        self.input.as_ref()
    }

    /// The output of the most recent successful apply-call.
    pub fn last_output(&self) -> Option<&Dataset> {
        self.output.as_ref()
    }

    /// Apply a template and store the result as the current output.
    ///
    /// With `cascade` false the source is the most recently loaded input
    /// dataset; with `cascade` true it is the output of the immediately
    /// preceding apply-call. The template is compiled fresh on every call.
    ///
    /// The call is atomic with respect to the stored output: on any error
    /// the previous output is left untouched. Evaluation has no timeout;
    /// callers embedding untrusted templates should bound the call
    /// themselves.
    pub fn apply(&mut self, template: &Template, cascade: bool) -> RemapResult<&Dataset> {
        let source = if cascade {
            self.output.as_ref().ok_or(RemapError::NoPriorOutput)?
        } else {
            self.input.as_ref().ok_or(RemapError::NoInput)?
        };

        let compiled = template.compile()?;
        log::debug!(
            "applying {} column rules over {} rows (cascade: {})",
            compiled.len(),
            source.len(),
            cascade,
        );

        let result = apply_template(source, &compiled)?;
        Ok(&*self.output.insert(result))
    }

    /// Serialize the current output dataset to CSV text.
    ///
    /// Every field is quoted and every line newline-terminated, the last
    /// one included.
    pub fn output(&self) -> RemapResult<String> {
        let dataset = self.output.as_ref().ok_or(RemapError::NoOutput)?;
        Ok(parser::write_str(dataset)?)
    }

    /// Write the current output dataset to a CSV file.
    pub fn save_data<P: AsRef<Path>>(&self, path: P) -> RemapResult<()> {
        let content = self.output()?;
        std::fs::write(path.as_ref(), content).map_err(|e| RemapError::Csv(CsvError::IoError(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template(raw: Value) -> Template {
        Template::from_value(raw)
    }

    #[test]
    fn test_rename_pass() {
        let mut remapper = Remapper::new();
        remapper.load_str("name,age\nAlice,30\nBob,25").unwrap();

        let tpl = template(json!({"name": "person", "age": "years"}));
        let out = remapper.apply(&tpl, false).unwrap();

        // Header is the sorted set of output names.
        assert_eq!(out.columns(), &["person", "years"]);
        assert_eq!(out.rows()[0], vec![json!("Alice"), json!("30")]);
        assert_eq!(out.rows()[1], vec![json!("Bob"), json!("25")]);
    }

    #[test]
    fn test_explode_pass() {
        let mut remapper = Remapper::new();
        remapper
            .load_str("address\n\"742, Evergreen Terrace, Springfield, IL, USA\"")
            .unwrap();

        let tpl = template(json!({
            "address": {
                "door": "split(', ') | nth(0)",
                "street": "split(', ') | nth(1)",
                "city": "split(', ') | nth(2)",
                "state": "split(', ') | nth(3)",
                "country": "split(', ') | nth(4)"
            }
        }));
        let out = remapper.apply(&tpl, false).unwrap();

        assert_eq!(out.columns(), &["city", "country", "door", "state", "street"]);
        assert_eq!(
            out.rows()[0],
            vec![
                json!("Springfield"),
                json!("USA"),
                json!("742"),
                json!("IL"),
                json!("Evergreen Terrace"),
            ]
        );
    }

    #[test]
    fn test_cascade_composes_two_passes() {
        let csv = "first,last\nhomer,simpson\nmarge,simpson";
        let t1 = json!({
            "first": {"full": {"args": ["first", "last"], "func": "concat(' ') | concat(_1)"}},
            "last": "family"
        });
        let t2 = json!({"full": {"shout": "upper"}, "family": "family"});

        // Cascaded: T1 then T2 with cascade=true.
        let mut cascaded = Remapper::new();
        cascaded.load_str(csv).unwrap();
        cascaded.apply(&template(t1.clone()), false).unwrap();
        let chained = cascaded.apply(&template(t2.clone()), true).unwrap().clone();

        // Direct: run T1, feed its output in as a fresh input, run T2.
        let mut first_pass = Remapper::new();
        first_pass.load_str(csv).unwrap();
        let d1 = first_pass.apply(&template(t1), false).unwrap().clone();

        let mut second_pass = Remapper::new();
        second_pass.set_input(d1);
        let direct = second_pass.apply(&template(t2), false).unwrap().clone();

        assert_eq!(chained, direct);
        assert_eq!(chained.columns(), &["family", "shout"]);
        assert_eq!(chained.rows()[0], vec![json!("simpson"), json!("HOMER SIMPSON")]);
    }

    #[test]
    fn test_cascade_without_prior_output() {
        let mut remapper = Remapper::new();
        remapper.load_str("a\n1").unwrap();

        let err = remapper.apply(&template(json!({"a": "b"})), true).unwrap_err();
        assert!(matches!(err, RemapError::NoPriorOutput));
    }

    #[test]
    fn test_apply_without_input() {
        let mut remapper = Remapper::new();
        let err = remapper.apply(&template(json!({"a": "b"})), false).unwrap_err();
        assert!(matches!(err, RemapError::NoInput));
    }

    #[test]
    fn test_non_cascade_reuses_loaded_input() {
        // A plain apply always starts from the loaded dataset, not from the
        // previous output.
        let mut remapper = Remapper::new();
        remapper.load_str("a\nx").unwrap();

        remapper.apply(&template(json!({"a": "b"})), false).unwrap();
        let out = remapper.apply(&template(json!({"a": "c"})), false).unwrap();

        assert_eq!(out.columns(), &["c"]);
        assert_eq!(out.rows()[0], vec![json!("x")]);
    }

    #[test]
    fn test_failed_apply_keeps_previous_output() {
        let mut remapper = Remapper::new();
        remapper.load_str("a\nhello").unwrap();

        remapper.apply(&template(json!({"a": "kept"})), false).unwrap();

        // nth(5) fails on every row.
        let bad = template(json!({"a": {"out": "split(',') | nth(5)"}}));
        assert!(remapper.apply(&bad, false).is_err());

        let out = remapper.last_output().unwrap();
        assert_eq!(out.columns(), &["kept"]);
        assert_eq!(remapper.output().unwrap(), "\"kept\"\n\"hello\"\n");
    }

    #[test]
    fn test_empty_dataset_produces_empty_output() {
        let data = Dataset::new(vec!["a".into()], vec![]).unwrap();
        let compiled = template(json!({"a": "b"})).compile().unwrap();

        let out = apply_template(&data, &compiled).unwrap();
        assert!(out.is_empty());
        assert!(out.columns().is_empty());
    }

    #[test]
    fn test_projection_rejects_missing_fixed_column() {
        let columns = vec!["a".to_string(), "b".to_string()];
        let output: BTreeMap<String, Value> =
            [("a".to_string(), json!("1"))].into_iter().collect();

        let err = project_row(&columns, output, 3).unwrap_err();
        match err {
            TransformError::InconsistentRow { row, column } => {
                assert_eq!(row, 3);
                assert_eq!(column, "b");
            }
            other => panic!("expected inconsistent row, got {:?}", other),
        }
    }

    #[test]
    fn test_projection_drops_extra_columns() {
        let columns = vec!["a".to_string()];
        let output: BTreeMap<String, Value> = [
            ("a".to_string(), json!("1")),
            ("extra".to_string(), json!("dropped")),
        ]
        .into_iter()
        .collect();

        let values = project_row(&columns, output, 1).unwrap();
        assert_eq!(values, vec![json!("1")]);
    }

    #[test]
    fn test_output_before_apply() {
        let remapper = Remapper::new();
        assert!(matches!(remapper.output(), Err(RemapError::NoOutput)));
    }

    #[test]
    fn test_output_round_trips() {
        let mut remapper = Remapper::new();
        remapper.load_str("name,city\nAlice,\"Springfield, IL\"").unwrap();
        let tpl = template(json!({"name": "name", "city": "city"}));
        let expected = remapper.apply(&tpl, false).unwrap().clone();

        let text = remapper.output().unwrap();
        assert!(text.ends_with('\n'));

        let parsed = parser::read_str(&text, ',').unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_compile_is_idempotent_across_applies() {
        let csv = "v\nabc";
        let raw = json!({"v": {"out": "upper | concat('!')"}});

        let mut first = Remapper::new();
        first.load_str(csv).unwrap();
        let a = first.apply(&template(raw.clone()), false).unwrap().clone();

        let mut second = Remapper::new();
        second.load_str(csv).unwrap();
        let b = second.apply(&template(raw), false).unwrap().clone();

        assert_eq!(a, b);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut remapper = Remapper::new();
        remapper.load_str("a\nx").unwrap();
        remapper.apply(&template(json!({"a": "b"})), false).unwrap();
        remapper.save_data(&path).unwrap();

        let mut reloaded = Remapper::new();
        reloaded.load_data(&path).unwrap();
        assert_eq!(reloaded.input().unwrap(), remapper.last_output().unwrap());
    }
}
