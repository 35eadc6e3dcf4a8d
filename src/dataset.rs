//! The dataset value type shared by the parser and the transform engine.
//!
//! A [`Dataset`] is an ordered header plus ordered rows of positionally
//! aligned cell values. It is immutable once constructed; every transform
//! pass produces a fresh dataset.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::DatasetError;

/// An ordered header and the rows aligned to it.
///
/// Invariant: every row's length equals the header length. [`Dataset::new`]
/// rejects misaligned rows, so holders of a `Dataset` can index cells by
/// header position without bounds anxiety.
///
/// Cells loaded from CSV are always `Value::String`; transform output cells
/// may be any scalar JSON value (numbers from `number`, arrays from `split`).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Create a dataset, validating that every row matches the header length.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, DatasetError> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(DatasetError::RowLength {
                    row: i,
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    /// A dataset with no columns and no rows.
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Build a dataset from rows already known to match the header length.
    ///
    /// Only for callers that construct rows by projecting onto `columns`.
    pub(crate) fn from_parts(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self { columns, rows }
    }

    /// Column names, in header order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows, in input order.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the dataset holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Zip one row with the header into a named mapping.
    ///
    /// This is the row view consumed by the evaluator: column name to value,
    /// alignment guaranteed by the constructor invariant.
    pub fn row_map(&self, index: usize) -> Map<String, Value> {
        let mut map = Map::new();
        if let Some(row) = self.rows.get(index) {
            for (name, value) in self.columns.iter().zip(row.iter()) {
                map.insert(name.clone(), value.clone());
            }
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_accepts_aligned_rows() {
        let ds = Dataset::new(
            cols(&["a", "b"]),
            vec![vec![json!("1"), json!("2")], vec![json!("3"), json!("4")]],
        )
        .unwrap();

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.columns(), &["a", "b"]);
    }

    #[test]
    fn test_new_rejects_short_row() {
        let err = Dataset::new(cols(&["a", "b"]), vec![vec![json!("1")]]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Row 0"));
        assert!(msg.contains("expected 2"));
    }

    #[test]
    fn test_row_map_zips_header_and_values() {
        let ds = Dataset::new(
            cols(&["name", "age"]),
            vec![vec![json!("Alice"), json!("30")]],
        )
        .unwrap();

        let map = ds.row_map(0);
        assert_eq!(map["name"], "Alice");
        assert_eq!(map["age"], "30");
    }

    #[test]
    fn test_row_map_out_of_range_is_empty() {
        let ds = Dataset::empty();
        assert!(ds.row_map(5).is_empty());
    }
}
