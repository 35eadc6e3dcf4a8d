//! CSV reading and writing with encoding and delimiter auto-detection.
//!
//! Row-level parsing and serialization are delegated to the `csv` crate;
//! this module only layers encoding detection, delimiter sniffing and the
//! [`Dataset`] shape on top. No transformation logic lives here.

use std::path::Path;

use serde_json::Value;

use crate::dataset::Dataset;
use crate::error::{CsvError, CsvResult};

/// A parsed CSV document plus the detection metadata used to read it.
#[derive(Debug, Clone)]
pub struct ParsedCsv {
    /// The parsed dataset.
    pub dataset: Dataset,
    /// Detected or assumed encoding.
    pub encoding: String,
    /// Detected or specified delimiter.
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let (charset, _, _) = chardet::detect(bytes);

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to a string using the given encoding.
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => Ok(String::from_utf8_lossy(bytes).to_string()),
        "iso-8859-1" | "latin-1" | "latin1" => {
            Ok(encoding_rs::ISO_8859_15.decode(bytes).0.to_string())
        }
        "windows-1252" | "cp1252" => Ok(encoding_rs::WINDOWS_1252.decode(bytes).0.to_string()),
        other => {
            if other.is_empty() {
                return Err(CsvError::EncodingError("unknown encoding".to_string()));
            }
            // Fallback: lossy UTF-8
            Ok(String::from_utf8_lossy(bytes).to_string())
        }
    }
}

/// Detect the delimiter by counting candidates in the header line.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let candidates = [',', ';', '\t', '|'];
    let mut best = ',';
    let mut best_count = 0;

    for &sep in &candidates {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best = sep;
        }
    }

    best
}

/// Parse CSV text with an explicit delimiter into a [`Dataset`].
///
/// Rows shorter than the header are padded with empty strings; extra
/// trailing values are dropped, so every parsed row aligns with the header.
pub fn read_str(content: &str, delimiter: char) -> CsvResult<Dataset> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyInput);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .from_reader(content.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| CsvError::ParseError(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if columns.is_empty() || columns.iter().all(|c| c.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| CsvError::ParseError(e.to_string()))?;

        let mut row: Vec<Value> = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            let field = record.get(i).unwrap_or("");
            row.push(Value::String(field.to_string()));
        }
        rows.push(row);
    }

    // Row lengths are normalized above, so this cannot fail.
    Dataset::new(columns, rows).map_err(|e| CsvError::ParseError(e.to_string()))
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn read_bytes_auto(bytes: &[u8]) -> CsvResult<ParsedCsv> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);

    let dataset = read_str(&content, delimiter)?;
    Ok(ParsedCsv {
        dataset,
        encoding,
        delimiter,
    })
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
pub fn read_path<P: AsRef<Path>>(path: P) -> CsvResult<ParsedCsv> {
    let bytes = std::fs::read(path.as_ref())?;
    read_bytes_auto(&bytes)
}

/// Serialize a dataset to CSV text.
///
/// Every field is quoted, every line is newline-terminated, including the
/// last one. Non-string cells are rendered in their compact JSON form
/// (`42`, `true`); nulls become empty fields.
pub fn write_str(dataset: &Dataset) -> CsvResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());

    writer
        .write_record(dataset.columns())
        .map_err(|e| CsvError::SerializeError(e.to_string()))?;

    for row in dataset.rows() {
        let fields: Vec<String> = row.iter().map(cell_to_string).collect();
        writer
            .write_record(&fields)
            .map_err(|e| CsvError::SerializeError(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CsvError::SerializeError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CsvError::SerializeError(e.to_string()))
}

/// Serialize a dataset and write it to a file.
pub fn write_path<P: AsRef<Path>>(dataset: &Dataset, path: P) -> CsvResult<()> {
    let content = write_str(dataset)?;
    std::fs::write(path.as_ref(), content)?;
    Ok(())
}

/// Render one cell for CSV output.
fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_csv() {
        let ds = read_str("name,age\nAlice,30\nBob,25", ',').unwrap();

        assert_eq!(ds.columns(), &["name", "age"]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows()[0][0], "Alice");
        assert_eq!(ds.rows()[1][1], "25");
    }

    #[test]
    fn test_semicolon_delimiter() {
        let ds = read_str("a;b;c\n1;2;3", ';').unwrap();
        assert_eq!(ds.rows()[0], vec![json!("1"), json!("2"), json!("3")]);
    }

    #[test]
    fn test_quoted_values() {
        let csv = "name,address\n\"Bart\",\"742, Evergreen Terrace\"\n";
        let ds = read_str(csv, ',').unwrap();

        assert_eq!(ds.rows()[0][0], "Bart");
        assert_eq!(ds.rows()[0][1], "742, Evergreen Terrace");
    }

    #[test]
    fn test_short_rows_padded() {
        let ds = read_str("a,b,c\n1,2", ',').unwrap();
        assert_eq!(ds.rows()[0], vec![json!("1"), json!("2"), json!("")]);
    }

    #[test]
    fn test_extra_values_dropped() {
        let ds = read_str("a,b\n1,2,3,4", ',').unwrap();
        assert_eq!(ds.rows()[0], vec![json!("1"), json!("2")]);
    }

    #[test]
    fn test_empty_input_error() {
        assert!(matches!(read_str("", ','), Err(CsvError::EmptyInput)));
        assert!(matches!(read_str("  \n ", ','), Err(CsvError::EmptyInput)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b|c"), '|');
    }

    #[test]
    fn test_write_always_quotes_and_terminates() {
        let ds = Dataset::new(
            vec!["a".into(), "b".into()],
            vec![vec![json!("1"), json!("x y")]],
        )
        .unwrap();

        let out = write_str(&ds).unwrap();
        assert_eq!(out, "\"a\",\"b\"\n\"1\",\"x y\"\n");
    }

    #[test]
    fn test_write_non_string_cells() {
        let ds = Dataset::new(
            vec!["n".into(), "flag".into(), "none".into()],
            vec![vec![json!(42), json!(true), json!(null)]],
        )
        .unwrap();

        let out = write_str(&ds).unwrap();
        assert_eq!(out.lines().nth(1).unwrap(), "\"42\",\"true\",\"\"");
    }

    #[test]
    fn test_round_trip() {
        let ds = Dataset::new(
            vec!["city".into(), "note".into()],
            vec![
                vec![json!("Springfield"), json!("has, a comma")],
                vec![json!("Shelbyville"), json!("has \"quotes\"")],
            ],
        )
        .unwrap();

        let text = write_str(&ds).unwrap();
        let back = read_str(&text, ',').unwrap();

        assert_eq!(back, ds);
    }

    #[test]
    fn test_auto_read() {
        let parsed = read_bytes_auto(b"name;age\nAlice;30\n").unwrap();
        assert_eq!(parsed.delimiter, ';');
        assert_eq!(parsed.encoding, "utf-8");
        assert_eq!(parsed.dataset.columns(), &["name", "age"]);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert!(decoded.starts_with("Soci"));
        assert_eq!(decoded.chars().count(), 7);
    }
}
