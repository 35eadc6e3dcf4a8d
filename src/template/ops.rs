//! The operation registry backing pipeline expressions.
//!
//! Every transform a template can request is a named, pre-declared operation
//! from this registry. There is no dynamic code evaluation: pipeline text
//! resolves to [`Op`] values at compile time and nothing else is callable.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").expect("static pattern"));

/// A stage argument, resolved when the pipeline runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// A string literal from the expression text.
    Str(String),
    /// An integer literal from the expression text.
    Int(i64),
    /// A positional reference to one of the pipeline's input values (`_N`).
    Arg(usize),
}

/// A single resolved operation.
///
/// Operations are built by [`Op::resolve`] during template compilation and
/// applied in sequence by [`crate::template::expr::Pipeline`]. The `replace`
/// pattern is compiled here, once, so an invalid regex fails the compile
/// rather than every row.
#[derive(Debug, Clone)]
pub enum Op {
    /// Remove leading and trailing whitespace.
    Trim,

    /// Convert to uppercase.
    Upper,

    /// Convert to lowercase.
    Lower,

    /// Split a string into an array of trimmed parts.
    Split { sep: String },

    /// Join an array into a string.
    Join { sep: String },

    /// Pick one element of an array.
    Nth { index: usize },

    /// Append a value to the subject string.
    Concat { tail: Param },

    /// Prepend a value to the subject string.
    Prepend { head: Param },

    /// Regex pattern replacement.
    Replace { pattern: Regex, with: String },

    /// Take a character range.
    Slice { start: usize, length: Option<usize> },

    /// Pad at the start to reach a target length.
    PadStart { length: usize, fill: char },

    /// Pad at the end to reach a target length.
    PadEnd { length: usize, fill: char },

    /// Ensure the string starts with a prefix.
    Prefix { value: String },

    /// Ensure the string ends with a suffix.
    Suffix { value: String },

    /// Keep only ASCII digits.
    Digits,

    /// Keep only alphanumeric characters.
    Alnum,

    /// Convert to an integer.
    Number,

    /// Extract a 4-digit year.
    Year,
}

impl Op {
    /// Resolve an operation name and its parameters against the registry.
    ///
    /// `arg_count` is the number of pipeline input values available, used to
    /// reject out-of-range `_N` references at compile time.
    pub fn resolve(name: &str, params: Vec<Param>, arg_count: usize) -> Result<Op, String> {
        for p in &params {
            if let Param::Arg(n) = p {
                if *n >= arg_count {
                    return Err(format!(
                        "argument reference _{} out of range (pipeline has {} argument{})",
                        n,
                        arg_count,
                        if arg_count == 1 { "" } else { "s" }
                    ));
                }
            }
        }

        let op = match name {
            "trim" => {
                expect_params(name, &params, 0, 0)?;
                Op::Trim
            }
            "upper" => {
                expect_params(name, &params, 0, 0)?;
                Op::Upper
            }
            "lower" => {
                expect_params(name, &params, 0, 0)?;
                Op::Lower
            }
            "split" => {
                expect_params(name, &params, 1, 1)?;
                Op::Split {
                    sep: literal_str(name, &params[0])?,
                }
            }
            "join" => {
                expect_params(name, &params, 1, 1)?;
                Op::Join {
                    sep: literal_str(name, &params[0])?,
                }
            }
            "nth" => {
                expect_params(name, &params, 1, 1)?;
                Op::Nth {
                    index: literal_usize(name, &params[0])?,
                }
            }
            "concat" => {
                expect_params(name, &params, 1, 1)?;
                Op::Concat {
                    tail: params.into_iter().next().expect("checked arity"),
                }
            }
            "prepend" => {
                expect_params(name, &params, 1, 1)?;
                Op::Prepend {
                    head: params.into_iter().next().expect("checked arity"),
                }
            }
            "replace" => {
                expect_params(name, &params, 2, 2)?;
                let pattern = literal_str(name, &params[0])?;
                let with = literal_str(name, &params[1])?;
                let pattern = Regex::new(&pattern)
                    .map_err(|e| format!("replace: invalid pattern: {}", e))?;
                Op::Replace { pattern, with }
            }
            "slice" => {
                expect_params(name, &params, 1, 2)?;
                Op::Slice {
                    start: literal_usize(name, &params[0])?,
                    length: match params.get(1) {
                        Some(p) => Some(literal_usize(name, p)?),
                        None => None,
                    },
                }
            }
            "pad_start" => {
                expect_params(name, &params, 1, 2)?;
                Op::PadStart {
                    length: literal_usize(name, &params[0])?,
                    fill: fill_char(name, params.get(1))?,
                }
            }
            "pad_end" => {
                expect_params(name, &params, 1, 2)?;
                Op::PadEnd {
                    length: literal_usize(name, &params[0])?,
                    fill: fill_char(name, params.get(1))?,
                }
            }
            "prefix" => {
                expect_params(name, &params, 1, 1)?;
                Op::Prefix {
                    value: literal_str(name, &params[0])?,
                }
            }
            "suffix" => {
                expect_params(name, &params, 1, 1)?;
                Op::Suffix {
                    value: literal_str(name, &params[0])?,
                }
            }
            "digits" => {
                expect_params(name, &params, 0, 0)?;
                Op::Digits
            }
            "alnum" => {
                expect_params(name, &params, 0, 0)?;
                Op::Alnum
            }
            "number" => {
                expect_params(name, &params, 0, 0)?;
                Op::Number
            }
            "year" => {
                expect_params(name, &params, 0, 0)?;
                Op::Year
            }
            other => return Err(format!("unknown operation '{}'", other)),
        };

        Ok(op)
    }

    /// Apply this operation to the piped subject.
    ///
    /// `args` are the pipeline's input values, consulted by `_N` parameters.
    /// Errors carry a message only; callers attach row and column context.
    pub fn apply(&self, subject: Value, args: &[Value]) -> Result<Value, String> {
        match self {
            Op::Trim => Ok(Value::String(as_string("trim", &subject)?.trim().to_string())),
            Op::Upper => Ok(Value::String(as_string("upper", &subject)?.to_uppercase())),
            Op::Lower => Ok(Value::String(as_string("lower", &subject)?.to_lowercase())),
            Op::Split { sep } => {
                let s = as_string("split", &subject)?;
                let parts: Vec<Value> = s
                    .split(sep.as_str())
                    .map(|p| Value::String(p.trim().to_string()))
                    .collect();
                Ok(Value::Array(parts))
            }
            Op::Join { sep } => match subject {
                Value::Array(items) => {
                    let parts: Result<Vec<String>, String> =
                        items.iter().map(|v| as_string("join", v)).collect();
                    Ok(Value::String(parts?.join(sep.as_str())))
                }
                other => Err(format!("join: expected an array, got {}", kind_of(&other))),
            },
            Op::Nth { index } => match subject {
                Value::Array(mut items) => {
                    if *index < items.len() {
                        Ok(items.swap_remove(*index))
                    } else {
                        Err(format!(
                            "nth: index {} out of bounds for array of {}",
                            index,
                            items.len()
                        ))
                    }
                }
                other => Err(format!("nth: expected an array, got {}", kind_of(&other))),
            },
            Op::Concat { tail } => {
                let s = as_string("concat", &subject)?;
                let tail = param_string("concat", tail, args)?;
                Ok(Value::String(format!("{}{}", s, tail)))
            }
            Op::Prepend { head } => {
                let s = as_string("prepend", &subject)?;
                let head = param_string("prepend", head, args)?;
                Ok(Value::String(format!("{}{}", head, s)))
            }
            Op::Replace { pattern, with } => {
                let s = as_string("replace", &subject)?;
                Ok(Value::String(pattern.replace_all(&s, with.as_str()).to_string()))
            }
            Op::Slice { start, length } => {
                let s = as_string("slice", &subject)?;
                let chars: Vec<char> = s.chars().collect();
                let end = length.map(|l| *start + l).unwrap_or(chars.len());
                let taken: String = chars
                    .get(*start..end.min(chars.len()))
                    .map(|c| c.iter().collect())
                    .unwrap_or_default();
                Ok(Value::String(taken))
            }
            Op::PadStart { length, fill } => {
                let s = as_string("pad_start", &subject)?;
                Ok(Value::String(pad(&s, *length, *fill, true)))
            }
            Op::PadEnd { length, fill } => {
                let s = as_string("pad_end", &subject)?;
                Ok(Value::String(pad(&s, *length, *fill, false)))
            }
            Op::Prefix { value } => {
                let s = as_string("prefix", &subject)?;
                if s.starts_with(value.as_str()) {
                    Ok(Value::String(s))
                } else {
                    Ok(Value::String(format!("{}{}", value, s)))
                }
            }
            Op::Suffix { value } => {
                let s = as_string("suffix", &subject)?;
                if s.ends_with(value.as_str()) {
                    Ok(Value::String(s))
                } else {
                    Ok(Value::String(format!("{}{}", s, value)))
                }
            }
            Op::Digits => {
                let s = as_string("digits", &subject)?;
                Ok(Value::String(s.chars().filter(|c| c.is_ascii_digit()).collect()))
            }
            Op::Alnum => {
                let s = as_string("alnum", &subject)?;
                Ok(Value::String(s.chars().filter(|c| c.is_alphanumeric()).collect()))
            }
            Op::Number => {
                if subject.is_number() {
                    return Ok(subject);
                }
                let s = as_string("number", &subject)?;
                let negative = s.trim().starts_with('-');
                let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
                if digits.is_empty() {
                    return Err(format!("number: no digits in '{}'", s));
                }
                let text = if negative { format!("-{}", digits) } else { digits };
                let n: i64 = text
                    .parse()
                    .map_err(|_| format!("number: '{}' does not fit an integer", text))?;
                Ok(Value::Number(n.into()))
            }
            Op::Year => {
                let s = as_string("year", &subject)?;
                let year = YEAR_RE
                    .find(&s)
                    .and_then(|m| m.as_str().parse::<i64>().ok())
                    .ok_or_else(|| format!("year: no 4-digit year in '{}'", s))?;
                Ok(Value::Number(year.into()))
            }
        }
    }
}

fn pad(s: &str, length: usize, fill: char, at_start: bool) -> String {
    let current = s.chars().count();
    if current >= length {
        return s.to_string();
    }
    let padding: String = std::iter::repeat(fill).take(length - current).collect();
    if at_start {
        format!("{}{}", padding, s)
    } else {
        format!("{}{}", s, padding)
    }
}

/// Coerce a scalar value to a string for string-oriented operations.
fn as_string(op: &str, value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(format!("{}: expected a scalar, got {}", op, kind_of(other))),
    }
}

/// Resolve a parameter to a string at evaluation time.
fn param_string(op: &str, param: &Param, args: &[Value]) -> Result<String, String> {
    match param {
        Param::Str(s) => Ok(s.clone()),
        Param::Int(i) => Ok(i.to_string()),
        Param::Arg(n) => {
            let value = args
                .get(*n)
                .ok_or_else(|| format!("{}: argument _{} not supplied", op, n))?;
            as_string(op, value)
        }
    }
}

fn expect_params(name: &str, params: &[Param], min: usize, max: usize) -> Result<(), String> {
    if params.len() < min || params.len() > max {
        let expected = if min == max {
            format!("{}", min)
        } else {
            format!("{} to {}", min, max)
        };
        return Err(format!(
            "{}: expected {} parameter(s), got {}",
            name,
            expected,
            params.len()
        ));
    }
    Ok(())
}

fn literal_str(name: &str, param: &Param) -> Result<String, String> {
    match param {
        Param::Str(s) => Ok(s.clone()),
        Param::Int(i) => Ok(i.to_string()),
        Param::Arg(_) => Err(format!("{}: parameter must be a literal", name)),
    }
}

fn literal_usize(name: &str, param: &Param) -> Result<usize, String> {
    match param {
        Param::Int(i) if *i >= 0 => Ok(*i as usize),
        Param::Int(i) => Err(format!("{}: parameter must be non-negative, got {}", name, i)),
        _ => Err(format!("{}: parameter must be an integer", name)),
    }
}

fn fill_char(name: &str, param: Option<&Param>) -> Result<char, String> {
    match param {
        None => Ok('0'),
        Some(p) => {
            let s = literal_str(name, p)?;
            s.chars()
                .next()
                .ok_or_else(|| format!("{}: fill character must not be empty", name))
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Describe every registry operation, for the CLI reference command.
pub fn operations_description() -> String {
    r#"Available pipeline operations:

| Operation | Description | Parameters |
|-----------|-------------|------------|
| trim | Remove leading/trailing whitespace | - |
| upper | Convert to uppercase | - |
| lower | Convert to lowercase | - |
| split | Split string into an array of trimmed parts | sep: separator string |
| join | Join an array into a string | sep: separator string |
| nth | Pick one element of an array | index: zero-based position |
| concat | Append a value to the string | value: literal or _N argument reference |
| prepend | Prepend a value to the string | value: literal or _N argument reference |
| replace | Regex pattern replacement | pattern: regex, value: replacement |
| slice | Take a character range | start: index, length: optional count |
| pad_start | Pad at start to target length | length, fill character (default "0") |
| pad_end | Pad at end to target length | length, fill character (default "0") |
| prefix | Add prefix if not present | value: prefix string |
| suffix | Add suffix if not present | value: suffix string |
| digits | Keep only ASCII digits | - |
| alnum | Keep only alphanumeric chars | - |
| number | Convert to integer | - |
| year | Extract 4-digit year | - |

Operations chain left to right with '|'. The piped value starts as the
pipeline's first input; in combine specs, later inputs are _1, _2, ...

Examples:
  "split(', ') | nth(0)"
  "trim | upper | prefix('T')"
  "split(' ') | nth(0) | concat(_1)"
  "digits | number""#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn apply(op: Op, value: Value) -> Value {
        op.apply(value, &[]).unwrap()
    }

    #[test]
    fn test_trim() {
        assert_eq!(apply(Op::Trim, json!("  hello  ")), json!("hello"));
    }

    #[test]
    fn test_case_ops() {
        assert_eq!(apply(Op::Upper, json!("abc")), json!("ABC"));
        assert_eq!(apply(Op::Lower, json!("AbC")), json!("abc"));
    }

    #[test]
    fn test_split_trims_parts() {
        let op = Op::Split { sep: ",".into() };
        assert_eq!(apply(op, json!("a, b ,c")), json!(["a", "b", "c"]));
    }

    #[test]
    fn test_nth() {
        let op = Op::Nth { index: 1 };
        assert_eq!(apply(op, json!(["a", "b", "c"])), json!("b"));
    }

    #[test]
    fn test_nth_out_of_bounds() {
        let op = Op::Nth { index: 5 };
        let err = op.apply(json!(["a"]), &[]).unwrap_err();
        assert!(err.contains("out of bounds"));
    }

    #[test]
    fn test_nth_on_scalar_fails() {
        let op = Op::Nth { index: 0 };
        let err = op.apply(json!("plain"), &[]).unwrap_err();
        assert!(err.contains("expected an array"));
    }

    #[test]
    fn test_join() {
        let op = Op::Join { sep: "-".into() };
        assert_eq!(apply(op, json!(["a", "b"])), json!("a-b"));
    }

    #[test]
    fn test_concat_with_arg_reference() {
        let op = Op::Concat { tail: Param::Arg(1) };
        let out = op.apply(json!("foo"), &[json!("ignored"), json!("baz")]).unwrap();
        assert_eq!(out, json!("foobaz"));
    }

    #[test]
    fn test_prepend_literal() {
        let op = Op::Prepend { head: Param::Str("Mr ".into()) };
        assert_eq!(apply(op, json!("Burns")), json!("Mr Burns"));
    }

    #[test]
    fn test_replace() {
        let op = Op::Replace {
            pattern: Regex::new("[-. ]").unwrap(),
            with: "".into(),
        };
        assert_eq!(apply(op, json!("T-123.456 7")), json!("T1234567"));
    }

    #[test]
    fn test_pad_start() {
        let op = Op::PadStart { length: 5, fill: '0' };
        assert_eq!(apply(op, json!("42")), json!("00042"));
        let op = Op::PadStart { length: 1, fill: '0' };
        assert_eq!(apply(op, json!("42")), json!("42"));
    }

    #[test]
    fn test_prefix_only_when_missing() {
        let op = Op::Prefix { value: "T".into() };
        assert_eq!(apply(op.clone(), json!("123")), json!("T123"));
        assert_eq!(apply(op, json!("T123")), json!("T123"));
    }

    #[test]
    fn test_number() {
        assert_eq!(apply(Op::Number, json!("123-456")), json!(123456));
        assert_eq!(apply(Op::Number, json!("-42")), json!(-42));
        assert_eq!(apply(Op::Number, json!(7)), json!(7));
    }

    #[test]
    fn test_number_without_digits_fails() {
        let err = Op::Number.apply(json!("abc"), &[]).unwrap_err();
        assert!(err.contains("no digits"));
    }

    #[test]
    fn test_year() {
        assert_eq!(apply(Op::Year, json!("15/03/2024")), json!(2024));
        assert_eq!(apply(Op::Year, json!("2023-12-25")), json!(2023));
    }

    #[test]
    fn test_resolve_unknown_operation() {
        let err = Op::resolve("frobnicate", vec![], 1).unwrap_err();
        assert!(err.contains("unknown operation"));
    }

    #[test]
    fn test_resolve_bad_arity() {
        let err = Op::resolve("trim", vec![Param::Int(1)], 1).unwrap_err();
        assert!(err.contains("expected 0"));
    }

    #[test]
    fn test_resolve_arg_reference_out_of_range() {
        let err = Op::resolve("concat", vec![Param::Arg(2)], 2).unwrap_err();
        assert!(err.contains("_2 out of range"));
    }

    #[test]
    fn test_resolve_rejects_bad_replace_pattern() {
        let params = vec![Param::Str("[".into()), Param::Str("".into())];
        let err = Op::resolve("replace", params, 1).unwrap_err();
        assert!(err.contains("invalid pattern"));
    }
}
