//! The pipeline expression mini-language.
//!
//! Template leaves carry transform logic as small textual expressions:
//!
//! ```text
//! pipeline := stage ( '|' stage )*
//! stage    := ident [ '(' arg ( ',' arg )* ')' ]
//! arg      := 'string' | "string" | integer | _N
//! ```
//!
//! A stage names an operation from the registry in [`super::ops`]; `_N`
//! references the pipeline's N-th input value. Compilation resolves every
//! stage against the registry, so unknown names, wrong arities and invalid
//! patterns are rejected before any row is evaluated.

use serde_json::Value;

use super::ops::{Op, Param};
use crate::error::{TemplateError, TemplateResult};

/// A compiled chain of registry operations.
///
/// The subject starts as the pipeline's first input value and is threaded
/// through each stage in order.
#[derive(Debug, Clone)]
pub struct Pipeline {
    source: String,
    stages: Vec<Op>,
}

impl Pipeline {
    /// Compile expression text against the operation registry.
    ///
    /// `arg_count` is the number of input values the pipeline will receive:
    /// 1 for explode specs, the length of `args` for combine specs.
    pub fn compile(text: &str, arg_count: usize) -> TemplateResult<Pipeline> {
        let fail = |message: String| TemplateError::Compile {
            text: text.to_string(),
            message,
        };

        let tokens = tokenize(text).map_err(&fail)?;
        let raw_stages = parse_stages(&tokens).map_err(&fail)?;

        let mut stages = Vec::with_capacity(raw_stages.len());
        for (name, params) in raw_stages {
            stages.push(Op::resolve(&name, params, arg_count).map_err(&fail)?);
        }

        Ok(Pipeline {
            source: text.to_string(),
            stages,
        })
    }

    /// Run the pipeline over its input values.
    ///
    /// Errors carry a message only; callers attach row and column context.
    pub fn eval(&self, args: &[Value]) -> Result<Value, String> {
        let mut subject = args
            .first()
            .cloned()
            .ok_or_else(|| "pipeline evaluated with no input".to_string())?;

        for op in &self.stages {
            subject = op.apply(subject, args)?;
        }

        Ok(subject)
    }

    /// The expression text this pipeline was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }
}

// =============================================================================
// Lexer
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    ArgRef(usize),
    Pipe,
    LParen,
    RParen,
    Comma,
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '|' => {
                chars.next();
                tokens.push(Token::Pipe);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '\'' | '"' => {
                chars.next();
                tokens.push(Token::Str(lex_string(&mut chars, c, pos)?));
            }
            '-' | '0'..='9' => {
                tokens.push(lex_int(&mut chars, pos)?);
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                tokens.push(lex_word(&mut chars)?);
            }
            other => {
                return Err(format!("unexpected character '{}' at position {}", other, pos));
            }
        }
    }

    Ok(tokens)
}

fn lex_string(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    quote: char,
    start: usize,
) -> Result<String, String> {
    let mut out = String::new();

    while let Some((_, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, escaped @ ('\\' | '\'' | '"'))) => out.push(escaped),
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, other)) => {
                    return Err(format!("unsupported escape '\\{}' in string literal", other));
                }
                None => return Err("unterminated string literal".to_string()),
            },
            c if c == quote => return Ok(out),
            c => out.push(c),
        }
    }

    Err(format!("unterminated string literal starting at position {}", start))
}

fn lex_int(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    start: usize,
) -> Result<Token, String> {
    let mut text = String::new();

    if let Some(&(_, '-')) = chars.peek() {
        chars.next();
        text.push('-');
    }
    while let Some(&(_, c)) = chars.peek() {
        if c.is_ascii_digit() {
            text.push(c);
            chars.next();
        } else {
            break;
        }
    }

    text.parse::<i64>()
        .map(Token::Int)
        .map_err(|_| format!("invalid integer '{}' at position {}", text, start))
}

fn lex_word(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
) -> Result<Token, String> {
    let mut word = String::new();

    while let Some(&(_, c)) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '_' {
            word.push(c);
            chars.next();
        } else {
            break;
        }
    }

    // `_N` is an argument reference, everything else an operation name.
    if let Some(digits) = word.strip_prefix('_') {
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            let n: usize = digits
                .parse()
                .map_err(|_| format!("invalid argument reference '{}'", word))?;
            return Ok(Token::ArgRef(n));
        }
    }

    Ok(Token::Ident(word))
}

// =============================================================================
// Parser
// =============================================================================

type RawStage = (String, Vec<Param>);

fn parse_stages(tokens: &[Token]) -> Result<Vec<RawStage>, String> {
    if tokens.is_empty() {
        return Err("empty pipeline".to_string());
    }

    let mut stages = Vec::new();
    let mut cursor = 0;

    loop {
        let (stage, next) = parse_stage(tokens, cursor)?;
        stages.push(stage);
        cursor = next;

        match tokens.get(cursor) {
            None => break,
            Some(Token::Pipe) => {
                cursor += 1;
                if cursor == tokens.len() {
                    return Err("trailing '|' with no stage after it".to_string());
                }
            }
            Some(other) => {
                return Err(format!("expected '|' between stages, found {}", describe(other)));
            }
        }
    }

    Ok(stages)
}

fn parse_stage(tokens: &[Token], mut cursor: usize) -> Result<(RawStage, usize), String> {
    let name = match tokens.get(cursor) {
        Some(Token::Ident(name)) => name.clone(),
        Some(other) => return Err(format!("expected an operation name, found {}", describe(other))),
        None => return Err("expected an operation name".to_string()),
    };
    cursor += 1;

    let mut params = Vec::new();
    if let Some(Token::LParen) = tokens.get(cursor) {
        cursor += 1;

        if let Some(Token::RParen) = tokens.get(cursor) {
            // Empty parameter list, e.g. "trim()"
            return Ok(((name, params), cursor + 1));
        }

        loop {
            match tokens.get(cursor) {
                Some(Token::Str(s)) => params.push(Param::Str(s.clone())),
                Some(Token::Int(i)) => params.push(Param::Int(*i)),
                Some(Token::ArgRef(n)) => params.push(Param::Arg(*n)),
                Some(other) => {
                    return Err(format!(
                        "expected a literal or argument reference, found {}",
                        describe(other)
                    ));
                }
                None => return Err(format!("unclosed parameter list for '{}'", name)),
            }
            cursor += 1;

            match tokens.get(cursor) {
                Some(Token::Comma) => cursor += 1,
                Some(Token::RParen) => {
                    cursor += 1;
                    break;
                }
                Some(other) => {
                    return Err(format!("expected ',' or ')', found {}", describe(other)));
                }
                None => return Err(format!("unclosed parameter list for '{}'", name)),
            }
        }
    }

    Ok(((name, params), cursor))
}

fn describe(token: &Token) -> String {
    match token {
        Token::Ident(name) => format!("'{}'", name),
        Token::Str(s) => format!("string '{}'", s),
        Token::Int(i) => format!("integer {}", i),
        Token::ArgRef(n) => format!("argument reference _{}", n),
        Token::Pipe => "'|'".to_string(),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
        Token::Comma => "','".to_string(),
    }
}
