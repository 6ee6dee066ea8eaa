//! Error types for Cinder
//!
//! Every phase reports through [`CinderError`]: an [`ErrorKind`] plus the
//! span of the failing construct, optionally annotated with its source line.

use crate::token::Span;
use std::fmt;
use thiserror::Error;

/// Error kinds in Cinder
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    // Lexer errors
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
    #[error("unterminated string")]
    UnterminatedString,
    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    // Parser errors
    #[error("unexpected token '{0}' in statement")]
    UnexpectedToken(String),
    #[error("expected {expected}, got '{found}'")]
    ExpectedToken { expected: String, found: String },
    #[error("unexpected end of input, expected {0}")]
    UnexpectedEof(String),
    #[error("{0} body cannot be empty")]
    EmptyBody(&'static str),
    #[error("invalid for-loop increment: expected 'i++', 'i--', '++i', '--i' or 'i = expr'")]
    InvalidIncrement,
    #[error("duplicate parameter '{0}'")]
    DuplicateParameter(String),
    #[error("internal parser error: parser did not advance in {0}")]
    ParserStalled(&'static str),

    // Runtime errors
    #[error("'{0}' is already declared in this scope")]
    AlreadyDeclared(String),
    #[error("'{0}' is not declared")]
    NotDeclared(String),
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("index {index} out of range for array of length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("'{name}' expected {expected} arguments, got {got}")]
    WrongArity {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("'{0}' is not callable")]
    NotCallable(String),
    #[error("cannot convert {value} to {target}")]
    InvalidConversion { value: String, target: &'static str },
    #[error("integer overflow")]
    IntegerOverflow,
    #[error("return outside of function")]
    ReturnOutsideFunction,
    #[error("stack overflow: call depth exceeded {0}")]
    StackOverflow(usize),
}

/// A Cinder error with location information
#[derive(Debug, Clone, PartialEq)]
pub struct CinderError {
    pub kind: ErrorKind,
    pub span: Option<Span>,
    pub source_line: Option<String>,
}

impl CinderError {
    pub fn new(kind: ErrorKind, span: Option<Span>) -> Self {
        Self {
            kind,
            span,
            source_line: None,
        }
    }

    /// Error positioned at `span`
    pub fn at(kind: ErrorKind, span: Span) -> Self {
        Self::new(kind, Some(span))
    }

    /// Attach `span` only if no location has been recorded yet.
    ///
    /// Builtins and the environment raise span-less errors; the interpreter
    /// fills in the call site on the way out.
    pub fn or_span(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    pub fn with_source(mut self, source: &str) -> Self {
        if let Some(span) = &self.span {
            let lines: Vec<&str> = source.lines().collect();
            if span.line > 0 && span.line <= lines.len() {
                self.source_line = Some(lines[span.line - 1].to_string());
            }
        }
        self
    }
}

impl From<ErrorKind> for CinderError {
    fn from(kind: ErrorKind) -> Self {
        CinderError::new(kind, None)
    }
}

impl fmt::Display for CinderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(span) = &self.span {
            write!(f, "[line {}:{}] Error: {}", span.line, span.column, self.kind)?;

            if let Some(ref line) = self.source_line {
                write!(f, "\n  | {}", line)?;
                write!(f, "\n  | {}^", " ".repeat(span.column.saturating_sub(1)))?;
            }
        } else {
            write!(f, "Error: {}", self.kind)?;
        }
        Ok(())
    }
}

impl std::error::Error for CinderError {}

/// Result type for Cinder operations
pub type Result<T> = std::result::Result<T, CinderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_source_line() {
        let err = CinderError::at(ErrorKind::DivisionByZero, Span::new(8, 9, 1, 9))
            .with_source("var x = 1 / 0;");
        assert_eq!(
            err.to_string(),
            "[line 1:9] Error: division by zero\n  | var x = 1 / 0;\n  |         ^"
        );
    }

    #[test]
    fn test_or_span_keeps_existing_location() {
        let first = Span::new(0, 1, 2, 3);
        let err = CinderError::at(ErrorKind::DivisionByZero, first).or_span(Span::default());
        assert_eq!(err.span, Some(first));

        let err = CinderError::from(ErrorKind::IntegerOverflow).or_span(first);
        assert_eq!(err.span, Some(first));
    }
}
