//! The user-facing compilation error.
//!
//! A [`CError`] is a recoverable, user-caused problem: it propagates with `?`
//! through the compilers and is converted into a diagnostic at definition
//! granularity (see `Messages::consume_error`). Internal invariant violations
//! are `panic!`s, never `CError`s — they abort the compilation instead of
//! becoming diagnostics.

use thiserror::Error;

use crate::span::Span;

/// A user-facing compilation error: position, stable machine-readable code
/// (`category:detail1:detail2...`) and a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("at {span}: [{code}] {message}")]
pub struct CError {
    pub span: Span,
    pub code: String,
    pub message: String,
}

impl CError {
    pub fn new(span: Span, code: impl Into<String>, message: impl Into<String>) -> CError {
        CError {
            span,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn unknown_name(span: Span, name: &str) -> CError {
        Self::new(span, format!("unknown_name:{name}"), format!("Unknown name: '{name}'"))
    }

    pub fn unknown_type(span: Span, name: &str) -> CError {
        Self::new(span, format!("unknown_type:{name}"), format!("Unknown type: '{name}'"))
    }

    pub fn type_mismatch(span: Span, dst: &str, src: &str, what: &str) -> CError {
        Self::new(
            span,
            format!("type_mismatch:{dst}:{src}"),
            format!("{what}: expected '{dst}', got '{src}'"),
        )
    }

    /// Expression has a predicate form only and was used where an in-process
    /// value is required.
    pub fn sql_not_allowed(span: Span) -> CError {
        Self::new(
            span,
            "expr_sqlnotallowed",
            "Database expression is not allowed here",
        )
    }

    /// The named function has no predicate-form implementation.
    pub fn fn_no_sql(span: Span, name: &str) -> CError {
        Self::new(
            span,
            format!("fn_nosql:{name}"),
            format!("Function '{name}' cannot be converted to SQL"),
        )
    }
}

pub type CResult<T> = Result<T, CError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_span_and_code() {
        let e = CError::new(Span::new(3, 7, 1), "unknown_name:x", "Unknown name: 'x'");
        assert_eq!(format!("{e}"), "at 3:7: [unknown_name:x] Unknown name: 'x'");
    }

    #[test]
    fn constructors_build_stable_codes() {
        let e = CError::unknown_type(Span::default(), "foo");
        assert_eq!(e.code, "unknown_type:foo");

        let e = CError::type_mismatch(Span::default(), "integer", "text", "Assignment");
        assert_eq!(e.code, "type_mismatch:integer:text");
    }
}
