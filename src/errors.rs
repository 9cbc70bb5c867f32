//! Error types for parsing and evaluation.
//!
//! Parse failures carry the formatted diagnostic in their `Display` form;
//! the extra source/span fields only feed the rich terminal report. The
//! evaluator threads `EvalError` explicitly through every call, so the
//! "abort remaining statements, keep prior output" policy is visible at
//! each call site.

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// A parse failure. `Display` yields the full formatted diagnostic string.
#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    /// Malformed token; reported with the scanner's own message, the
    /// diagnostic reparser is never involved.
    #[error("line {line}, column {col}: lexical error: {message}")]
    #[diagnostic(code(rill::parse::lexical))]
    Lexical {
        message: String,
        line: usize,
        col: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("malformed token")]
        span: SourceSpan,
    },

    /// Grammar-invalid input, always produced by the two-tier diagnostic
    /// protocol in `syntax::diagnose`.
    #[error("{location}: syntax error near '{excerpt}': {message}")]
    #[diagnostic(code(rill::parse::syntax))]
    Syntax {
        location: String,
        excerpt: String,
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("cannot read {path}: {source}")]
    #[diagnostic(code(rill::parse::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    /// Diagnostic location string, where one applies.
    pub fn location(&self) -> Option<String> {
        match self {
            ParseError::Lexical { line, col, .. } => Some(format!("line {line}, column {col}")),
            ParseError::Syntax { location, .. } => Some(location.clone()),
            ParseError::Io { .. } => None,
        }
    }

    pub fn is_lexical(&self) -> bool {
        matches!(self, ParseError::Lexical { .. })
    }
}

/// A runtime evaluation failure. One kind per condition the evaluator can
/// reject; every variant carries enough rendered context to diagnose the
/// offending statement without re-running it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("evaluation stack underflow")]
    StackUnderflow,

    /// Operator applied to operand types it does not support. Both operand
    /// fields hold debug renderings (strings quoted).
    #[error("unsupported operand types for '{op}': {lhs} and {rhs}")]
    UnsupportedOperands {
        op: &'static str,
        lhs: String,
        rhs: String,
    },

    /// An AST form outside the evaluated subset reached the evaluator.
    /// `rendering` is the node's canonical rendering.
    #[error("unhandled expression: {rendering}")]
    UnhandledExpression { rendering: String },

    #[error("integer power with negative exponent: {exponent}")]
    NegativeExponent { exponent: String },

    #[error("integer division by zero: {lhs} {op} 0")]
    DivisionByZero { op: &'static str, lhs: String },
}

/// Prints a parse failure as a rich miette report, for CLI and REPL use.
pub fn print_error(error: ParseError) {
    let report = miette::Report::new(error);
    eprintln!("{report:?}");
}
