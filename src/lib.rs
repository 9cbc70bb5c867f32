//! Rill: a small line-oriented expression language.
//!
//! The pipeline is parse then evaluate. Parsing is two-tiered: a silent
//! fast-path grammar parse, with a diagnostic reparser that replays the
//! token stream through an instrumented automaton when the fast path fails.
//! Evaluation walks the positioned AST over a single value stack with
//! strict, non-coercing numeric typing.

pub use crate::errors::{print_error, EvalError, ParseError};

pub mod ast;
pub mod cli;
pub mod errors;
pub mod repl;
pub mod runtime;
pub mod syntax;
