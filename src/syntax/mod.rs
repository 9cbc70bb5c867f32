//! Parsing: fast-path grammar parse plus the two-tier diagnostic protocol.
//!
//! `parser` builds the AST from the grammar in one silent pass. When that
//! pass fails, `scanner` retokenizes the source and `diagnose` replays the
//! token stream through an instrumented automaton to recover a precise,
//! state-specific error message. Raw grammar faults never reach callers.

pub mod diagnose;
pub mod parser;
pub mod scanner;

use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
pub(crate) struct RillParser;
