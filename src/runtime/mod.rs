//! Runtime: values and the stack-based evaluator.

pub mod eval;
pub mod value;

pub use eval::{Evaluator, NullSink, OutputSink, StderrSink, StdoutSink, VecSink};
pub use value::Value;
