//! Stack-based evaluation of statement lists.
//!
//! The evaluator walks the AST directly; there is no intermediate bytecode.
//! Its only mutable state is one value stack, which outlives individual
//! `evaluate` calls so an interactive session accumulates observable state.
//!
//! Stack discipline: evaluating any expression leaves a net +1 value on the
//! stack, and every expression statement pops exactly that one value. An
//! empty-stack pop is reported as `EvalError::StackUnderflow`, never UB.
//!
//! Typing is strict. Arithmetic is defined for (Int, Int) and
//! (Float, Float) operand pairs only; everything else, including mixed
//! int/float pairs, is an error naming both operand debug renderings. AST
//! forms outside the evaluated subset are rejected with their canonical
//! rendering, before their operands run, so the stack stays balanced.

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

use crate::ast::{BinaryOp, Expr, Stmt};
use crate::errors::EvalError;
use crate::runtime::value::Value;

/// Destination for evaluator output. Print output and result echoes go to
/// separate sinks so callers can route them independently.
pub trait OutputSink {
    fn emit(&mut self, text: &str);
}

/// Discards everything; for tests and silent runs.
pub struct NullSink;

impl OutputSink for NullSink {
    fn emit(&mut self, _text: &str) {}
}

pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn emit(&mut self, text: &str) {
        println!("{text}");
    }
}

pub struct StderrSink;

impl OutputSink for StderrSink {
    fn emit(&mut self, text: &str) {
        eprintln!("{text}");
    }
}

/// Captures emitted lines; for tests.
#[derive(Default)]
pub struct VecSink {
    pub lines: Vec<String>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputSink for VecSink {
    fn emit(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }
}

/// The evaluator: one value stack plus the echo flag controlling whether
/// non-nil statement results are written to the diagnostic channel.
#[derive(Default)]
pub struct Evaluator {
    stack: Vec<Value>,
    echo: bool,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_echo(echo: bool) -> Self {
        Self {
            stack: Vec::new(),
            echo,
        }
    }

    pub fn set_echo(&mut self, on: bool) {
        self.echo = on;
    }

    /// Read-only view of the live stack, for introspection.
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Drops all accumulated stack state.
    pub fn reset(&mut self) {
        self.stack.clear();
    }

    /// Evaluates statements in order. The first failure aborts the rest of
    /// this call; output already written (earlier prints) stands.
    pub fn evaluate(
        &mut self,
        statements: &[Stmt],
        out: &mut dyn OutputSink,
        echo_out: &mut dyn OutputSink,
    ) -> Result<(), EvalError> {
        for stmt in statements {
            self.evaluate_statement(stmt, out, echo_out)?;
        }
        Ok(())
    }

    pub fn evaluate_statement(
        &mut self,
        stmt: &Stmt,
        out: &mut dyn OutputSink,
        echo_out: &mut dyn OutputSink,
    ) -> Result<(), EvalError> {
        match stmt {
            Stmt::Expr(expr) => {
                self.evaluate_expr(expr, out)?;
                let value = self.pop()?;
                if self.echo && !value.is_nil() {
                    echo_out.emit(&format!("-> {}", value.debug_rendering()));
                }
                Ok(())
            }
            // Comments, doc comments and blank lines are no-ops.
            Stmt::Comment(..) | Stmt::DocComment(..) | Stmt::Blank(..) => Ok(()),
        }
    }

    /// Evaluates one expression, leaving exactly one new value on the stack.
    pub fn evaluate_expr(
        &mut self,
        expr: &Expr,
        out: &mut dyn OutputSink,
    ) -> Result<(), EvalError> {
        match expr {
            Expr::Nil(_) => self.stack.push(Value::Nil),
            Expr::Bool(b, _) => self.stack.push(Value::Bool(*b)),
            Expr::Int(n, _) => self.stack.push(Value::Int(n.clone())),
            Expr::Float(x, _) => self.stack.push(Value::Float(*x)),
            Expr::Str(s, _) => self.stack.push(Value::Str(s.clone())),

            Expr::Binary { op, lhs, rhs, .. } if op.is_evaluated() => {
                self.evaluate_expr(lhs, out)?;
                self.evaluate_expr(rhs, out)?;
                let right = self.pop()?;
                let left = self.pop()?;
                let result = apply_binary(*op, left, right)?;
                self.stack.push(result);
            }

            Expr::Print { operand, .. } => {
                self.evaluate_expr(operand, out)?;
                let value = self.pop()?;
                out.emit(&value.to_string());
                // Print is itself an expression; its value is nil.
                self.stack.push(Value::Nil);
            }

            // Everything else is outside the evaluated subset. Rejected up
            // front, before operands run, with the canonical rendering.
            other => {
                return Err(EvalError::UnhandledExpression {
                    rendering: other.to_string(),
                })
            }
        }
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, EvalError> {
        self.stack.pop().ok_or(EvalError::StackUnderflow)
    }
}

fn apply_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    match (op, lhs, rhs) {
        (BinaryOp::Pow, Value::Int(base), Value::Int(exp)) => {
            if exp.is_negative() {
                return Err(EvalError::NegativeExponent {
                    exponent: exp.to_string(),
                });
            }
            Ok(Value::Int(int_pow(&base, &exp)))
        }
        (BinaryOp::Pow, Value::Float(base), Value::Float(exp)) => Ok(Value::Float(base.powf(exp))),

        (BinaryOp::Mul, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a * b)),
        (BinaryOp::Add, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
        (BinaryOp::Sub, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a - b)),
        (BinaryOp::Div, Value::Int(a), Value::Int(b)) => {
            if b.is_zero() {
                return Err(EvalError::DivisionByZero {
                    op: "/",
                    lhs: a.to_string(),
                });
            }
            // num-bigint division truncates toward zero.
            Ok(Value::Int(a / b))
        }

        (BinaryOp::Mul, Value::Float(a), Value::Float(b)) => Ok(Value::Float(a * b)),
        (BinaryOp::Add, Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
        (BinaryOp::Sub, Value::Float(a), Value::Float(b)) => Ok(Value::Float(a - b)),
        (BinaryOp::Div, Value::Float(a), Value::Float(b)) => Ok(Value::Float(a / b)),

        (op, lhs, rhs) => Err(EvalError::UnsupportedOperands {
            op: op.symbol(),
            lhs: lhs.debug_rendering(),
            rhs: rhs.debug_rendering(),
        }),
    }
}

/// Exponentiation by squaring: 0 -> 1, 1 -> base, otherwise square the
/// half-exponent result and multiply once more by the base if the exponent
/// is odd. Caller guarantees a non-negative exponent.
fn int_pow(base: &BigInt, exp: &BigInt) -> BigInt {
    if exp.is_zero() {
        return BigInt::one();
    }
    if exp == &BigInt::one() {
        return base.clone();
    }
    let two = BigInt::from(2);
    let half = int_pow(base, &(exp / &two));
    let mut result = &half * &half;
    if exp % &two == BigInt::one() {
        result *= base;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> BigInt {
        BigInt::from(n)
    }

    #[test]
    fn int_pow_matches_repeated_multiplication() {
        for base in [-3i64, -1, 0, 1, 2, 5] {
            for exp in 0u32..10 {
                let expected = (0..exp).fold(BigInt::one(), |acc, _| acc * int(base));
                assert_eq!(int_pow(&int(base), &BigInt::from(exp)), expected);
            }
        }
    }

    #[test]
    fn int_pow_handles_large_exponents() {
        let result = int_pow(&int(2), &int(100));
        assert_eq!(result.to_string(), "1267650600228229401496703205376");
    }

    #[test]
    fn mixed_operands_are_rejected_with_debug_renderings() {
        let err = apply_binary(BinaryOp::Add, Value::Int(int(1)), Value::Float(2.0)).unwrap_err();
        assert_eq!(
            err,
            EvalError::UnsupportedOperands {
                op: "+",
                lhs: "1".into(),
                rhs: "2.0".into(),
            }
        );
    }

    #[test]
    fn string_operands_are_quoted_in_errors() {
        let err =
            apply_binary(BinaryOp::Mul, Value::Str("a".into()), Value::Int(int(2))).unwrap_err();
        assert_eq!(
            err,
            EvalError::UnsupportedOperands {
                op: "*",
                lhs: "\"a\"".into(),
                rhs: "2".into(),
            }
        );
    }

    #[test]
    fn integer_division_truncates_toward_zero() {
        let v = apply_binary(BinaryOp::Div, Value::Int(int(-7)), Value::Int(int(2))).unwrap();
        assert_eq!(v, Value::Int(int(-3)));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let err = apply_binary(BinaryOp::Div, Value::Int(int(1)), Value::Int(int(0))).unwrap_err();
        assert_eq!(
            err,
            EvalError::DivisionByZero {
                op: "/",
                lhs: "1".into(),
            }
        );
    }

    #[test]
    fn negative_exponent_is_an_error() {
        let err = apply_binary(BinaryOp::Pow, Value::Int(int(2)), Value::Int(int(-1))).unwrap_err();
        assert_eq!(
            err,
            EvalError::NegativeExponent {
                exponent: "-1".into(),
            }
        );
    }
}
