//! Fast-path parser: grammar to positioned AST in one pass.
//!
//! Silent on success. On any grammar failure the same source is handed to
//! `diagnose`, which classifies it as lexical or syntactic and formats the
//! final message; no partial AST ever escapes.

use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use num_bigint::BigInt;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;

use crate::ast::{AugOp, BinaryOp, CompareOp, Expr, LogicOp, Module, Pos, Stmt, UnaryOp};
use crate::errors::ParseError;
use crate::syntax::{diagnose, RillParser, Rule};

lazy_static! {
    // Precedence, lowest to highest.
    static ref PRATT: PrattParser<Rule> = PrattParser::new()
        .op(Op::infix(Rule::coalesce, Assoc::Right))
        .op(Op::infix(Rule::or_op, Assoc::Left))
        .op(Op::infix(Rule::and_op, Assoc::Left))
        .op(Op::infix(Rule::id_eq, Assoc::Left)
            | Op::infix(Rule::id_ne, Assoc::Left)
            | Op::infix(Rule::eq, Assoc::Left)
            | Op::infix(Rule::ne, Assoc::Left)
            | Op::infix(Rule::le, Assoc::Left)
            | Op::infix(Rule::lt, Assoc::Left)
            | Op::infix(Rule::ge, Assoc::Left)
            | Op::infix(Rule::gt, Assoc::Left)
            | Op::infix(Rule::match_op, Assoc::Left)
            | Op::infix(Rule::in_op, Assoc::Left))
        .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
        .op(Op::infix(Rule::mul, Assoc::Left)
            | Op::infix(Rule::div, Assoc::Left)
            | Op::infix(Rule::floordiv, Assoc::Left)
            | Op::infix(Rule::mod_op, Assoc::Left))
        .op(Op::prefix(Rule::neg) | Op::prefix(Rule::not_op) | Op::prefix(Rule::boolify))
        .op(Op::infix(Rule::pow, Assoc::Right))
        .op(Op::infix(Rule::member, Assoc::Left));
}

/// Parses source text into a module, or a formatted diagnostic.
pub fn parse_text(source: &str) -> Result<Module, ParseError> {
    parse_named(source, "<input>")
}

/// Reads and parses a file. Read failures are reported as `ParseError::Io`.
pub fn parse_file(path: &Path) -> Result<Module, ParseError> {
    let source = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_named(&source, &path.display().to_string())
}

pub fn parse_named(source: &str, name: &str) -> Result<Module, ParseError> {
    match RillParser::parse(Rule::program, source) {
        Ok(mut pairs) => {
            let program = pairs.next().unwrap(); // pest guarantees the program rule exists
            build_module(program)
        }
        Err(err) => Err(diagnose::diagnose(source, name, &err)),
    }
}

fn build_module(program: Pair<Rule>) -> Result<Module, ParseError> {
    let mut statements = Vec::new();
    for pair in program.into_inner() {
        match pair.as_rule() {
            Rule::EOI => continue,
            Rule::doc_comment => {
                statements.push(Stmt::DocComment(pair.as_str().to_string(), pos_of(&pair)));
            }
            Rule::comment => {
                statements.push(Stmt::Comment(pair.as_str().to_string(), pos_of(&pair)));
            }
            Rule::blank => statements.push(Stmt::Blank(pos_of(&pair))),
            Rule::expr_stmt => {
                let inner = pair.into_inner().next().unwrap(); // expr_stmt wraps one expression
                statements.push(Stmt::Expr(build_expression(inner)?));
            }
            rule => unreachable!("unexpected statement rule: {rule:?}"),
        }
    }
    Ok(Module::new(statements))
}

fn build_expression(pair: Pair<Rule>) -> Result<Expr, ParseError> {
    let inner = pair.into_inner().next().unwrap(); // expression wraps one alternative
    match inner.as_rule() {
        Rule::print_expr => {
            let pos = pos_of(&inner);
            let mut parts = inner.into_inner();
            let _keyword = parts.next().unwrap(); // print_kw
            let operand = build_expression(parts.next().unwrap())?;
            Ok(Expr::Print {
                operand: Box::new(operand),
                pos,
            })
        }
        Rule::assign_expr => {
            let pos = pos_of(&inner);
            let mut parts = inner.into_inner();
            let target = parts.next().unwrap().as_str().to_string();
            let op_text = parts.next().unwrap().as_str().to_string();
            let value = Box::new(build_expression(parts.next().unwrap())?);
            Ok(match op_text.as_str() {
                ":=" => Expr::Assign { target, value, pos },
                "=" => Expr::Reassign { target, value, pos },
                other => Expr::AugAssign {
                    op: aug_op(other),
                    target,
                    value,
                    pos,
                },
            })
        }
        Rule::infix_expr => build_infix(inner.into_inner()),
        rule => unreachable!("unexpected expression rule: {rule:?}"),
    }
}

fn build_infix(pairs: Pairs<Rule>) -> Result<Expr, ParseError> {
    PRATT
        .map_primary(build_primary)
        .map_prefix(|op, rhs| {
            let pos = pos_of(&op);
            let op = match op.as_rule() {
                Rule::neg => UnaryOp::Neg,
                Rule::not_op => UnaryOp::Not,
                Rule::boolify => UnaryOp::AsBool,
                rule => unreachable!("unexpected prefix rule: {rule:?}"),
            };
            Ok(Expr::Unary {
                op,
                operand: Box::new(rhs?),
                pos,
            })
        })
        .map_infix(|lhs, op, rhs| {
            let lhs = Box::new(lhs?);
            let rhs = Box::new(rhs?);
            // Position of a binary node is that of its leading token.
            let pos = lhs.pos();
            Ok(match op.as_rule() {
                Rule::pow => binary(BinaryOp::Pow, lhs, rhs, pos),
                Rule::mul => binary(BinaryOp::Mul, lhs, rhs, pos),
                Rule::div => binary(BinaryOp::Div, lhs, rhs, pos),
                Rule::floordiv => binary(BinaryOp::FloorDiv, lhs, rhs, pos),
                Rule::mod_op => binary(BinaryOp::Mod, lhs, rhs, pos),
                Rule::add => binary(BinaryOp::Add, lhs, rhs, pos),
                Rule::sub => binary(BinaryOp::Sub, lhs, rhs, pos),
                Rule::member => binary(BinaryOp::Member, lhs, rhs, pos),
                Rule::and_op => logic(LogicOp::And, lhs, rhs, pos),
                Rule::or_op => logic(LogicOp::Or, lhs, rhs, pos),
                Rule::coalesce => logic(LogicOp::Coalesce, lhs, rhs, pos),
                Rule::eq => compare(CompareOp::Eq, lhs, rhs, pos),
                Rule::ne => compare(CompareOp::Ne, lhs, rhs, pos),
                Rule::lt => compare(CompareOp::Lt, lhs, rhs, pos),
                Rule::le => compare(CompareOp::Le, lhs, rhs, pos),
                Rule::gt => compare(CompareOp::Gt, lhs, rhs, pos),
                Rule::ge => compare(CompareOp::Ge, lhs, rhs, pos),
                Rule::id_eq => compare(CompareOp::IdEq, lhs, rhs, pos),
                Rule::id_ne => compare(CompareOp::IdNe, lhs, rhs, pos),
                Rule::match_op => compare(CompareOp::Match, lhs, rhs, pos),
                Rule::in_op => compare(CompareOp::In, lhs, rhs, pos),
                rule => unreachable!("unexpected infix rule: {rule:?}"),
            })
        })
        .parse(pairs)
}

fn build_primary(pair: Pair<Rule>) -> Result<Expr, ParseError> {
    let pos = pos_of(&pair);
    match pair.as_rule() {
        Rule::int => {
            // Digit-only by grammar; BigInt has no size limit to hit.
            let n: BigInt = pair.as_str().parse().unwrap();
            Ok(Expr::Int(n, pos))
        }
        Rule::float => {
            let x: f64 = pair.as_str().parse().unwrap(); // grammar-shaped float
            Ok(Expr::Float(x, pos))
        }
        Rule::string => Ok(Expr::Str(unescape_string(pair.as_str()), pos)),
        Rule::nil_lit => Ok(Expr::Nil(pos)),
        Rule::bool_lit => Ok(Expr::Bool(pair.as_str() == "true", pos)),
        Rule::special_ident => Ok(Expr::SpecialIdent(pair.as_str()[1..].to_string(), pos)),
        Rule::ident => Ok(Expr::Ident(pair.as_str().to_string(), pos)),
        Rule::block => {
            let inner = pair.into_inner().next().unwrap(); // block wraps one expression
            Ok(Expr::Block {
                inner: Box::new(build_expression(inner)?),
                pos,
            })
        }
        rule => unreachable!("unexpected primary rule: {rule:?}"),
    }
}

fn binary(op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr>, pos: Pos) -> Expr {
    Expr::Binary { op, lhs, rhs, pos }
}

fn logic(op: LogicOp, lhs: Box<Expr>, rhs: Box<Expr>, pos: Pos) -> Expr {
    Expr::Logic { op, lhs, rhs, pos }
}

fn compare(op: CompareOp, lhs: Box<Expr>, rhs: Box<Expr>, pos: Pos) -> Expr {
    Expr::Compare { op, lhs, rhs, pos }
}

fn aug_op(text: &str) -> AugOp {
    match text {
        "^=" => AugOp::Pow,
        "*=" => AugOp::Mul,
        "/=" => AugOp::Div,
        "//=" => AugOp::FloorDiv,
        "%=" => AugOp::Mod,
        "+=" => AugOp::Add,
        "-=" => AugOp::Sub,
        "??=" => AugOp::Coalesce,
        other => unreachable!("unexpected assignment operator: {other}"),
    }
}

fn pos_of(pair: &Pair<Rule>) -> Pos {
    let (line, col) = pair.as_span().start_pos().line_col();
    Pos::new(line, col)
}

fn unescape_string(text: &str) -> String {
    // Surrounding quotes are part of the match.
    let inner = &text[1..text.len() - 1];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('0') => result.push('\0'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(ch);
        }
    }
    result
}
