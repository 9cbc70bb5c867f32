//! Positioned AST for Rill statements and expressions.
//!
//! Every node carries the position of its leading token. Positions feed
//! diagnostics and the statement listing only; evaluation never consults
//! them. Rendering is exhaustive so the compiler flags any new variant
//! that lacks a canonical textual form.

use std::fmt;

use num_bigint::BigInt;

/// 1-based source position of a node's leading token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pos {
    pub line: usize,
    pub col: usize,
}

impl Pos {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }

    /// Long form used in diagnostics, e.g. `line 1, column 3`.
    pub fn location(&self) -> String {
        format!("line {}, column {}", self.line, self.col)
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    AsBool,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::AsBool => "?",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Pow,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Add,
    Sub,
    Member,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Pow => "^",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Member => ".",
        }
    }

    /// The evaluator implements exactly these; everything else is rejected
    /// as an unhandled expression.
    pub fn is_evaluated(&self) -> bool {
        matches!(
            self,
            BinaryOp::Pow | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Add | BinaryOp::Sub
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
    Coalesce,
}

impl LogicOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            LogicOp::And => "&&",
            LogicOp::Or => "||",
            LogicOp::Coalesce => "??",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    IdEq,
    IdNe,
    Match,
    In,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::IdEq => "===",
            CompareOp::IdNe => "!==",
            CompareOp::Match => "~=",
            CompareOp::In => "in",
        }
    }
}

/// Operators that appear in compound-assignment position (`x += 1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AugOp {
    Pow,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Add,
    Sub,
    Coalesce,
}

impl AugOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            AugOp::Pow => "^=",
            AugOp::Mul => "*=",
            AugOp::Div => "/=",
            AugOp::FloorDiv => "//=",
            AugOp::Mod => "%=",
            AugOp::Add => "+=",
            AugOp::Sub => "-=",
            AugOp::Coalesce => "??=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Nil(Pos),
    Bool(bool, Pos),
    Int(BigInt, Pos),
    Float(f64, Pos),
    Str(String, Pos),
    Ident(String, Pos),
    SpecialIdent(String, Pos),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        pos: Pos,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        pos: Pos,
    },
    Logic {
        op: LogicOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        pos: Pos,
    },
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        pos: Pos,
    },
    AugAssign {
        op: AugOp,
        target: String,
        value: Box<Expr>,
        pos: Pos,
    },
    Assign {
        target: String,
        value: Box<Expr>,
        pos: Pos,
    },
    Reassign {
        target: String,
        value: Box<Expr>,
        pos: Pos,
    },
    Block {
        inner: Box<Expr>,
        pos: Pos,
    },
    Print {
        operand: Box<Expr>,
        pos: Pos,
    },
}

impl Expr {
    pub fn pos(&self) -> Pos {
        match self {
            Expr::Nil(pos)
            | Expr::Bool(_, pos)
            | Expr::Int(_, pos)
            | Expr::Float(_, pos)
            | Expr::Str(_, pos)
            | Expr::Ident(_, pos)
            | Expr::SpecialIdent(_, pos) => *pos,
            Expr::Unary { pos, .. }
            | Expr::Binary { pos, .. }
            | Expr::Logic { pos, .. }
            | Expr::Compare { pos, .. }
            | Expr::AugAssign { pos, .. }
            | Expr::Assign { pos, .. }
            | Expr::Reassign { pos, .. }
            | Expr::Block { pos, .. }
            | Expr::Print { pos, .. } => *pos,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Nil(_) => write!(f, "nil"),
            Expr::Bool(b, _) => write!(f, "{b}"),
            Expr::Int(n, _) => write!(f, "{n}"),
            Expr::Float(x, _) => write!(f, "{}", fmt_float(*x)),
            Expr::Str(s, _) => write!(f, "{}", quote_string(s)),
            Expr::Ident(name, _) => write!(f, "{name}"),
            Expr::SpecialIdent(name, _) => write!(f, "${name}"),
            Expr::Unary { op, operand, .. } => write!(f, "{}{operand}", op.symbol()),
            Expr::Binary { op, lhs, rhs, .. } => {
                if *op == BinaryOp::Member {
                    write!(f, "{lhs}.{rhs}")
                } else {
                    write!(f, "{lhs} {} {rhs}", op.symbol())
                }
            }
            Expr::Logic { op, lhs, rhs, .. } => write!(f, "{lhs} {} {rhs}", op.symbol()),
            Expr::Compare { op, lhs, rhs, .. } => write!(f, "{lhs} {} {rhs}", op.symbol()),
            Expr::AugAssign {
                op, target, value, ..
            } => write!(f, "{target} {} {value}", op.symbol()),
            Expr::Assign { target, value, .. } => write!(f, "{target} := {value}"),
            Expr::Reassign { target, value, .. } => write!(f, "{target} = {value}"),
            Expr::Block { inner, .. } => write!(f, "({inner})"),
            Expr::Print { operand, .. } => write!(f, "$print {operand}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Comment(String, Pos),
    DocComment(String, Pos),
    Expr(Expr),
    Blank(Pos),
}

impl Stmt {
    pub fn pos(&self) -> Pos {
        match self {
            Stmt::Comment(_, pos) | Stmt::DocComment(_, pos) | Stmt::Blank(pos) => *pos,
            Stmt::Expr(e) => e.pos(),
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Comment(text, _) | Stmt::DocComment(text, _) => write!(f, "{text}"),
            Stmt::Expr(e) => write!(f, "{e}"),
            Stmt::Blank(_) => Ok(()),
        }
    }
}

/// An ordered statement list; order is evaluation order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub statements: Vec<Stmt>,
}

impl Module {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }

    /// Batch listing for tooling: a 12-char right-aligned `line:col`
    /// prefix, a separator, and the statement rendering. Blank lines get
    /// the bare prefix.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for stmt in &self.statements {
            let prefix = format!("{:>12}", stmt.pos().to_string());
            match stmt {
                Stmt::Blank(_) => out.push_str(&prefix),
                _ => {
                    out.push_str(&prefix);
                    out.push_str(" | ");
                    out.push_str(&stmt.to_string());
                }
            }
            out.push('\n');
        }
        out
    }
}

/// Quotes a string and escapes control characters, for literal rendering
/// and debug renderings of string values.
pub(crate) fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Finite floats always render with a decimal point so they stay
/// distinguishable from integer renderings, whatever their magnitude.
pub(crate) fn fmt_float(x: f64) -> String {
    let text = format!("{x}");
    if x.is_finite() && !text.contains(['.', 'e', 'E']) {
        format!("{text}.0")
    } else {
        text
    }
}
