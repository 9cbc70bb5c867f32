//! Diagnostic reparser: recovers a precise message after a fast-path failure.
//!
//! The source is retokenized and replayed through a small instrumented
//! automaton that mirrors the statement grammar. Each automaton state has an
//! integer ID keyed into a curated message table; the registers accumulated
//! during replay (open groups, pending operator, last operand, statement
//! start) fill the message's placeholders and locate the excerpt.
//!
//! The automaton tracks the grammar closely but not perfectly. When replay
//! reaches the end without faulting even though the grammar rejected the
//! input, the fallback message is issued from the grammar's own error
//! position instead. States without a curated entry also use the fallback.

use std::collections::BTreeMap;

use miette::NamedSource;
use once_cell::sync::Lazy;
use pest::error::{InputLocation, LineColLocation};

use crate::ast::Pos;
use crate::errors::ParseError;
use crate::syntax::scanner::{self, Token, TokenKind};
use crate::syntax::Rule;

pub const STATE_STMT_START: u8 = 0;
pub const STATE_EXPECT_OPERAND: u8 = 1;
pub const STATE_AFTER_OPERAND: u8 = 2;
pub const STATE_AFTER_MEMBER: u8 = 3;
pub const STATE_AFTER_PRINT: u8 = 4;
pub const STATE_EXPECT_EOL: u8 = 5;
pub const STATE_UNCLOSED_GROUP: u8 = 6;

/// Curated message templates, keyed by automaton state ID. Placeholders:
/// `{found}` (pre-quoted token or "end of line"/"end of input"), `{after}`
/// (operator awaiting a value), `{operand}` (last completed operand),
/// `{group}` (most recent unclosed opener).
static STATE_MESSAGES: Lazy<BTreeMap<u8, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        (STATE_STMT_START, "a statement cannot begin with {found}"),
        (
            STATE_EXPECT_OPERAND,
            "expected a value after '{after}', found {found}",
        ),
        (
            STATE_AFTER_OPERAND,
            "expected an operator or end of line after '{operand}', found {found}",
        ),
        (
            STATE_AFTER_MEMBER,
            "expected a member name after '.', found {found}",
        ),
        (
            STATE_UNCLOSED_GROUP,
            "the group opened by '{group}' is never closed",
        ),
    ])
});

/// Used for states with no curated entry, and for replays that never fault.
const FALLBACK_MESSAGE: &str = "the statement is not well formed near {found}";

/// Longest excerpt shown in a diagnostic, in characters.
const EXCERPT_BUDGET: usize = 20;

/// Entry point: classify a fast-path failure and format the final error.
pub fn diagnose(source: &str, name: &str, err: &pest::error::Error<Rule>) -> ParseError {
    let tokens = match scanner::tokenize(source, name) {
        Ok(tokens) => tokens,
        // Malformed token: the scanner's message wins outright.
        Err(lexical) => return lexical,
    };

    let mut reparser = Reparser::new();
    match reparser.replay(&tokens) {
        Some(failure) => reparser.format_failure(source, name, failure),
        None => generic_syntax_error(source, name, err),
    }
}

struct Failure {
    state: u8,
    found: Option<Token>,
}

/// Replay automaton state plus the registers that feed message placeholders.
struct Reparser {
    state: u8,
    /// Open-group tokens, innermost last.
    groups: Vec<Token>,
    /// Operator or opener still waiting for a value.
    after: Option<Token>,
    /// Most recent completed operand.
    operand: Option<Token>,
    /// Byte offset where the current statement begins.
    stmt_start: usize,
    /// The next operand position is the head of an expression, where print
    /// and assignment forms are grammatical.
    at_expr_head: bool,
    /// The expression head so far is exactly one identifier, making an
    /// assignment operator valid next.
    lone_ident: bool,
    last_consumed: Option<Token>,
}

impl Reparser {
    fn new() -> Self {
        Reparser {
            state: STATE_STMT_START,
            groups: Vec::new(),
            after: None,
            operand: None,
            stmt_start: 0,
            at_expr_head: false,
            lone_ident: false,
            last_consumed: None,
        }
    }

    /// Feeds every token, then end-of-input. Returns the first fault, if any.
    fn replay(&mut self, tokens: &[Token]) -> Option<Failure> {
        for token in tokens {
            if let Err(failure) = self.step(Some(token)) {
                return Some(failure);
            }
            self.last_consumed = Some(token.clone());
        }
        self.step(None).err()
    }

    fn step(&mut self, token: Option<&Token>) -> Result<(), Failure> {
        match self.state {
            STATE_STMT_START => self.at_statement_start(token),
            STATE_EXPECT_OPERAND | STATE_AFTER_MEMBER => self.operand_position(token),
            STATE_AFTER_OPERAND => self.operator_position(token),
            STATE_AFTER_PRINT => self.after_print(token),
            STATE_EXPECT_EOL => self.expect_end_of_line(token),
            state => unreachable!("automaton has no state {state}"),
        }
    }

    fn at_statement_start(&mut self, token: Option<&Token>) -> Result<(), Failure> {
        let Some(token) = token else {
            return Ok(());
        };
        match token.kind {
            TokenKind::Newline => {
                self.begin_statement(token.end);
                Ok(())
            }
            TokenKind::Comment | TokenKind::DocComment => {
                self.state = STATE_EXPECT_EOL;
                Ok(())
            }
            _ if starts_operand(token) || is_prefix(token) => {
                self.state = STATE_EXPECT_OPERAND;
                self.at_expr_head = true;
                self.lone_ident = false;
                self.operand_position(Some(token))
            }
            _ => Err(self.fail(STATE_STMT_START, Some(token))),
        }
    }

    fn operand_position(&mut self, token: Option<&Token>) -> Result<(), Failure> {
        // Member access reports through its own state ID.
        let fail_state = if self.state == STATE_AFTER_MEMBER {
            STATE_AFTER_MEMBER
        } else {
            STATE_EXPECT_OPERAND
        };
        let Some(token) = token else {
            return Err(self.fail(fail_state, None));
        };
        match token.kind {
            TokenKind::Newline => Err(self.fail(fail_state, Some(token))),
            TokenKind::LParen => {
                self.groups.push(token.clone());
                self.state = STATE_EXPECT_OPERAND;
                self.after = Some(token.clone());
                // A group restarts an expression, so assignment is legal inside.
                self.at_expr_head = true;
                self.lone_ident = false;
                Ok(())
            }
            TokenKind::Op if is_prefix(token) => {
                self.state = STATE_EXPECT_OPERAND;
                self.after = Some(token.clone());
                self.at_expr_head = false;
                self.lone_ident = false;
                Ok(())
            }
            TokenKind::SpecialIdent if token.text == "$print" && self.at_expr_head => {
                self.state = STATE_AFTER_PRINT;
                Ok(())
            }
            _ if starts_operand(token) => {
                self.lone_ident = token.kind == TokenKind::Ident && self.at_expr_head;
                self.at_expr_head = false;
                self.operand = Some(token.clone());
                self.state = STATE_AFTER_OPERAND;
                Ok(())
            }
            _ => Err(self.fail(fail_state, Some(token))),
        }
    }

    fn operator_position(&mut self, token: Option<&Token>) -> Result<(), Failure> {
        let Some(token) = token else {
            if self.groups.is_empty() {
                return Ok(());
            }
            return Err(self.fail(STATE_UNCLOSED_GROUP, None));
        };
        match token.kind {
            TokenKind::Newline => {
                // Groups cannot span lines.
                if self.groups.is_empty() {
                    self.begin_statement(token.end);
                    Ok(())
                } else {
                    Err(self.fail(STATE_UNCLOSED_GROUP, Some(token)))
                }
            }
            TokenKind::RParen => {
                if self.groups.pop().is_some() {
                    // The closed group is itself an operand.
                    self.operand = Some(token.clone());
                    self.lone_ident = false;
                    Ok(())
                } else {
                    Err(self.fail(STATE_AFTER_OPERAND, Some(token)))
                }
            }
            TokenKind::Op if token.text == "." => {
                self.state = STATE_AFTER_MEMBER;
                self.after = Some(token.clone());
                Ok(())
            }
            TokenKind::Op if is_assign(&token.text) => {
                if self.lone_ident {
                    self.state = STATE_EXPECT_OPERAND;
                    self.after = Some(token.clone());
                    self.at_expr_head = true;
                    self.lone_ident = false;
                    Ok(())
                } else {
                    Err(self.fail(STATE_AFTER_OPERAND, Some(token)))
                }
            }
            TokenKind::Op if is_infix(&token.text) => {
                self.state = STATE_EXPECT_OPERAND;
                self.after = Some(token.clone());
                self.at_expr_head = false;
                self.lone_ident = false;
                Ok(())
            }
            _ => Err(self.fail(STATE_AFTER_OPERAND, Some(token))),
        }
    }

    /// After `$print` at an expression head. If the next token can begin an
    /// expression it becomes print's operand; otherwise `$print` itself was
    /// a plain operand and the token is retried in operator position.
    fn after_print(&mut self, token: Option<&Token>) -> Result<(), Failure> {
        let print_token = self.last_consumed.clone();
        match token {
            Some(t) if starts_operand(t) || is_prefix(t) => {
                self.state = STATE_EXPECT_OPERAND;
                self.after = print_token;
                self.at_expr_head = true;
                self.lone_ident = false;
                self.operand_position(Some(t))
            }
            other => {
                self.operand = print_token;
                self.state = STATE_AFTER_OPERAND;
                self.operator_position(other)
            }
        }
    }

    fn expect_end_of_line(&mut self, token: Option<&Token>) -> Result<(), Failure> {
        match token {
            None => Ok(()),
            Some(t) if t.kind == TokenKind::Newline => {
                self.begin_statement(t.end);
                Ok(())
            }
            Some(t) => Err(self.fail(STATE_EXPECT_EOL, Some(t))),
        }
    }

    fn begin_statement(&mut self, offset: usize) {
        self.state = STATE_STMT_START;
        self.stmt_start = offset;
        self.after = None;
        self.operand = None;
        self.at_expr_head = false;
        self.lone_ident = false;
    }

    fn fail(&self, state: u8, found: Option<&Token>) -> Failure {
        Failure {
            state,
            found: found.cloned(),
        }
    }

    fn format_failure(&self, source: &str, name: &str, failure: Failure) -> ParseError {
        let template = STATE_MESSAGES
            .get(&failure.state)
            .copied()
            .unwrap_or(FALLBACK_MESSAGE);

        let found_text = render_found(failure.found.as_ref());
        let message = template
            .replace("{found}", &found_text)
            .replace("{after}", register_text(self.after.as_ref()))
            .replace("{operand}", register_text(self.operand.as_ref()))
            .replace("{group}", register_text(self.groups.last()));

        let location = match (&self.last_consumed, &failure.found) {
            (Some(t), _) | (None, Some(t)) => Pos::new(t.line, t.col).location(),
            (None, None) => Pos::new(1, 1).location(),
        };

        let excerpt_end = match &failure.found {
            Some(t) if t.kind == TokenKind::Newline => t.start,
            Some(t) => t.end,
            None => source.len(),
        };
        let excerpt = clip(&compress(&source[self.stmt_start..excerpt_end]));

        let span = match &failure.found {
            Some(t) => {
                let (start, end) = t.span();
                (start, end - start)
            }
            None => (source.len(), 0),
        };

        ParseError::Syntax {
            location,
            excerpt,
            message,
            src: NamedSource::new(name, source.to_string()),
            span: span.into(),
        }
    }
}

fn starts_operand(token: &Token) -> bool {
    matches!(
        token.kind,
        TokenKind::Int
            | TokenKind::Float
            | TokenKind::Str
            | TokenKind::Ident
            | TokenKind::SpecialIdent
            | TokenKind::LParen
    )
}

fn is_prefix(token: &Token) -> bool {
    token.kind == TokenKind::Op && matches!(token.text.as_str(), "-" | "!" | "?")
}

fn is_assign(text: &str) -> bool {
    matches!(
        text,
        ":=" | "=" | "+=" | "-=" | "*=" | "/=" | "//=" | "%=" | "^=" | "??="
    )
}

fn is_infix(text: &str) -> bool {
    matches!(
        text,
        "^" | "*"
            | "/"
            | "//"
            | "%"
            | "+"
            | "-"
            | "."
            | "&&"
            | "||"
            | "??"
            | "==="
            | "!=="
            | "=="
            | "!="
            | "<="
            | "<"
            | ">="
            | ">"
            | "~="
            | "in"
    )
}

fn render_found(token: Option<&Token>) -> String {
    match token {
        None => "end of input".to_string(),
        Some(t) if t.kind == TokenKind::Newline => "end of line".to_string(),
        Some(t) => format!("'{}'", t.text),
    }
}

fn register_text(token: Option<&Token>) -> &str {
    token.map(|t| t.text.as_str()).unwrap_or("")
}

/// Replaces control characters with spaces and collapses whitespace runs.
fn compress(text: &str) -> String {
    let sanitized: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    sanitized.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keeps the tail of an over-budget excerpt, marked with a leading ellipsis.
fn clip(text: &str) -> String {
    let count = text.chars().count();
    if count <= EXCERPT_BUDGET {
        return text.to_string();
    }
    let tail: String = text
        .chars()
        .skip(count - (EXCERPT_BUDGET - 1))
        .collect();
    format!("…{tail}")
}

/// Replay accepted where the grammar did not: report from the grammar's own
/// error position with the fallback message.
fn generic_syntax_error(source: &str, name: &str, err: &pest::error::Error<Rule>) -> ParseError {
    let pos = match err.location {
        InputLocation::Pos(p) => p,
        InputLocation::Span((start, _)) => start,
    };
    let (line, col) = match err.line_col {
        LineColLocation::Pos(lc) => lc,
        LineColLocation::Span(lc, _) => lc,
    };

    let pos = pos.min(source.len());
    let line_start = source[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = source[pos..]
        .find('\n')
        .map(|i| pos + i)
        .unwrap_or(source.len());

    let found = match source[pos..line_end].chars().next() {
        Some(c) => format!("'{c}'"),
        None => "end of input".to_string(),
    };

    ParseError::Syntax {
        location: Pos::new(line, col).location(),
        excerpt: clip(&compress(&source[line_start..line_end])),
        message: FALLBACK_MESSAGE.replace("{found}", &found),
        src: NamedSource::new(name, source.to_string()),
        span: (pos, 0).into(),
    }
}
