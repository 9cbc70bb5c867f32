//! Token supplier for the diagnostic reparser.
//!
//! Tokenizes source through the grammar's `token_stream` rules, yielding
//! positioned tokens. A failure here is a lexical error and is reported
//! with the scanner's own message; the reparser automaton never sees it.

use miette::NamedSource;
use pest::error::{InputLocation, LineColLocation};
use pest::Parser;

use crate::errors::ParseError;
use crate::syntax::{RillParser, Rule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Comment,
    DocComment,
    Newline,
    LParen,
    RParen,
    Int,
    Float,
    Str,
    Ident,
    SpecialIdent,
    Op,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offsets into the source.
    pub start: usize,
    pub end: usize,
    /// 1-based position of the token's first character.
    pub line: usize,
    pub col: usize,
}

impl Token {
    pub fn span(&self) -> (usize, usize) {
        (self.start, self.end)
    }
}

/// Produces the positioned token stream for `source`, or a lexical error.
pub fn tokenize(source: &str, name: &str) -> Result<Vec<Token>, ParseError> {
    let mut pairs = RillParser::parse(Rule::token_stream, source)
        .map_err(|e| lexical_error(source, name, &e))?;

    let stream = pairs.next().unwrap(); // pest guarantees the token_stream rule exists

    let mut tokens = Vec::new();
    for pair in stream.into_inner() {
        let kind = match pair.as_rule() {
            Rule::doc_comment => TokenKind::DocComment,
            Rule::comment => TokenKind::Comment,
            Rule::newline_tok => TokenKind::Newline,
            Rule::lparen => TokenKind::LParen,
            Rule::rparen => TokenKind::RParen,
            Rule::int => TokenKind::Int,
            Rule::float => TokenKind::Float,
            Rule::string => TokenKind::Str,
            Rule::ident => TokenKind::Ident,
            Rule::special_ident => TokenKind::SpecialIdent,
            Rule::op_token => TokenKind::Op,
            Rule::EOI => continue,
            rule => unreachable!("unexpected token rule: {rule:?}"),
        };
        let span = pair.as_span();
        let (line, col) = span.start_pos().line_col();
        tokens.push(Token {
            kind,
            text: span.as_str().to_string(),
            start: span.start(),
            end: span.end(),
            line,
            col,
        });
    }
    Ok(tokens)
}

fn lexical_error(source: &str, name: &str, err: &pest::error::Error<Rule>) -> ParseError {
    let pos = match err.location {
        InputLocation::Pos(p) => p,
        InputLocation::Span((start, _)) => start,
    };
    let (line, col) = match err.line_col {
        LineColLocation::Pos(lc) => lc,
        LineColLocation::Span(lc, _) => lc,
    };

    let rest = &source[pos.min(source.len())..];
    let message = if rest.starts_with('"') {
        "unterminated string literal".to_string()
    } else if rest.starts_with('$') {
        "invalid special identifier".to_string()
    } else if let Some(c) = rest.chars().next() {
        format!("unrecognized character '{}'", c.escape_default())
    } else {
        "unexpected end of input".to_string()
    };

    let span_len = rest.chars().next().map(char::len_utf8).unwrap_or(0);
    ParseError::Lexical {
        message,
        line,
        col,
        src: NamedSource::new(name, source.to_string()),
        span: (pos, span_len).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_arithmetic() {
        let tokens = tokenize("2 + 3", "test").unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Int, TokenKind::Op, TokenKind::Int]);
        assert_eq!(tokens[1].text, "+");
        assert_eq!((tokens[1].line, tokens[1].col), (1, 3));
        assert_eq!(tokens[1].span(), (2, 3));
    }

    #[test]
    fn keyword_in_is_an_operator_but_prefix_words_are_not() {
        let tokens = tokenize("a in inner", "test").unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Ident, TokenKind::Op, TokenKind::Ident]);
    }

    #[test]
    fn longest_operator_wins() {
        let tokens = tokenize("x //= 2", "test").unwrap();
        assert_eq!(tokens[1].text, "//=");
    }

    #[test]
    fn unterminated_string_is_a_lexical_error() {
        let err = tokenize("\"abc", "test").unwrap_err();
        assert!(err.is_lexical());
        assert!(err.to_string().contains("unterminated string literal"));
    }

    #[test]
    fn stray_character_is_a_lexical_error() {
        let err = tokenize("1 @ 2", "test").unwrap_err();
        assert!(err.is_lexical());
        assert!(err.to_string().contains("unrecognized character '@'"));
    }

    #[test]
    fn comments_and_newlines_are_tokens() {
        let tokens = tokenize("# note\n## doc", "test").unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Comment, TokenKind::Newline, TokenKind::DocComment]
        );
    }
}
