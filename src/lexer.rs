use logos::Logos;
use std::fmt;

use crate::Span;

/// Token kinds for the surface syntax. There are exactly three: the two
/// parentheses and atoms. An atom is any maximal run of characters that are
/// neither parentheses nor whitespace, so the rules below cover every
/// possible input character and lexing cannot fail.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")] // Skip whitespace
pub enum TokenKind {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[regex(r"[^ \t\n\r()]+", |lex| lex.slice().to_string())]
    Atom(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

// Implement Display for easy printing
impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Atom(s) => write!(f, "{}", s),
        }
    }
}

/// Tokenize a string. A pure, total function: an empty input yields an empty
/// token sequence, and there is no failure mode because the token rules are
/// complementary.
pub fn tokenize(input: &str) -> Vec<Token> {
    TokenKind::lexer(input)
        .spanned()
        .filter_map(|(kind, range)| {
            // The Err side is unreachable: every non-whitespace character
            // matches a paren token or the atom regex.
            kind.ok().map(|kind| Token {
                kind,
                span: Span::new(range.start, range.end),
            })
        })
        .collect()
}
