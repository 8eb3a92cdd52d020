use crate::Span;
use crate::lexer::{Token, TokenKind, tokenize};
use crate::types::Node;
use std::iter::Peekable;
use std::vec::IntoIter; // To iterate over Vec<Token>
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Parse Error [at {}]: Unexpected token '{}', expected {expected}", .found.span, .found.kind)]
    UnexpectedToken { found: Token, expected: String }, // Found token, Expected description
    #[error("Parse Error: Unexpected end of input during parsing. Expected {0}")]
    UnexpectedEof(String),
}

// Result type alias for convenience
type ParseResult<T> = Result<T, ParseError>;

pub struct Parser {
    // We iterate over owned Tokens, consuming them from the front. Peekable
    // because a list keeps reading elements until it *sees* the ')'.
    tokens: Peekable<IntoIter<Token>>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens: tokens.into_iter().peekable(),
        }
    }

    // Consumes the next token if available.
    fn next_token(&mut self) -> Option<Token> {
        self.tokens.next()
    }

    /// Parses a single S-expression from the token stream.
    pub fn parse_expr(&mut self) -> ParseResult<Node> {
        match self.next_token() {
            Some(Token {
                kind: TokenKind::LParen,
                span,
            }) => self.parse_list(span),
            Some(found @ Token {
                kind: TokenKind::RParen,
                ..
            }) => Err(ParseError::UnexpectedToken {
                found,
                expected: "an atom or '('".to_string(),
            }),
            Some(Token {
                kind: TokenKind::Atom(text),
                span,
            }) => Ok(parse_atom(&text, span)),
            None => Err(ParseError::UnexpectedEof("an expression".to_string())),
        }
    }

    /// Parses the elements of a list after its '(' has been consumed.
    /// The emptiness check happens on every iteration, not just before the
    /// loop: `(1 2` must fail even though the first elements parse fine.
    fn parse_list(&mut self, lparen_span: Span) -> ParseResult<Node> {
        let mut elements = Vec::new();
        loop {
            match self.tokens.peek() {
                Some(token) if token.kind == TokenKind::RParen => {
                    let span = lparen_span.merge(token.span);
                    self.next_token(); // pop off ')'
                    return Ok(Node::new_list(elements, span));
                }
                Some(_) => elements.push(self.parse_expr()?),
                None => return Err(ParseError::UnexpectedEof("')'".to_string())),
            }
        }
    }

    /// Parses the entire token sequence as exactly one top-level expression.
    /// Anything left over after the first complete read is a syntax error.
    pub fn parse(mut self) -> ParseResult<Node> {
        let expr = self.parse_expr()?;

        if let Some(found) = self.next_token() {
            Err(ParseError::UnexpectedToken {
                found,
                expected: "end of input".to_string(),
            })
        } else {
            Ok(expr)
        }
    }
}

/// Atom classification: integer first, then float, then symbol. The order
/// matters: "42" must stay an exact integer so integer arithmetic survives
/// downstream.
fn parse_atom(text: &str, span: Span) -> Node {
    if let Ok(n) = text.parse::<i64>() {
        Node::new_int(n, span)
    } else if let Ok(n) = text.parse::<f64>() {
        Node::new_float(n, span)
    } else {
        Node::new_symbol(text, span)
    }
}

// Helper function to lex and parse a string directly (useful for tests and REPL)
pub fn parse_str(input: &str) -> ParseResult<Node> {
    Parser::new(tokenize(input)).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Span;
    use crate::types::Sexpr;

    // Helper for asserting successful parsing
    fn assert_parse(input: &str, expected: Node) {
        match parse_str(input) {
            Ok(result) => assert_eq!(result, expected, "Input: '{}'", input),
            Err(e) => panic!("Parsing failed for input '{}': {}", input, e),
        }
    }

    // Helper for asserting parse errors
    fn assert_parse_error(input: &str, expected_error_variant: ParseError) {
        match parse_str(input) {
            Ok(result) => panic!(
                "Expected parsing to fail for input '{}', but got: {:?}",
                input, result
            ),
            Err(e) => {
                // Compare enum variants, ignoring specific content
                assert_eq!(
                    std::mem::discriminant(&e),
                    std::mem::discriminant(&expected_error_variant),
                    "Input: '{}', Expected error variant like {:?}, got: {:?}",
                    input,
                    expected_error_variant,
                    e
                );
            }
        }
    }

    // Parse, then compare the rendered output. Simplifies assertions about
    // structure when exact spans don't matter.
    fn assert_parsed_sexpr_string(input: &str, expected_output: &str) {
        let node = match parse_str(input) {
            Ok(result) => result,
            Err(e) => panic!("Parsing failed for input '{}': {}", input, e),
        };
        assert_eq!(node.to_string(), expected_output, "Input: '{}'", input);
    }

    fn node_int(n: i64, start: usize, end: usize) -> Node {
        Node::new_int(n, Span::new(start, end))
    }

    fn node_float(n: f64, start: usize, end: usize) -> Node {
        Node::new_float(n, Span::new(start, end))
    }

    fn node_symbol(s: &str, start: usize, end: usize) -> Node {
        Node::new_symbol(s, Span::new(start, end))
    }

    fn node_list(nodes: Vec<Node>, start: usize, end: usize) -> Node {
        Node::new_list(nodes, Span::new(start, end))
    }

    fn unexpected_token(kind: TokenKind, start: usize, end: usize, expected: &str) -> ParseError {
        ParseError::UnexpectedToken {
            found: Token {
                kind,
                span: Span::new(start, end),
            },
            expected: expected.to_string(),
        }
    }

    #[test]
    fn test_parse_atoms() {
        assert_parse("123", node_int(123, 0, 3));
        assert_parse("-45", node_int(-45, 0, 3));
        assert_parse("-4.5", node_float(-4.5, 0, 4));
        assert_parse("1e3", node_float(1000.0, 0, 3));
        assert_parse("symbol", node_symbol("symbol", 0, 6));
        assert_parse("+", node_symbol("+", 0, 1));
        assert_parse("set!", node_symbol("set!", 0, 4));
    }

    #[test]
    fn test_parse_integer_first() {
        // "42" must become an exact integer, not a float
        assert_parse("42", node_int(42, 0, 2));
        assert_parse("42.0", node_float(42.0, 0, 4));
        // Number-like text that parses as neither kind is a symbol
        assert_parse("1.2.3", node_symbol("1.2.3", 0, 5));
        assert_parse("--5", node_symbol("--5", 0, 3));
    }

    #[test]
    fn test_parse_empty_list() {
        assert_parse("()", node_list(vec![], 0, 2));
        assert_parse("( )", node_list(vec![], 0, 3)); // With space
    }

    #[test]
    fn test_parse_simple_list() {
        assert_parse(
            "(+ 10 20)",
            node_list(
                vec![
                    node_symbol("+", 1, 2),
                    node_int(10, 3, 5),
                    node_int(20, 6, 8),
                ],
                0,
                9,
            ),
        );
    }

    #[test]
    fn test_parse_nested_list() {
        assert_parse(
            "(a (b c) d)",
            node_list(
                vec![
                    node_symbol("a", 1, 2),
                    node_list(vec![node_symbol("b", 4, 5), node_symbol("c", 6, 7)], 3, 8),
                    node_symbol("d", 9, 10),
                ],
                0,
                11,
            ),
        );
        assert_parse(
            "(()())",
            node_list(vec![node_list(vec![], 1, 3), node_list(vec![], 3, 5)], 0, 6),
        );
    }

    #[test]
    fn test_parse_errors_unexpected_token() {
        assert_parse_error("(1 2", ParseError::UnexpectedEof("')'".to_string()));
        assert_parse_error(
            ")",
            unexpected_token(TokenKind::RParen, 0, 1, "an atom or '('"),
        );
        assert_parse_error("(", ParseError::UnexpectedEof("')'".to_string())); // EOF inside list
        assert_parse_error("((1)", ParseError::UnexpectedEof("')'".to_string()));
    }

    #[test]
    fn test_parse_rejects_trailing_tokens() {
        // One complete expression followed by anything is an error, a stray
        // trailing ')' included.
        assert_parse_error(
            "(+ 1 2))",
            unexpected_token(TokenKind::RParen, 7, 8, "end of input"),
        );
        assert_parse_error(
            "(1) (2)",
            unexpected_token(TokenKind::LParen, 4, 5, "end of input"),
        );
        assert_parse_error(
            "1 2",
            unexpected_token(TokenKind::Atom("2".to_string()), 2, 3, "end of input"),
        );
    }

    #[test]
    fn test_parse_errors_eof() {
        assert_parse_error("", ParseError::UnexpectedEof("".to_string()));
        assert_parse_error("   ", ParseError::UnexpectedEof("".to_string()));
    }

    #[test]
    fn test_render_round_trip() {
        // render(parse(render(T))) == render(T) for trees of numbers,
        // symbols and lists
        let trees = [
            Node::new_int(42, Span::default()),
            Node::new_float(0.5, Span::default()),
            Node::new_symbol("x", Span::default()),
            Node::new_list(vec![], Span::default()),
            Node::new_list(
                vec![
                    Node::new_symbol("+", Span::default()),
                    Node::new_int(1, Span::default()),
                    Node::new_list(
                        vec![
                            Node::new_symbol("*", Span::default()),
                            Node::new_int(2, Span::default()),
                            Node::new_float(3.5, Span::default()),
                        ],
                        Span::default(),
                    ),
                ],
                Span::default(),
            ),
        ];

        for tree in &trees {
            let rendered = tree.to_string();
            let reparsed = parse_str(&rendered)
                .unwrap_or_else(|e| panic!("Re-parsing '{}' failed: {}", rendered, e));
            assert_eq!(reparsed.to_string(), rendered);
        }
    }

    #[test]
    fn test_rendered_structure() {
        assert_parsed_sexpr_string("(+ 1 (* 2 3))", "(+ 1 (* 2 3))");
        assert_parsed_sexpr_string("( a  (b   c )d)", "(a (b c) d)");
        // Floats keep their decimal point through the round trip
        assert_parsed_sexpr_string("(f 1.0 2.5)", "(f 1.0 2.5)");
    }

    #[test]
    fn test_no_quote_sugar() {
        // '" and ; have no reader meaning; they are ordinary atom characters
        assert_parse("'a", node_symbol("'a", 0, 2));
        assert_parsed_sexpr_string("('a ;b)", "('a ;b)");
    }

    #[test]
    fn test_whitespace_handling() {
        assert_parse(
            "  ( +\n1\t2 )  ",
            node_list(
                vec![
                    node_symbol("+", 4, 5),
                    node_int(1, 6, 7),
                    node_int(2, 8, 9),
                ],
                2,
                11,
            ),
        );
    }

    #[test]
    fn test_parse_sexpr_shapes() {
        // Spot-check the Sexpr kinds without spelling out spans
        match parse_str("(f 1 2.0 x)").map(|n| n.kind) {
            Ok(Sexpr::List(elements)) => {
                assert_eq!(elements.len(), 4);
                assert!(matches!(&elements[0].kind, Sexpr::Symbol(s) if s == "f"));
                assert!(matches!(
                    elements[1].kind,
                    Sexpr::Number(crate::types::Number::Int(1))
                ));
                assert!(matches!(
                    elements[2].kind,
                    Sexpr::Number(crate::types::Number::Float(n)) if n == 2.0
                ));
                assert!(matches!(&elements[3].kind, Sexpr::Symbol(s) if s == "x"));
            }
            other => panic!("Expected a list, got {:?}", other),
        }
    }
}
