//! Recursive descent parser.
//!
//! The grammar itself lives with the AST nodes in [`crate::ast`]; this
//! module owns the cursor over the token vector and the error type the
//! node parsers report with.
use std::{error::Error, fmt::Display};

use log::debug;

use crate::{
    ast::Function,
    lexer::{Token, TokenKind},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
}

impl ParseError {
    pub fn expected(symbol: &str, line: usize) -> ParseError {
        ParseError {
            message: format!("expected {symbol}"),
            line,
        }
    }

    pub fn unexpected(kind: &TokenKind, line: usize) -> ParseError {
        ParseError {
            message: format!("unexpected token {kind}"),
            line,
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at line {}", self.message, self.line)
    }
}

impl Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parse a token vector into the tree for its single function definition.
pub fn parse(tokens: Vec<Token>) -> ParseResult<Function> {
    let mut stream = TokenStream::new(tokens);
    let function = Function::parse(&mut stream)?;
    debug!("parsed function '{}'", function.name);
    Ok(function)
}

/// Cursor over the token vector produced by the lexer.
///
/// Reads past the end keep yielding the trailing [`TokenKind::Eof`] token,
/// so the node parsers never have to deal with a missing token.
pub struct TokenStream {
    tokens: Vec<Token>,
    position: usize,
}

impl TokenStream {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.is_empty() {
            tokens.push(Token {
                kind: TokenKind::Eof,
                line: 1,
            });
        }

        Self {
            tokens,
            position: 0,
        }
    }

    pub fn peek(&self) -> &Token {
        self.tokens
            .get(self.position)
            .unwrap_or_else(|| &self.tokens[self.tokens.len() - 1])
    }

    /// Line number of the current token.
    pub fn line(&self) -> usize {
        self.peek().line
    }

    /// Step over the current token. The cursor never moves past the end.
    pub fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    /// Consume the current token if it matches `kind`.
    pub fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            return true;
        }
        false
    }

    /// Consume the current token if it matches `kind`, or fail naming the
    /// construct that was expected instead.
    pub fn expect(&mut self, kind: TokenKind, symbol: &str) -> ParseResult<()> {
        if self.eat(&kind) {
            return Ok(());
        }
        Err(ParseError::expected(symbol, self.line()))
    }
}
