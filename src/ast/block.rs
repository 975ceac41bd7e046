use crate::{
    lexer::TokenKind,
    parser::{ParseError, ParseResult, TokenStream},
};

use super::Statement;

/// A brace delimited sequence of statements.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
}

impl Block {
    /// A block without statements. Emits nothing during generation.
    pub fn empty() -> Block {
        Block::default()
    }

    pub fn parse(stream: &mut TokenStream) -> ParseResult<Block> {
        stream.expect(TokenKind::LBrace, "'{'")?;

        let mut statements = vec![];
        while !stream.eat(&TokenKind::RBrace) {
            if stream.peek().kind == TokenKind::Eof {
                return Err(ParseError::expected("'}'", stream.line()));
            }
            statements.push(Statement::parse(stream)?);
        }

        Ok(Block { statements })
    }
}
