//! Lexer for the preprocessed source text.
//!
//! The input at this stage is plain code plus the `#line` markers emitted by
//! the preprocessor; every other `#` directive has already been consumed.
mod token;

pub use token::*;

use std::{collections::HashMap, error::Error, fmt::Display};

use log::debug;
use once_cell::sync::Lazy;

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    HashMap::from([
        ("int", TokenKind::IntKeyword),
        ("return", TokenKind::ReturnKeyword),
        ("if", TokenKind::IfKeyword),
        ("else", TokenKind::ElseKeyword),
        ("while", TokenKind::WhileKeyword),
    ])
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub line: usize,
}

impl Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at line {}", self.message, self.line)
    }
}

impl Error for LexError {}

pub type LexResult<T> = Result<T, LexError>;

/// Turn the preprocessed source into a token stream terminated by [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> LexResult<Vec<Token>> {
    Lexer::new(source).lex()
}

pub struct Lexer<'a> {
    input: &'a [u8],
    position: usize,
    line: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            position: 0,
            line: 1,
            tokens: vec![],
        }
    }

    pub fn lex(mut self) -> LexResult<Vec<Token>> {
        loop {
            self.eat_whitespace();

            let Some(&next) = self.input.get(self.position) else {
                break;
            };

            match next {
                b'#' => self.lex_line_directive()?,
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.lex_word(),
                b'0'..=b'9' => self.lex_number(),
                _ => self.lex_operator()?,
            }
        }

        self.tokens.push(Token {
            kind: TokenKind::Eof,
            line: self.line,
        });

        debug!("lexed {} tokens", self.tokens.len());

        Ok(self.tokens)
    }

    fn eat_whitespace(&mut self) {
        while let Some(&next) = self.input.get(self.position) {
            if !next.is_ascii_whitespace() {
                return;
            }

            if next == b'\n' {
                self.line += 1;
            }
            self.position += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.position).copied()
    }

    /// Consume a `#line N "file"` marker and reset the line counter to `N`.
    /// Any other `#` directive is an error at this stage.
    fn lex_line_directive(&mut self) -> LexResult<()> {
        self.position += 1;
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace() && b != b'\n') {
            self.position += 1;
        }

        if self.input[self.position..].starts_with(b"line") {
            self.position += 4;
            while matches!(self.peek(), Some(b) if b.is_ascii_whitespace() && b != b'\n') {
                self.position += 1;
            }

            if matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
                let mut new_line = 0usize;
                while let Some(digit) = self.peek().filter(u8::is_ascii_digit) {
                    new_line = new_line * 10 + usize::from(digit - b'0');
                    self.position += 1;
                }
                self.line = new_line;

                // Discard the rest of the directive, including the file name.
                // The trailing newline must not bump the counter we just set.
                while matches!(self.peek(), Some(b) if b != b'\n') {
                    self.position += 1;
                }
                if self.peek() == Some(b'\n') {
                    self.position += 1;
                }
                return Ok(());
            }
        }

        Err(LexError {
            message: "unexpected character '#'".to_owned(),
            line: self.line,
        })
    }

    fn lex_word(&mut self) {
        let line = self.line;
        let start = self.position;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.position += 1;
        }

        let word = std::str::from_utf8(&self.input[start..self.position])
            .expect("identifier bytes are ASCII")
            .to_owned();

        let kind = match KEYWORDS.get(word.as_str()) {
            Some(keyword) => keyword.clone(),
            None => TokenKind::Identifier(word),
        };

        self.tokens.push(Token { kind, line });
    }

    fn lex_number(&mut self) {
        let line = self.line;
        let start = self.position;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.position += 1;
        }

        let digits = std::str::from_utf8(&self.input[start..self.position])
            .expect("digit bytes are ASCII");

        // Values outside the 32 bit range saturate.
        let value = digits
            .parse::<i64>()
            .unwrap_or(i64::MAX)
            .clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;

        self.tokens.push(Token {
            kind: TokenKind::Number(value),
            line,
        });
    }

    fn lex_operator(&mut self) -> LexResult<()> {
        let line = self.line;
        let next = self.input[self.position];
        let following = self.input.get(self.position + 1).copied();

        let two_char = match (next, following) {
            (b'=', Some(b'=')) => Some(TokenKind::Equal),
            (b'!', Some(b'=')) => Some(TokenKind::NotEqual),
            (b'<', Some(b'=')) => Some(TokenKind::LessOrEqual),
            (b'>', Some(b'=')) => Some(TokenKind::GreaterOrEqual),
            _ => None,
        };

        if let Some(kind) = two_char {
            self.position += 2;
            self.tokens.push(Token { kind, line });
            return Ok(());
        }

        let kind = match next {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b';' => TokenKind::Semicolon,
            b',' => TokenKind::Comma,
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Times,
            b'/' => TokenKind::Slash,
            b'=' => TokenKind::Assign,
            b'<' => TokenKind::LessThan,
            b'>' => TokenKind::GreaterThan,
            _ => {
                return Err(LexError {
                    message: format!("unexpected character '{}'", char::from(next)),
                    line,
                })
            }
        };

        self.position += 1;
        self.tokens.push(Token { kind, line });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn test_lex_identifier() {
        assert_eq!(
            tokenize("letter").unwrap(),
            vec![
                Token {
                    kind: TokenKind::Identifier("letter".to_owned()),
                    line: 1
                },
                Token {
                    kind: TokenKind::Eof,
                    line: 1
                }
            ]
        );
    }

    #[test]
    fn test_lex_number() {
        assert_eq!(
            kinds("1337"),
            vec![TokenKind::Number(1337), TokenKind::Eof]
        );
    }

    #[test]
    fn test_lex_number_saturates() {
        assert_eq!(
            kinds("99999999999999999999"),
            vec![TokenKind::Number(i32::MAX), TokenKind::Eof]
        );
    }

    #[test]
    fn test_lex_keywords() {
        assert_eq!(
            kinds("int return if else while"),
            vec![
                TokenKind::IntKeyword,
                TokenKind::ReturnKeyword,
                TokenKind::IfKeyword,
                TokenKind::ElseKeyword,
                TokenKind::WhileKeyword,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_keyword_prefix_is_identifier() {
        assert_eq!(
            kinds("integer"),
            vec![TokenKind::Identifier("integer".to_owned()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_lex_operators_greedily() {
        assert_eq!(
            kinds("= == != < <= > >= <== "),
            vec![
                TokenKind::Assign,
                TokenKind::Equal,
                TokenKind::NotEqual,
                TokenKind::LessThan,
                TokenKind::LessOrEqual,
                TokenKind::GreaterThan,
                TokenKind::GreaterOrEqual,
                TokenKind::LessOrEqual,
                TokenKind::Assign,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_function() {
        assert_eq!(
            kinds("int main() { return 42; }"),
            vec![
                TokenKind::IntKeyword,
                TokenKind::Identifier("main".to_owned()),
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::ReturnKeyword,
                TokenKind::Number(42),
                TokenKind::Semicolon,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_line_tracking() {
        let tokens = tokenize("int\n\nmain").unwrap();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_line_directive_resets_counter() {
        let tokens = tokenize("#line 10 \"foo.c\"\nx").unwrap();
        assert_eq!(
            tokens[0],
            Token {
                kind: TokenKind::Identifier("x".to_owned()),
                line: 10
            }
        );
    }

    #[test]
    fn test_line_directive_without_file() {
        let tokens = tokenize("#line 7\ny").unwrap();
        assert_eq!(tokens[0].line, 7);
    }

    #[test]
    fn test_unknown_directive_is_error() {
        let error = tokenize("#pragma once\n").unwrap_err();
        assert_eq!(error.line, 1);
        assert!(error.message.contains('#'));
    }

    #[test]
    fn test_unexpected_character() {
        let error = tokenize("int a = 1 @ 2;").unwrap_err();
        assert_eq!(
            error,
            LexError {
                message: "unexpected character '@'".to_owned(),
                line: 1
            }
        );
    }

    #[test]
    fn test_eof_carries_last_line() {
        let tokens = tokenize("a\nb\nc").unwrap();
        assert_eq!(tokens.last().unwrap().line, 3);
    }
}
