//! Parser Types
//!
//! The error type shared by the lexer and parser layers. Lexer problems
//! surface as `Illegal` tokens whose literal is the diagnostic; the parser
//! converts them into a `ParseError` carrying the token position.

use std::fmt;
use thiserror::Error;

use crate::parser::lexer::Token;

#[derive(Debug, Clone, Error)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parse error at {}:{}: {}",
            self.line, self.column, self.message
        )
    }
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }

    pub fn at(token: &Token, message: impl Into<String>) -> Self {
        Self::new(message, token.line, token.column)
    }
}
