use thiserror::Error;

use crate::source::FileId;

use super::token::Token;

#[derive(Error, Debug, PartialEq)]
pub enum LexerError {
    #[error("Unexpected character `{1}`")]
    UnexpectedCharacter(Token, char),
    #[error("Unterminated comment, expected a closing `*/`")]
    UnterminatedComment(Token),
    #[error("Unterminated literal, expected a closing `~`")]
    UnterminatedLiteral(Token),
    #[error("Unterminated quote, expected a closing `\"`")]
    UnterminatedQuote(Token),
    #[error("Expected a parameter path after `@`")]
    InvalidReference(Token),
    #[error("Unexpected EOF detected")]
    UnexpectedEOFDetected(FileId),
}

impl LexerError {
    #[cold]
    pub fn token(&self) -> Option<&Token> {
        match self {
            LexerError::UnexpectedCharacter(token, _) => Some(token),
            LexerError::UnterminatedComment(token) => Some(token),
            LexerError::UnterminatedLiteral(token) => Some(token),
            LexerError::UnterminatedQuote(token) => Some(token),
            LexerError::InvalidReference(token) => Some(token),
            LexerError::UnexpectedEOFDetected(_) => None,
        }
    }
}
