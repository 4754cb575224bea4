use thiserror::Error;

use crate::{lexer::token::Token, source::FileId};

fn describe(token: &Token) -> String {
    if token.is_eof() {
        "EOF".to_string()
    } else {
        token.to_string()
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token `{}`", describe(.0))]
    UnexpectedToken(Token),
    #[error("Unexpected EOF detected")]
    UnexpectedEOFDetected(FileId),
    #[error("Expected `def` but got `{}`", describe(.0))]
    ExpectedDef(Token),
    #[error("Expected an identifier but got `{}`", describe(.0))]
    ExpectedIdentifier(Token),
    #[error("Expected a closing brace `}}` but got `{}` delimiter", describe(.0))]
    ExpectedClosingBrace(Token),
    #[error("Expected a closing bracket `]` but got `{}` delimiter", describe(.0))]
    ExpectedClosingBracket(Token),
    #[error("Expected a closing parenthesis `)` but got `{}` delimiter", describe(.0))]
    ExpectedClosingParen(Token),
    #[error("Missing argument name before `{}`", describe(.0))]
    MissingArgumentName(Token),
    #[error("Missing argument value before `{}`", describe(.0))]
    MissingArgumentValue(Token),
}

impl ParseError {
    #[cold]
    pub fn token(&self) -> Option<&Token> {
        match self {
            ParseError::UnexpectedToken(token)
            | ParseError::ExpectedDef(token)
            | ParseError::ExpectedIdentifier(token)
            | ParseError::ExpectedClosingBrace(token)
            | ParseError::ExpectedClosingBracket(token)
            | ParseError::ExpectedClosingParen(token)
            | ParseError::MissingArgumentName(token)
            | ParseError::MissingArgumentValue(token) => Some(token),
            ParseError::UnexpectedEOFDetected(_) => None,
        }
    }
}
