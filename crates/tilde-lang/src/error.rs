use miette::{Diagnostic, SourceOffset, SourceSpan};
use smol_str::SmolStr;

use crate::{
    ast::error::ParseError,
    eval::error::EvalError,
    lexer::error::LexerError,
    range::{Position, Range},
    source::{FileId, SourceMap},
};

#[allow(clippy::useless_conversion)]
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InnerError {
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl InnerError {
    /// The file the error points into, and the range within it when there is one.
    fn origin(&self) -> Option<(FileId, Option<Range>)> {
        match self {
            InnerError::Lexer(LexerError::UnexpectedEOFDetected(file_id))
            | InnerError::Parse(ParseError::UnexpectedEOFDetected(file_id)) => Some((*file_id, None)),
            InnerError::Lexer(e) => e.token().map(|token| (token.file_id, Some(token.range))),
            InnerError::Parse(e) => e.token().map(|token| (token.file_id, Some(token.range))),
            InnerError::Eval(e) => e
                .location()
                .map(|location| (location.file_id, Some(location.range))),
        }
    }
}

/// Represents a high-level error with diagnostic information for the user.
#[derive(PartialEq, Debug, thiserror::Error)]
#[error("{cause}")]
pub struct Error {
    /// The underlying cause of the error.
    pub cause: InnerError,
    /// The source code related to the error.
    pub source_code: String,
    /// The location in the source code for diagnostics.
    pub location: SourceSpan,
    file_name: Option<SmolStr>,
    position: Option<Position>,
}

impl Error {
    pub fn from_error(cause: InnerError, sources: &SourceMap) -> Self {
        let Some((file_id, range)) = cause.origin() else {
            return Self {
                cause,
                source_code: String::new(),
                location: SourceSpan::new(0usize.into(), 0),
                file_name: None,
                position: None,
            };
        };

        let source_code = sources.code(file_id).to_string();
        let file_name = Some(sources.name(file_id));

        match range {
            Some(range) => {
                let start = offset(&source_code, range.start);
                let end = offset(&source_code, range.end);

                Self {
                    cause,
                    location: SourceSpan::new(start.into(), std::cmp::max(end.saturating_sub(start), 1)),
                    source_code,
                    file_name,
                    position: Some(range.start),
                }
            }
            None => {
                let end = source_code.len();
                let position = source_code
                    .lines()
                    .enumerate()
                    .last()
                    .map(|(line, text)| Position::new(line as u32 + 1, text.chars().count() + 1))
                    .unwrap_or_default();

                Self {
                    cause,
                    location: SourceSpan::new(end.into(), 0),
                    source_code,
                    file_name,
                    position: Some(position),
                }
            }
        }
    }

    /// Malformed template source.
    pub fn is_syntax_error(&self) -> bool {
        matches!(self.cause, InnerError::Lexer(_) | InnerError::Parse(_))
    }

    /// A render failed on a missing parameter or template.
    pub fn is_resolution_error(&self) -> bool {
        matches!(self.cause, InnerError::Eval(_))
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Line and column of the failure, both 1-based.
    pub fn position(&self) -> Option<Position> {
        self.position
    }
}

/// Byte offset of a 1-based line and column.
fn offset(source_code: &str, position: Position) -> usize {
    let line_start = SourceOffset::from_location(source_code, position.line as usize, 1).offset();

    source_code[line_start..]
        .char_indices()
        .nth(position.column.saturating_sub(1))
        .map(|(i, _)| line_start + i)
        .unwrap_or(source_code.len())
}

impl Diagnostic for Error {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let c = match &self.cause {
            InnerError::Lexer(e) => match e {
                LexerError::UnexpectedCharacter(..) => "LexerError::UnexpectedCharacter",
                LexerError::UnterminatedComment(_) => "LexerError::UnterminatedComment",
                LexerError::UnterminatedLiteral(_) => "LexerError::UnterminatedLiteral",
                LexerError::UnterminatedQuote(_) => "LexerError::UnterminatedQuote",
                LexerError::InvalidReference(_) => "LexerError::InvalidReference",
                LexerError::UnexpectedEOFDetected(_) => "LexerError::UnexpectedEOFDetected",
            },
            InnerError::Parse(e) => match e {
                ParseError::UnexpectedToken(_) => "ParseError::UnexpectedToken",
                ParseError::UnexpectedEOFDetected(_) => "ParseError::UnexpectedEOFDetected",
                ParseError::ExpectedDef(_) => "ParseError::ExpectedDef",
                ParseError::ExpectedIdentifier(_) => "ParseError::ExpectedIdentifier",
                ParseError::ExpectedClosingBrace(_) => "ParseError::ExpectedClosingBrace",
                ParseError::ExpectedClosingBracket(_) => "ParseError::ExpectedClosingBracket",
                ParseError::ExpectedClosingParen(_) => "ParseError::ExpectedClosingParen",
                ParseError::MissingArgumentName(_) => "ParseError::MissingArgumentName",
                ParseError::MissingArgumentValue(_) => "ParseError::MissingArgumentValue",
            },
            InnerError::Eval(e) => match e {
                EvalError::ParamNotFound { .. } => "EvalError::ParamNotFound",
                EvalError::NotDefined(..) => "EvalError::NotDefined",
                EvalError::TemplateNotFound(_) => "EvalError::TemplateNotFound",
                EvalError::NotRenderable { .. } => "EvalError::NotRenderable",
            },
        };

        Some(Box::new(c))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let msg = match &self.cause {
            InnerError::Lexer(LexerError::UnterminatedComment(_)) => {
                Some("Comments nest; every `/*` needs its own `*/`.".to_string())
            }
            InnerError::Lexer(LexerError::UnterminatedLiteral(_)) => {
                Some("Close the literal with `~`, or write `\\~` for a literal tilde.".to_string())
            }
            InnerError::Lexer(LexerError::InvalidReference(_)) => {
                Some("Write `@name`, `@a.b` or `@(a.b)`; use `\\@` for a literal at sign.".to_string())
            }
            InnerError::Parse(ParseError::ExpectedDef(_)) => {
                Some("Only `def name { ... }` blocks and comments may appear at the top level.".to_string())
            }
            InnerError::Parse(ParseError::MissingArgumentName(_))
            | InnerError::Parse(ParseError::MissingArgumentValue(_)) => {
                Some("Call arguments are written as `name: value`.".to_string())
            }
            InnerError::Parse(ParseError::UnexpectedToken(_)) => {
                Some("Check for syntax errors or misplaced tokens.".to_string())
            }
            InnerError::Eval(EvalError::ParamNotFound { segment, .. }) => {
                Some(format!("'{segment}' is not passed by the caller or the render parameters."))
            }
            InnerError::Eval(EvalError::NotDefined(_, name))
            | InnerError::Eval(EvalError::TemplateNotFound(name)) => Some(format!(
                "'{name}' is not defined. Did you forget to compile or register it?"
            )),
            InnerError::Eval(EvalError::NotRenderable { .. }) => {
                Some("Reference a field of the value instead of the value itself.".to_string())
            }
            _ => None,
        };

        msg.map(|m| Box::new(m) as Box<dyn std::fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(
            miette::LabeledSpan::new_with_span(Some(format!("{}", self.cause)), self.location),
        )))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.source_code)
    }
}
