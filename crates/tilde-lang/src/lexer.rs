pub mod error;
pub mod token;

use error::LexerError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{is_not, tag, take},
    character::complete::{alpha1, alphanumeric1, anychar, char, digit1, multispace0},
    combinator::{map, opt, recognize},
    error::{ErrorKind, ParseError},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated},
};
use smol_str::SmolStr;
use token::{LiteralSegment, Path, Reference, Token, TokenKind};

use crate::range::{Position, Range, Span};
use crate::source::FileId;

type LexResult<'a, O> = IResult<Span<'a>, O, LexError<'a>>;

#[derive(Debug, Clone, Copy, PartialEq)]
enum LexErrorKind {
    Unexpected,
    UnterminatedComment,
    UnterminatedLiteral,
    UnterminatedQuote,
    InvalidReference,
}

/// nom error carrying the position at which a construct started, so that an
/// unterminated literal is reported where it was opened rather than at EOF.
#[derive(Debug)]
struct LexError<'a> {
    input: Span<'a>,
    kind: LexErrorKind,
}

impl<'a> LexError<'a> {
    fn failure(input: Span<'a>, kind: LexErrorKind) -> nom::Err<Self> {
        nom::Err::Failure(Self { input, kind })
    }

    fn into_lexer_error(self) -> LexerError {
        let file_id = self.input.extra;
        let start = Position::from(self.input);
        let next = self.input.fragment().chars().next();
        let token = Token {
            range: Range::new(start, Position::new(start.line, start.column + 1)),
            kind: TokenKind::Eof,
            file_id,
        };

        match (self.kind, next) {
            (LexErrorKind::Unexpected, Some(c)) => LexerError::UnexpectedCharacter(token, c),
            (LexErrorKind::Unexpected, None) => LexerError::UnexpectedEOFDetected(file_id),
            (LexErrorKind::UnterminatedComment, _) => LexerError::UnterminatedComment(token),
            (LexErrorKind::UnterminatedLiteral, _) => LexerError::UnterminatedLiteral(token),
            (LexErrorKind::UnterminatedQuote, _) => LexerError::UnterminatedQuote(token),
            (LexErrorKind::InvalidReference, _) => LexerError::InvalidReference(token),
        }
    }
}

impl<'a> ParseError<Span<'a>> for LexError<'a> {
    fn from_error_kind(input: Span<'a>, _kind: ErrorKind) -> Self {
        Self {
            input,
            kind: LexErrorKind::Unexpected,
        }
    }

    fn append(_input: Span<'a>, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

macro_rules! define_token_parser {
    ($name:ident, $tag:expr, $kind:expr) => {
        fn $name(input: Span) -> LexResult<Token> {
            map(tag($tag), |span: Span| {
                let file_id = span.extra;
                Token {
                    range: span.into(),
                    kind: $kind,
                    file_id,
                }
            })
            .parse(input)
        }
    };
}

#[derive(Debug, Clone, Default)]
pub struct Lexer;

impl Lexer {
    pub fn new() -> Self {
        Self
    }

    pub fn tokenize(&self, input: &str, file_id: FileId) -> Result<Vec<Token>, LexerError> {
        match self.tokenize_partial(input, file_id) {
            (tokens, None) => Ok(tokens),
            (_, Some(e)) => Err(e),
        }
    }

    /// Tokenizes as far as possible. On failure the tokens read before the error are
    /// returned without a trailing `Eof`, together with the error.
    pub fn tokenize_partial(
        &self,
        input: &str,
        file_id: FileId,
    ) -> (Vec<Token>, Option<LexerError>) {
        let mut tokens = Vec::new();
        let mut rest = match multispace0::<_, LexError>(Span::new_extra(input, file_id)) {
            Ok((rest, _)) => rest,
            Err(_) => Span::new_extra(input, file_id),
        };

        loop {
            if rest.fragment().is_empty() {
                tokens.push(Token {
                    range: rest.into(),
                    kind: TokenKind::Eof,
                    file_id,
                });
                return (tokens, None);
            }

            match terminated(token, multispace0).parse(rest) {
                Ok((next, token)) => {
                    tokens.push(token);
                    rest = next;
                }
                Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                    return (tokens, Some(e.into_lexer_error()));
                }
                Err(nom::Err::Incomplete(_)) => {
                    return (tokens, Some(LexerError::UnexpectedEOFDetected(file_id)));
                }
            }
        }
    }
}

define_token_parser!(l_brace, "{", TokenKind::LBrace);
define_token_parser!(r_brace, "}", TokenKind::RBrace);
define_token_parser!(l_paren, "(", TokenKind::LParen);
define_token_parser!(r_paren, ")", TokenKind::RParen);
define_token_parser!(l_bracket, "[", TokenKind::LBracket);
define_token_parser!(r_bracket, "]", TokenKind::RBracket);
define_token_parser!(hash, "#", TokenKind::Hash);
define_token_parser!(dot, ".", TokenKind::Dot);
define_token_parser!(equal, "=", TokenKind::Equal);
define_token_parser!(colon, ":", TokenKind::Colon);
define_token_parser!(comma, ",", TokenKind::Comma);

fn punctuations(input: Span) -> LexResult<Token> {
    alt((
        l_brace, r_brace, l_paren, r_paren, l_bracket, r_bracket, hash, dot, equal, colon, comma,
    ))
    .parse(input)
}

fn identifier(input: Span) -> LexResult<Span> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_"), tag("-")))),
    ))
    .parse(input)
}

fn ident(input: Span) -> LexResult<Token> {
    map(identifier, |span: Span| {
        let file_id = span.extra;
        let kind = TokenKind::Ident(SmolStr::new(span.fragment()));
        Token {
            range: span.into(),
            kind,
            file_id,
        }
    })
    .parse(input)
}

/// Dotted segments; a numeric segment indexes into a sequence.
fn path(input: Span) -> LexResult<Path> {
    map(separated_list1(char('.'), alt((identifier, digit1))), |segments: Vec<Span>| {
        segments
            .iter()
            .map(|segment| SmolStr::new(segment.fragment()))
            .collect::<Path>()
    })
    .parse(input)
}

fn reference_body(input: Span) -> LexResult<Reference> {
    let (rest, _) = char('@').parse(input)?;
    let (rest, escape) = opt(char('~')).parse(rest)?;
    let (rest, path) = alt((delimited(char('('), path, char(')')), path))
        .parse(rest)
        .map_err(|e| match e {
            nom::Err::Error(_) => LexError::failure(input, LexErrorKind::InvalidReference),
            e => e,
        })?;

    Ok((
        rest,
        Reference {
            path,
            escape: escape.is_some(),
        },
    ))
}

fn reference(input: Span) -> LexResult<Token> {
    let (rest, reference) = reference_body(input)?;

    Ok((
        rest,
        Token {
            range: Range::new(input.into(), rest.into()),
            kind: TokenKind::Reference(reference),
            file_id: input.extra,
        },
    ))
}

fn escaped_char(input: Span) -> LexResult<char> {
    preceded(char('\\'), anychar).parse(input)
}

fn literal(input: Span) -> LexResult<Token> {
    let (mut rest, _) = char('~').parse(input)?;
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut text_start = Position::from(rest);

    loop {
        let fragment = *rest.fragment();

        if fragment.is_empty() {
            return Err(LexError::failure(input, LexErrorKind::UnterminatedLiteral));
        }

        if fragment.starts_with('~') || fragment.starts_with('@') {
            if !text.is_empty() {
                segments.push(LiteralSegment::Text(
                    std::mem::take(&mut text),
                    Range::new(text_start, rest.into()),
                ));
            }

            if fragment.starts_with('~') {
                let (after, _) = take(1usize).parse(rest)?;
                rest = after;
                break;
            }

            let (after, reference) = reference_body(rest)?;
            segments.push(LiteralSegment::Reference(
                reference,
                Range::new(rest.into(), after.into()),
            ));
            rest = after;
            text_start = Position::from(rest);
        } else if fragment.starts_with('\\') {
            let (after, c) = escaped_char(rest)
                .map_err(|_| LexError::failure(input, LexErrorKind::UnterminatedLiteral))?;
            text.push(c);
            rest = after;
        } else {
            let (after, run) = is_not("~@\\").parse(rest)?;
            text.push_str(run.fragment());
            rest = after;
        }
    }

    Ok((
        rest,
        Token {
            range: Range::new(input.into(), rest.into()),
            kind: TokenKind::Literal(segments),
            file_id: input.extra,
        },
    ))
}

fn quote(input: Span) -> LexResult<Token> {
    let (mut rest, _) = char('"').parse(input)?;
    let mut text = String::new();

    loop {
        let fragment = *rest.fragment();

        if fragment.is_empty() {
            return Err(LexError::failure(input, LexErrorKind::UnterminatedQuote));
        }

        if fragment.starts_with('"') {
            let (after, _) = take(1usize).parse(rest)?;
            rest = after;
            break;
        } else if fragment.starts_with('\\') {
            let (after, c) = escaped_char(rest)
                .map_err(|_| LexError::failure(input, LexErrorKind::UnterminatedQuote))?;
            text.push(c);
            rest = after;
        } else {
            let (after, run) = is_not("\"\\").parse(rest)?;
            text.push_str(run.fragment());
            rest = after;
        }
    }

    Ok((
        rest,
        Token {
            range: Range::new(input.into(), rest.into()),
            kind: TokenKind::Quote(text),
            file_id: input.extra,
        },
    ))
}

/// `/* ... */`, nesting to any depth.
fn comment(input: Span) -> LexResult<Token> {
    let (mut rest, _) = tag("/*").parse(input)?;
    let body_start = rest;
    let mut depth = 1usize;

    loop {
        let fragment = *rest.fragment();

        if fragment.is_empty() {
            return Err(LexError::failure(input, LexErrorKind::UnterminatedComment));
        }

        if fragment.starts_with("*/") {
            depth -= 1;

            if depth == 0 {
                let len = rest.location_offset() - body_start.location_offset();
                let text = body_start.fragment()[..len].to_string();
                let (after, _) = take(2usize).parse(rest)?;

                return Ok((
                    after,
                    Token {
                        range: Range::new(input.into(), after.into()),
                        kind: TokenKind::Comment(text),
                        file_id: input.extra,
                    },
                ));
            }

            (rest, _) = take(2usize).parse(rest)?;
        } else if fragment.starts_with("/*") {
            depth += 1;
            (rest, _) = take(2usize).parse(rest)?;
        } else {
            (rest, _) = anychar::<_, LexError>(rest)?;
        }
    }
}

fn token(input: Span) -> LexResult<Token> {
    alt((comment, literal, quote, reference, punctuations, ident)).parse(input)
}
