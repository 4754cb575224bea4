use std::fmt::{self, Display, Formatter};

use itertools::Itertools;
use smallvec::SmallVec;
use smol_str::SmolStr;

use crate::{range::Range, source::FileId};

/// A dotted parameter path such as `user.name`.
pub type Path = SmallVec<[SmolStr; 4]>;

/// `@path`, `@~path`, `@(path)` or `@~(path)`.
#[derive(Debug, Clone, PartialOrd, PartialEq, Ord, Eq)]
pub struct Reference {
    pub path: Path,
    /// Set by the `~` after `@`; the value is HTML-escaped before it is emitted.
    pub escape: bool,
}

impl Display for Reference {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "@{}({})",
            if self.escape { "~" } else { "" },
            self.path.iter().join(".")
        )
    }
}

#[derive(Debug, Clone, PartialOrd, PartialEq, Ord, Eq)]
pub enum LiteralSegment {
    Text(String, Range),
    Reference(Reference, Range),
}

impl Display for LiteralSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            LiteralSegment::Text(text, _) => write!(f, "{}", text),
            LiteralSegment::Reference(reference, _) => write!(f, "{}", reference),
        }
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone)]
pub struct Token {
    pub range: Range,
    pub kind: TokenKind,
    pub file_id: FileId,
}

impl Token {
    #[inline(always)]
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone)]
pub enum TokenKind {
    Colon,
    Comma,
    Comment(String),
    Dot,
    Eof,
    Equal,
    Hash,
    Ident(SmolStr),
    LBrace,
    LBracket,
    LParen,
    Literal(Vec<LiteralSegment>),
    Quote(String),
    RBrace,
    RBracket,
    Reference(Reference),
    RParen,
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.kind)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match &self {
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Comment(comment) => write!(f, "/*{}*/", comment),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Eof => write!(f, ""),
            TokenKind::Equal => write!(f, "="),
            TokenKind::Hash => write!(f, "#"),
            TokenKind::Ident(ident) => write!(f, "{}", ident),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::LParen => write!(f, "("),
            TokenKind::Literal(segments) => write!(f, "~{}~", segments.iter().join("")),
            TokenKind::Quote(s) => write!(f, "\"{}\"", s),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::Reference(reference) => write!(f, "{}", reference),
            TokenKind::RParen => write!(f, ")"),
        }
    }
}
