use std::fmt::{self, Display, Formatter};

use itertools::Itertools;
use smallvec::SmallVec;
use smol_str::SmolStr;

use crate::{Shared, lexer::token::Path, range::Range, source::FileId};

pub type Ident = SmolStr;
pub type Args = SmallVec<[(Ident, Shared<Node>); 4]>;
pub type Children = Vec<Shared<Node>>;

/// Where a node came from, for diagnostics.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Default)]
pub struct Location {
    pub file_id: FileId,
    pub range: Range,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Node {
    pub location: Location,
    pub op: Opcode,
}

impl Node {
    pub fn new(location: Location, op: Opcode) -> Shared<Self> {
        Shared::new(Self { location, op })
    }

    pub fn range(&self) -> Range {
        self.location.range
    }

    pub fn is_body(&self) -> bool {
        matches!(self.op, Opcode::Body(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.op, Opcode::Literal(_))
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum Opcode {
    /// Fixed text, emitted verbatim.
    Literal(String),
    /// Renders its body into a fresh buffer; the resulting string is a call argument.
    ParamBody(Shared<Node>),
    /// Passes the resolved value itself as a call argument.
    ParamRef(Path),
    /// Emits the resolved value unescaped.
    HtmlRef(Path),
    /// Emits the resolved value HTML-escaped.
    TextRef(Path),
    /// Calls through the external table.
    ExtCall(Ident, Args),
    /// Walks another internal template's tree directly.
    IntCall(Ident, Args),
    Body(Children),
}

impl Opcode {
    pub fn args(&self) -> Option<&Args> {
        match self {
            Opcode::ExtCall(_, args) | Opcode::IntCall(_, args) => Some(args),
            _ => None,
        }
    }
}

/// Inserts `value` under `name`, replacing an earlier argument of the same name in place.
pub fn insert_arg(args: &mut Args, name: Ident, value: Shared<Node>) {
    match args.iter_mut().find(|(arg_name, _)| *arg_name == name) {
        Some((_, existing)) => *existing = value,
        None => args.push((name, value)),
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.op)
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Opcode::Literal(text) => write!(f, "Literal({:?})", text),
            Opcode::ParamBody(body) => write!(f, "ParamBody({})", body),
            Opcode::ParamRef(path) => write!(f, "ParamRef({})", path.iter().join(".")),
            Opcode::HtmlRef(path) => write!(f, "HtmlRef({})", path.iter().join(".")),
            Opcode::TextRef(path) => write!(f, "TextRef({})", path.iter().join(".")),
            Opcode::ExtCall(name, args) | Opcode::IntCall(name, args) => write!(
                f,
                "{}({}: {})",
                if matches!(self, Opcode::ExtCall(..)) {
                    "ExtCall"
                } else {
                    "IntCall"
                },
                name,
                args.iter()
                    .map(|(name, value)| format!("{}={}", name, value))
                    .join(", ")
            ),
            Opcode::Body(children) => write!(f, "Body[{}]", children.iter().join(", ")),
        }
    }
}
