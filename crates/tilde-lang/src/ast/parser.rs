use std::{iter::Peekable, slice::Iter};

use crate::{
    Shared,
    lexer::token::{LiteralSegment, Reference, Token, TokenKind},
    source::FileId,
};

use super::{
    error::ParseError,
    node::{Args, Children, Ident, Location, Node, Opcode, insert_arg},
};

pub const DEF_KEYWORD: &str = "def";

/// Answers whether a name is already an internal template while a call site is being compiled.
pub trait CallTargets {
    fn is_internal(&self, name: &str) -> bool;
}

/// One compiled top-level `def`, before optimization.
#[derive(Debug, Clone, PartialEq)]
pub struct Def {
    pub name: Ident,
    pub location: Location,
    pub body: Shared<Node>,
}

pub struct Parser<'a> {
    tokens: Peekable<Iter<'a, Token>>,
    file_id: FileId,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], file_id: FileId) -> Self {
        Self {
            tokens: tokens.iter().peekable(),
            file_id,
        }
    }

    /// Parses every remaining `def` against a fixed set of call targets.
    pub fn parse(&mut self, targets: &dyn CallTargets) -> Result<Vec<Def>, ParseError> {
        let mut defs = Vec::new();

        while let Some(def) = self.next_def(targets)? {
            defs.push(def);
        }

        Ok(defs)
    }

    /// Parses the next top-level `def`, or returns `None` once the input is exhausted.
    pub fn next_def(&mut self, targets: &dyn CallTargets) -> Result<Option<Def>, ParseError> {
        while let Some(token) = self.tokens.next() {
            match &token.kind {
                TokenKind::Comment(_) => continue,
                TokenKind::Eof => return Ok(None),
                TokenKind::Ident(name) if name.eq_ignore_ascii_case(DEF_KEYWORD) => {
                    return self.parse_def(token, targets).map(Some);
                }
                _ => return Err(ParseError::ExpectedDef(token.clone())),
            }
        }

        Ok(None)
    }

    fn parse_def(
        &mut self,
        def_token: &'a Token,
        targets: &dyn CallTargets,
    ) -> Result<Def, ParseError> {
        let name_token = self.next_token()?;
        let name = match &name_token.kind {
            TokenKind::Ident(name) => name.clone(),
            _ => return Err(ParseError::ExpectedIdentifier(name_token.clone())),
        };

        let lbrace_token = self.next_token()?;
        if !matches!(lbrace_token.kind, TokenKind::LBrace) {
            return Err(ParseError::UnexpectedToken(lbrace_token.clone()));
        }

        Ok(Def {
            name,
            location: Self::location(def_token),
            body: self.parse_body(lbrace_token, targets)?,
        })
    }

    fn parse_body(
        &mut self,
        lbrace_token: &'a Token,
        targets: &dyn CallTargets,
    ) -> Result<Shared<Node>, ParseError> {
        let mut children = Children::new();

        loop {
            let token = self.next_token()?;

            match &token.kind {
                TokenKind::RBrace => break,
                TokenKind::Eof => return Err(ParseError::ExpectedClosingBrace(token.clone())),
                TokenKind::Comment(_) => continue,
                TokenKind::Literal(segments) => children.push(Self::literal_node(token, segments)),
                TokenKind::Reference(reference) => {
                    children.push(Self::reference_node(Self::location(token), reference))
                }
                TokenKind::Ident(name) => {
                    let node = if self.peek_is(|kind| matches!(kind, TokenKind::LParen)) {
                        self.parse_call(token, name, targets)?
                    } else {
                        self.parse_tag(token, name, targets)?
                    };
                    children.push(node);
                }
                _ => return Err(ParseError::UnexpectedToken(token.clone())),
            }
        }

        Ok(Node::new(Self::location(lbrace_token), Opcode::Body(children)))
    }

    fn parse_tag(
        &mut self,
        tag_token: &'a Token,
        name: &Ident,
        targets: &dyn CallTargets,
    ) -> Result<Shared<Node>, ParseError> {
        let location = Self::location(tag_token);
        let mut id = None;
        let mut classes = Children::new();
        let mut attrs = Vec::new();

        loop {
            match self.tokens.peek().map(|token| &token.kind) {
                Some(TokenKind::Hash) => {
                    self.tokens.next();
                    id = Some(self.parse_selector_value()?);
                }
                Some(TokenKind::Dot) => {
                    self.tokens.next();
                    classes.push(self.parse_selector_value()?);
                }
                Some(TokenKind::LBracket) => {
                    self.tokens.next();
                    attrs.push(self.parse_attr()?);
                }
                _ => break,
            }
        }

        let body = if self.peek_is(|kind| matches!(kind, TokenKind::LBrace)) {
            let lbrace_token = self.next_token()?;
            Some(self.parse_body(lbrace_token, targets)?)
        } else {
            None
        };

        let literal = |text: String| Node::new(location, Opcode::Literal(text));
        let mut children = vec![literal(format!("<{}", name))];

        if let Some(id) = id {
            children.extend([literal(" id=\"".to_string()), id, literal("\"".to_string())]);
        }

        if !classes.is_empty() {
            children.push(literal(" class=\"".to_string()));
            for (i, class) in classes.into_iter().enumerate() {
                if i > 0 {
                    children.push(literal(" ".to_string()));
                }
                children.push(class);
            }
            children.push(literal("\"".to_string()));
        }

        for (attr, value) in attrs {
            children.extend([
                literal(format!(" {}=\"", attr)),
                value,
                literal("\"".to_string()),
            ]);
        }

        children.push(literal(">".to_string()));
        children.extend(body);
        children.push(literal(format!("</{}>", name)));

        Ok(Node::new(location, Opcode::Body(children)))
    }

    /// The operand of `#` or `.`: an identifier or a reference.
    fn parse_selector_value(&mut self) -> Result<Shared<Node>, ParseError> {
        let token = self.next_token()?;

        match &token.kind {
            TokenKind::Ident(name) => Ok(Node::new(
                Self::location(token),
                Opcode::Literal(name.to_string()),
            )),
            TokenKind::Reference(reference) => {
                Ok(Self::reference_node(Self::location(token), reference))
            }
            _ => Err(ParseError::ExpectedIdentifier(token.clone())),
        }
    }

    /// `name="value"` or `name=@ref` up to and including the closing `]`.
    fn parse_attr(&mut self) -> Result<(Ident, Shared<Node>), ParseError> {
        let name_token = self.next_token()?;
        let name = match &name_token.kind {
            TokenKind::Ident(name) => name.clone(),
            _ => return Err(ParseError::ExpectedIdentifier(name_token.clone())),
        };

        let equal_token = self.next_token()?;
        if !matches!(equal_token.kind, TokenKind::Equal) {
            return Err(ParseError::UnexpectedToken(equal_token.clone()));
        }

        let value_token = self.next_token()?;
        let value = match &value_token.kind {
            TokenKind::Quote(text) => {
                Node::new(Self::location(value_token), Opcode::Literal(text.clone()))
            }
            TokenKind::Reference(reference) => {
                Self::reference_node(Self::location(value_token), reference)
            }
            _ => return Err(ParseError::UnexpectedToken(value_token.clone())),
        };

        let rbracket_token = self.next_token()?;
        if !matches!(rbracket_token.kind, TokenKind::RBracket) {
            return Err(ParseError::ExpectedClosingBracket(rbracket_token.clone()));
        }

        Ok((name, value))
    }

    fn parse_call(
        &mut self,
        name_token: &'a Token,
        name: &Ident,
        targets: &dyn CallTargets,
    ) -> Result<Shared<Node>, ParseError> {
        // consume `(`
        self.next_token()?;
        let args = self.parse_args(targets)?;

        Ok(Node::new(
            Self::location(name_token),
            Self::call_op(name, args, targets),
        ))
    }

    /// The only place where a call site is bound to a target kind.
    #[inline(always)]
    fn call_op(name: &Ident, args: Args, targets: &dyn CallTargets) -> Opcode {
        if targets.is_internal(name) {
            Opcode::IntCall(name.clone(), args)
        } else {
            Opcode::ExtCall(name.clone(), args)
        }
    }

    fn parse_args(&mut self, targets: &dyn CallTargets) -> Result<Args, ParseError> {
        let mut args = Args::new();

        self.skip_comments();
        if self.peek_is(|kind| matches!(kind, TokenKind::RParen)) {
            self.tokens.next();
            return Ok(args);
        }

        loop {
            self.skip_comments();

            let name_token = self.next_token()?;
            let name = match &name_token.kind {
                TokenKind::Ident(name) => name.clone(),
                TokenKind::Eof => return Err(ParseError::ExpectedClosingParen(name_token.clone())),
                _ => return Err(ParseError::MissingArgumentName(name_token.clone())),
            };

            let colon_token = self.next_token()?;
            match &colon_token.kind {
                TokenKind::Colon => {}
                TokenKind::Eof => {
                    return Err(ParseError::ExpectedClosingParen(colon_token.clone()));
                }
                _ => return Err(ParseError::UnexpectedToken(colon_token.clone())),
            }

            let value = self.parse_arg_value(targets)?;
            insert_arg(&mut args, name, value);

            self.skip_comments();

            let delimiter_token = self.next_token()?;
            match &delimiter_token.kind {
                TokenKind::Comma => continue,
                TokenKind::RParen => break,
                _ => return Err(ParseError::ExpectedClosingParen(delimiter_token.clone())),
            }
        }

        Ok(args)
    }

    /// A raw reference passes the resolved value through; every other form is deferred as a
    /// `ParamBody` and rendered to a string when the call collects its arguments.
    fn parse_arg_value(&mut self, targets: &dyn CallTargets) -> Result<Shared<Node>, ParseError> {
        let token = self.next_token()?;
        let location = Self::location(token);

        let body = match &token.kind {
            TokenKind::Reference(Reference {
                path,
                escape: false,
            }) => return Ok(Node::new(location, Opcode::ParamRef(path.clone()))),
            TokenKind::Reference(reference) => Self::reference_node(location, reference),
            TokenKind::Quote(text) => Node::new(location, Opcode::Literal(text.clone())),
            TokenKind::Literal(segments) => Self::literal_node(token, segments),
            TokenKind::LBrace => self.parse_body(token, targets)?,
            TokenKind::Comma | TokenKind::RParen => {
                return Err(ParseError::MissingArgumentValue(token.clone()));
            }
            TokenKind::Eof => return Err(ParseError::ExpectedClosingParen(token.clone())),
            _ => return Err(ParseError::UnexpectedToken(token.clone())),
        };

        Ok(Node::new(location, Opcode::ParamBody(body)))
    }

    fn literal_node(token: &Token, segments: &[LiteralSegment]) -> Shared<Node> {
        let mut nodes: Children = segments
            .iter()
            .map(|segment| match segment {
                LiteralSegment::Text(text, range) => Node::new(
                    Location {
                        file_id: token.file_id,
                        range: *range,
                    },
                    Opcode::Literal(text.clone()),
                ),
                LiteralSegment::Reference(reference, range) => Self::reference_node(
                    Location {
                        file_id: token.file_id,
                        range: *range,
                    },
                    reference,
                ),
            })
            .collect();

        match nodes.len() {
            0 => Node::new(Self::location(token), Opcode::Literal(String::new())),
            1 => nodes.swap_remove(0),
            _ => Node::new(Self::location(token), Opcode::Body(nodes)),
        }
    }

    fn reference_node(location: Location, reference: &Reference) -> Shared<Node> {
        let path = reference.path.clone();

        Node::new(
            location,
            if reference.escape {
                Opcode::TextRef(path)
            } else {
                Opcode::HtmlRef(path)
            },
        )
    }

    #[inline(always)]
    fn location(token: &Token) -> Location {
        Location {
            file_id: token.file_id,
            range: token.range,
        }
    }

    fn skip_comments(&mut self) {
        while self.peek_is(|kind| matches!(kind, TokenKind::Comment(_))) {
            self.tokens.next();
        }
    }

    #[inline(always)]
    fn peek_is(&mut self, predicate: impl FnOnce(&TokenKind) -> bool) -> bool {
        self.tokens
            .peek()
            .is_some_and(|token| predicate(&token.kind))
    }

    #[inline(always)]
    fn next_token(&mut self) -> Result<&'a Token, ParseError> {
        self.tokens
            .next()
            .ok_or(ParseError::UnexpectedEOFDetected(self.file_id))
    }
}
