use itertools::Itertools;
use thiserror::Error;

use crate::{
    ast::node::{Ident, Location},
    lexer::token::Path,
};

#[derive(Error, Debug, PartialEq)]
pub enum EvalError {
    #[error("Parameter `{segment}` not found while resolving `@{}`", .path.iter().join("."))]
    ParamNotFound {
        location: Location,
        segment: Ident,
        path: Path,
    },
    #[error("Template `{1}` is not defined")]
    NotDefined(Location, Ident),
    #[error("Template `{0}` is not defined")]
    TemplateNotFound(Ident),
    #[error("Value of `@{}` is a {type_name} and cannot be rendered as text", .path.iter().join("."))]
    NotRenderable {
        location: Location,
        path: Path,
        type_name: &'static str,
    },
}

impl EvalError {
    #[cold]
    pub fn location(&self) -> Option<Location> {
        match self {
            EvalError::ParamNotFound { location, .. }
            | EvalError::NotDefined(location, _)
            | EvalError::NotRenderable { location, .. } => Some(*location),
            EvalError::TemplateNotFound(_) => None,
        }
    }
}
