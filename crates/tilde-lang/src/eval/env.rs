use smallvec::SmallVec;

use crate::{ast::node::Ident, value::Value};

use super::resolver::Resolver;

pub type Bindings = SmallVec<[(Ident, Value); 4]>;

#[derive(Debug)]
enum Scope<'a> {
    Params(&'a Value),
    Args(Bindings),
}

/// The parameters visible to one template invocation.
///
/// A call pushes its evaluated arguments as a new layer over the caller's environment,
/// so names the call does not pass still resolve to the caller's parameters.
#[derive(Debug)]
pub struct Env<'a> {
    scope: Scope<'a>,
    parent: Option<&'a Env<'a>>,
}

impl<'a> Env<'a> {
    pub fn new(params: &'a Value) -> Self {
        Self {
            scope: Scope::Params(params),
            parent: None,
        }
    }

    pub fn with_args(parent: &'a Env<'a>, args: Bindings) -> Self {
        Self {
            scope: Scope::Args(args),
            parent: Some(parent),
        }
    }

    /// Looks up the first segment of a path.
    pub fn lookup(&self, name: &str, resolver: &dyn Resolver) -> Option<Value> {
        match &self.scope {
            Scope::Params(params) => resolver.resolve(params, name),
            Scope::Args(args) => args
                .iter()
                .find(|(arg_name, _)| arg_name == name)
                .map(|(_, value)| value.clone())
                .or_else(|| self.parent.and_then(|parent| parent.lookup(name, resolver))),
        }
    }

    /// Resolves a dotted path, returning the index of the first segment that is missing.
    pub fn resolve<S: AsRef<str>>(&self, path: &[S], resolver: &dyn Resolver) -> Result<Value, usize> {
        let (first, rest) = path.split_first().ok_or(0usize)?;
        let mut value = self.lookup(first.as_ref(), resolver).ok_or(0usize)?;

        for (i, segment) in rest.iter().enumerate() {
            value = resolver.resolve(&value, segment.as_ref()).ok_or(i + 1)?;
        }

        Ok(value)
    }
}

/// The argument object a native template receives.
#[derive(Debug, Clone, Copy)]
pub struct CallArgs<'a> {
    env: &'a Env<'a>,
    resolver: &'a dyn Resolver,
}

impl<'a> CallArgs<'a> {
    pub(crate) fn new(env: &'a Env<'a>, resolver: &'a dyn Resolver) -> Self {
        Self { env, resolver }
    }

    /// Looks up an argument, falling back to the caller's parameters.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.env.lookup(name, self.resolver)
    }

    pub fn get_path(&self, path: &[&str]) -> Option<Value> {
        self.env.resolve(path, self.resolver).ok()
    }

    /// The text form of an argument, if it has one.
    pub fn get_text(&self, name: &str) -> Option<String> {
        self.get(name)
            .and_then(|value| value.to_text().map(|text| text.into_owned()))
    }
}
