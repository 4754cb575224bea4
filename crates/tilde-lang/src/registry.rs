use std::fmt::{self, Debug, Formatter};

use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::{
    MaybeSync, Shared,
    ast::{
        node::{Ident, Node},
        parser::CallTargets,
    },
    eval::env::CallArgs,
};

/// A template implemented by the host.
pub trait NativeFunction: MaybeSync {
    fn call(&self, args: &CallArgs) -> String;
}

impl<F> NativeFunction for F
where
    F: Fn(&CallArgs) -> String + MaybeSync,
{
    fn call(&self, args: &CallArgs) -> String {
        self(args)
    }
}

/// An entry of the external table.
#[derive(Clone)]
pub enum Template {
    Native(Shared<dyn NativeFunction>),
    /// An internal template exposed under the uniform calling convention.
    Compiled(Shared<Node>),
}

impl Debug for Template {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Template::Native(_) => write!(f, "Native"),
            Template::Compiled(tree) => f.debug_tuple("Compiled").field(tree).finish(),
        }
    }
}

/// Internal and external template tables of one engine.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    internal: FxHashMap<Ident, Shared<Node>>,
    external: FxHashMap<Ident, Template>,
}

impl Registry {
    /// Stores an optimized tree and exposes it through the external table,
    /// replacing any host template registered under the same name.
    pub fn define(&mut self, name: Ident, tree: Shared<Node>) {
        self.internal.insert(name.clone(), Shared::clone(&tree));
        self.external.insert(name, Template::Compiled(tree));
    }

    pub fn register_external<F>(&mut self, name: Ident, function: F)
    where
        F: Fn(&CallArgs) -> String + MaybeSync + 'static,
    {
        self.external.insert(name, Template::Native(Shared::new(function)));
    }

    pub fn internal(&self, name: &str) -> Option<&Shared<Node>> {
        self.internal.get(name)
    }

    pub fn external(&self, name: &str) -> Option<&Template> {
        self.external.get(name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.external.contains_key(name)
    }

    /// Every name callable from the host, sorted.
    pub fn names(&self) -> Vec<Ident> {
        self.external.keys().cloned().sorted().collect()
    }
}

impl CallTargets for Registry {
    fn is_internal(&self, name: &str) -> bool {
        self.internal.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::node::{Location, Opcode};

    fn tree(text: &str) -> Shared<Node> {
        Node::new(Location::default(), Opcode::Literal(text.to_string()))
    }

    #[test]
    fn test_define_exposes_externally() {
        let mut registry = Registry::default();
        registry.define("a".into(), tree("x"));

        assert!(registry.is_internal("a"));
        assert!(registry.is_defined("a"));
        assert!(matches!(registry.external("a"), Some(Template::Compiled(t)) if t.op == Opcode::Literal("x".to_string())));
    }

    #[test]
    fn test_last_writer_wins() {
        let mut registry = Registry::default();
        registry.define("a".into(), tree("x"));
        registry.define("a".into(), tree("y"));
        assert_eq!(registry.internal("a").map(|t| t.op.clone()), Some(Opcode::Literal("y".to_string())));

        registry.register_external("a".into(), |_: &CallArgs| "native".to_string());
        assert!(registry.is_internal("a"));
        assert!(matches!(registry.external("a"), Some(Template::Native(_))));
    }

    #[test]
    fn test_define_replaces_native() {
        let mut registry = Registry::default();
        registry.register_external("a".into(), |_: &CallArgs| "native".to_string());
        registry.define("a".into(), tree("x"));

        assert!(matches!(registry.external("a"), Some(Template::Compiled(_))));
    }

    #[test]
    fn test_names() {
        let mut registry = Registry::default();
        registry.register_external("b".into(), |_: &CallArgs| String::new());
        registry.define("a".into(), tree("x"));

        assert_eq!(registry.names(), vec![Ident::from("a"), Ident::from("b")]);
        assert!(!registry.is_internal("b"));
        assert!(!registry.is_defined("c"));
    }
}
