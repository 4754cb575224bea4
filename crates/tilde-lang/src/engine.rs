use tracing::debug;

use crate::{
    MaybeSync, Params, Shared,
    ast::{
        error::ParseError,
        node::{Ident, Node},
        parser::{CallTargets, Parser},
    },
    error::{Error, InnerError},
    eval::{
        Evaluator,
        env::CallArgs,
        resolver::{DefaultResolver, Resolver},
    },
    lexer::Lexer,
    optimizer::Optimizer,
    registry::Registry,
    source::SourceMap,
};

#[derive(Debug, Clone)]
pub struct Options {
    pub optimize: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { optimize: true }
    }
}

/// Compiles template sources and renders the templates they define.
///
/// Each engine owns its templates; nothing is shared between engines.
#[derive(Debug, Clone)]
pub struct Engine {
    registry: Registry,
    sources: SourceMap,
    resolver: Shared<dyn Resolver>,
    pub(crate) options: Options,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            registry: Registry::default(),
            sources: SourceMap::default(),
            resolver: Shared::new(DefaultResolver),
            options: Options::default(),
        }
    }
}

impl Engine {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn set_optimize(&mut self, optimize: bool) {
        self.options.optimize = optimize;
    }

    /// Replaces the lookup used for every path segment.
    pub fn set_resolver(&mut self, resolver: impl Resolver + 'static) {
        self.resolver = Shared::new(resolver);
    }

    /// Compiles every `def` in `code` and registers it.
    ///
    /// Calls to names that are internal templates at this point compile as internal calls;
    /// any other name is looked up in the external table when rendered. On error, the
    /// templates defined before the failing one stay registered.
    #[allow(clippy::result_large_err)]
    pub fn compile(&mut self, code: &str, file_name: &str) -> Result<(), Error> {
        let file_id = self.sources.add(file_name, code);
        let (tokens, lexer_error) = Lexer::new().tokenize_partial(code, file_id);
        let mut parser = Parser::new(&tokens, file_id);

        loop {
            let def = match parser.next_def(&self.registry) {
                Ok(Some(def)) => def,
                Ok(None) => break,
                // The token stream was cut short by a lexer error.
                Err(ParseError::UnexpectedEOFDetected(_)) if lexer_error.is_some() => break,
                Err(e) => return Err(self.error(InnerError::Parse(e))),
            };

            self.define(def.name, def.body);
        }

        match lexer_error {
            Some(e) => Err(self.error(InnerError::Lexer(e))),
            None => Ok(()),
        }
    }

    /// Registers an already built tree under `name`, optimizing it first when enabled.
    pub fn define(&mut self, name: impl Into<Ident>, tree: Shared<Node>) {
        let name = name.into();
        let tree = if self.options.optimize {
            Optimizer::new().optimize(&tree)
        } else {
            tree
        };

        debug!(template = %name, optimized = self.options.optimize, "defined template");
        self.registry.define(name, tree);
    }

    /// Installs a host template. Later definitions under the same name replace it.
    pub fn register_external<F>(&mut self, name: impl Into<Ident>, function: F)
    where
        F: Fn(&CallArgs) -> String + MaybeSync + 'static,
    {
        let name = name.into();

        debug!(template = %name, "registered external template");
        self.registry.register_external(name, function);
    }

    #[allow(clippy::result_large_err)]
    pub fn render(&self, name: &str, params: &Params) -> Result<String, Error> {
        let mut out = String::new();
        self.render_into(name, params, &mut out)?;
        Ok(out)
    }

    /// Renders into `out`. Text written before a failure is left in `out`.
    #[allow(clippy::result_large_err)]
    pub fn render_into(&self, name: &str, params: &Params, out: &mut String) -> Result<(), Error> {
        debug!(template = name, "render");

        Evaluator::new(&self.registry, &*self.resolver)
            .render(name, params, out)
            .map_err(|e| self.error(InnerError::Eval(e)))
    }

    pub fn is_internal(&self, name: &str) -> bool {
        self.registry.is_internal(name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.registry.is_defined(name)
    }

    pub fn template_names(&self) -> Vec<Ident> {
        self.registry.names()
    }

    /// The stored tree of an internal template.
    pub fn internal_tree(&self, name: &str) -> Option<Shared<Node>> {
        self.registry.internal(name).map(Shared::clone)
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn error(&self, cause: InnerError) -> Error {
        Error::from_error(cause, &self.sources)
    }
}
