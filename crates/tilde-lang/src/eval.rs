pub mod env;
pub mod error;
pub mod escape;
pub mod resolver;

use env::{Bindings, CallArgs, Env};
use error::EvalError;
use escape::escape_html;
use resolver::Resolver;
use tracing::trace;

use crate::{
    Shared,
    ast::node::{Args, Ident, Node, Opcode},
    lexer::token::Path,
    registry::{Registry, Template},
    value::Value,
};

/// Walks opcode trees against a parameter environment.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'e> {
    registry: &'e Registry,
    resolver: &'e dyn Resolver,
}

impl<'e> Evaluator<'e> {
    pub fn new(registry: &'e Registry, resolver: &'e dyn Resolver) -> Self {
        Self { registry, resolver }
    }

    /// Renders the template registered under `name` into `out`.
    ///
    /// Compiled templates write straight into `out`, so text emitted before a failure
    /// stays there.
    pub fn render(&self, name: &str, params: &Value, out: &mut String) -> Result<(), EvalError> {
        let env = Env::new(params);

        match self.registry.external(name) {
            Some(Template::Compiled(tree)) => self.eval_into(tree, &env, out),
            Some(Template::Native(function)) => {
                out.push_str(&function.call(&CallArgs::new(&env, self.resolver)));
                Ok(())
            }
            None => Err(EvalError::TemplateNotFound(Ident::new(name))),
        }
    }

    /// Evaluates `node` into a private buffer.
    pub fn eval(&self, node: &Node, env: &Env) -> Result<String, EvalError> {
        let mut out = String::new();
        self.eval_into(node, env, &mut out)?;
        Ok(out)
    }

    pub fn eval_into(&self, node: &Node, env: &Env, out: &mut String) -> Result<(), EvalError> {
        match &node.op {
            Opcode::Literal(text) => out.push_str(text),
            Opcode::HtmlRef(path) | Opcode::ParamRef(path) => {
                let value = self.resolve(node, path, env)?;
                out.push_str(&self.text(node, path, &value)?);
            }
            Opcode::TextRef(path) => {
                let value = self.resolve(node, path, env)?;
                out.push_str(&escape_html(&self.text(node, path, &value)?));
            }
            Opcode::ParamBody(body) => out.push_str(&self.eval(body, env)?),
            Opcode::IntCall(name, args) => self.eval_int_call(node, name, args, env, out)?,
            Opcode::ExtCall(name, args) => self.eval_ext_call(node, name, args, env, out)?,
            Opcode::Body(children) => {
                for child in children {
                    self.eval_into(child, env, out)?;
                }
            }
        }

        Ok(())
    }

    fn eval_int_call(
        &self,
        node: &Node,
        name: &Ident,
        args: &Args,
        env: &Env,
        out: &mut String,
    ) -> Result<(), EvalError> {
        trace!(template = %name, "internal call");

        let tree = self
            .registry
            .internal(name)
            .map(Shared::clone)
            .ok_or_else(|| EvalError::NotDefined(node.location, name.clone()))?;
        let bindings = self.eval_args(args, env)?;

        self.eval_into(&tree, &Env::with_args(env, bindings), out)
    }

    fn eval_ext_call(
        &self,
        node: &Node,
        name: &Ident,
        args: &Args,
        env: &Env,
        out: &mut String,
    ) -> Result<(), EvalError> {
        trace!(template = %name, "external call");

        let template = self
            .registry
            .external(name)
            .ok_or_else(|| EvalError::NotDefined(node.location, name.clone()))?;
        let bindings = self.eval_args(args, env)?;
        let env = Env::with_args(env, bindings);

        let rendered = match template {
            Template::Native(function) => function.call(&CallArgs::new(&env, self.resolver)),
            Template::Compiled(tree) => self.eval(tree, &env)?,
        };
        out.push_str(&rendered);

        Ok(())
    }

    /// Evaluates call arguments in the caller's environment.
    fn eval_args(&self, args: &Args, env: &Env) -> Result<Bindings, EvalError> {
        args.iter()
            .map(|(name, arg)| {
                let value = match &arg.op {
                    Opcode::ParamRef(path) => self.resolve(arg, path, env)?,
                    _ => Value::String(self.eval(arg, env)?),
                };
                Ok((name.clone(), value))
            })
            .collect()
    }

    fn resolve(&self, node: &Node, path: &Path, env: &Env) -> Result<Value, EvalError> {
        env.resolve(path, self.resolver)
            .map_err(|index| EvalError::ParamNotFound {
                location: node.location,
                segment: path.get(index).cloned().unwrap_or_default(),
                path: path.clone(),
            })
    }

    fn text<'v>(
        &self,
        node: &Node,
        path: &Path,
        value: &'v Value,
    ) -> Result<std::borrow::Cow<'v, str>, EvalError> {
        value.to_text().ok_or_else(|| EvalError::NotRenderable {
            location: node.location,
            path: path.clone(),
            type_name: value.type_name(),
        })
    }
}
