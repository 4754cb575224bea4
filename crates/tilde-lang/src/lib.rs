//! `tilde-lang` compiles tilde templates into opcode trees and renders them to HTML.
//!
//! ## Examples
//!
//! ```rust
//! use tilde_lang::{Engine, Value};
//!
//! let mut engine = Engine::default();
//! engine
//!     .compile(
//!         r#"def greeting { p.hello { ~Hello, @~name!~ } }"#,
//!         "greeting.tl",
//!     )
//!     .unwrap();
//!
//! let params = Value::from_iter([("name", "<world>")]);
//! assert_eq!(
//!     engine.render("greeting", &params).unwrap(),
//!     r#"<p class="hello">Hello, &lt;world&gt;!</p>"#
//! );
//!
//! // Host templates are called like any other template.
//! engine.register_external("year", |_: &tilde_lang::CallArgs| "2026".to_string());
//! engine.compile("def footer { ~(c) ~ year() }", "footer.tl").unwrap();
//! assert_eq!(engine.render("footer", &Value::empty_map()).unwrap(), "(c) 2026");
//! ```
mod arena;
mod ast;
mod engine;
mod error;
mod eval;
mod lexer;
mod number;
mod optimizer;
mod range;
mod registry;
mod source;
mod value;

use lexer::Lexer;

pub use ast::error::ParseError;
pub use ast::node::{Args, Children, Ident, Location, Node, Opcode};
pub use ast::parser::{CallTargets, Def, Parser};
pub use engine::{Engine, Options};
pub use error::{Error, InnerError};
pub use eval::env::CallArgs;
pub use eval::error::EvalError;
pub use eval::escape::escape_html;
pub use eval::resolver::{DefaultResolver, Resolver};
pub use lexer::error::LexerError;
pub use lexer::token::{LiteralSegment, Path, Reference, Token, TokenKind};
pub use number::Number;
pub use optimizer::Optimizer;
pub use range::{Position, Range};
pub use registry::{NativeFunction, Registry, Template};
pub use source::{FileId, SourceFile, SourceMap};
pub use value::{HostObject, Map, Value};

/// The parameter object handed to a top-level render.
pub type Params = Value;

#[cfg(not(feature = "sync"))]
pub type Shared<T> = std::rc::Rc<T>;
#[cfg(feature = "sync")]
pub type Shared<T> = std::sync::Arc<T>;

/// `Send + Sync` when the `sync` feature is enabled, empty otherwise.
#[cfg(not(feature = "sync"))]
pub trait MaybeSync {}
#[cfg(not(feature = "sync"))]
impl<T: ?Sized> MaybeSync for T {}

#[cfg(feature = "sync")]
pub trait MaybeSync: Send + Sync {}
#[cfg(feature = "sync")]
impl<T: ?Sized + Send + Sync> MaybeSync for T {}

#[allow(clippy::result_large_err)]
pub fn tokenize(code: &str, file_name: &str) -> Result<Vec<Token>, Error> {
    let mut sources = SourceMap::default();
    let file_id = sources.add(file_name, code);

    Lexer::new()
        .tokenize(code, file_id)
        .map_err(|e| Error::from_error(InnerError::Lexer(e), &sources))
}
