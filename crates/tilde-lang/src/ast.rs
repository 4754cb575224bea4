pub mod error;
pub mod node;
pub mod parser;

pub use node::{Args, Ident, Location, Node, Opcode};
pub use parser::{CallTargets, Def, Parser};
