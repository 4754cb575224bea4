use crate::{
    Shared,
    ast::node::{Args, Children, Node, Opcode},
};

/// Flattens nested bodies and merges adjacent literals.
///
/// The rewrite allocates a new tree; the input is left untouched. Rendered output is the
/// same for every parameter object.
#[derive(Debug, Default, Clone, Copy)]
pub struct Optimizer;

impl Optimizer {
    pub fn new() -> Self {
        Self
    }

    pub fn optimize(&self, node: &Shared<Node>) -> Shared<Node> {
        match &node.op {
            Opcode::Body(children) => {
                let mut flattened = Children::with_capacity(children.len());

                for child in children {
                    let child = self.optimize(child);
                    match &child.op {
                        Opcode::Body(grandchildren) => flattened.extend(grandchildren.iter().cloned()),
                        _ => flattened.push(child),
                    }
                }

                Node::new(node.location, Opcode::Body(Self::merge_literals(flattened)))
            }
            Opcode::ParamBody(body) => {
                Node::new(node.location, Opcode::ParamBody(self.optimize(body)))
            }
            Opcode::IntCall(name, args) => Node::new(
                node.location,
                Opcode::IntCall(name.clone(), self.optimize_args(args)),
            ),
            Opcode::ExtCall(name, args) => Node::new(
                node.location,
                Opcode::ExtCall(name.clone(), self.optimize_args(args)),
            ),
            Opcode::Literal(_) | Opcode::ParamRef(_) | Opcode::HtmlRef(_) | Opcode::TextRef(_) => {
                Shared::clone(node)
            }
        }
    }

    fn optimize_args(&self, args: &Args) -> Args {
        args.iter()
            .map(|(name, value)| (name.clone(), self.optimize(value)))
            .collect()
    }

    /// Concatenates each run of literals into its first node.
    fn merge_literals(children: Children) -> Children {
        let mut merged = Children::with_capacity(children.len());

        for child in children {
            if let (Some(last), Opcode::Literal(text)) = (merged.last(), &child.op) {
                if let Opcode::Literal(prev) = &last.op {
                    let joined = Node::new(last.location, Opcode::Literal(format!("{prev}{text}")));
                    if let Some(slot) = merged.last_mut() {
                        *slot = joined;
                    }
                    continue;
                }
            }

            merged.push(child);
        }

        merged
    }
}
