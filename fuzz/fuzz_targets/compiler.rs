#![no_main]

use arbitrary::Arbitrary;
use itertools::Itertools;
use libfuzzer_sys::fuzz_target;
use tilde_lang::{Engine, Ident, Node, Opcode};

#[derive(Debug, Clone, Arbitrary)]
enum Item {
    Literal(String),
    Reference(String, bool),
    Tag(String, Vec<String>, Vec<Item>),
    Call(String, Vec<(String, Item)>),
    Comment(String),
    Raw(String),
}

impl Item {
    fn to_source(&self) -> String {
        match self {
            Item::Literal(text) => format!("~{}~", text),
            Item::Reference(path, escape) => format!("@{}{}", if *escape { "~" } else { "" }, path),
            Item::Tag(name, classes, body) => format!(
                "{}{} {{ {} }}",
                name,
                classes.iter().map(|c| format!(".{}", c)).join(""),
                body.iter().map(Item::to_source).join(" ")
            ),
            Item::Call(name, args) => format!(
                "{}({})",
                name,
                args.iter()
                    .map(|(arg, value)| format!("{}: {}", arg, value.to_source()))
                    .join(", ")
            ),
            Item::Comment(text) => format!("/*{}*/", text),
            Item::Raw(code) => code.clone(),
        }
    }
}

#[derive(Debug, Clone, Arbitrary)]
struct Def {
    name: String,
    body: Vec<Item>,
}

#[derive(Debug, Clone, Arbitrary)]
struct Context {
    raw_source: Option<String>,
    defs: Vec<Def>,
    params: Vec<(String, String)>,
}

fn callees(node: &Node, out: &mut Vec<Ident>) {
    match &node.op {
        Opcode::ExtCall(name, args) | Opcode::IntCall(name, args) => {
            out.push(name.clone());
            args.iter().for_each(|(_, value)| callees(value, out));
        }
        Opcode::ParamBody(body) => callees(body, out),
        Opcode::Body(children) => children.iter().for_each(|child| callees(child, out)),
        Opcode::Literal(_) | Opcode::ParamRef(_) | Opcode::HtmlRef(_) | Opcode::TextRef(_) => {}
    }
}

/// Recursive templates overflow the stack, so they are left out of rendering.
fn is_recursive(engine: &Engine, name: &Ident, stack: &mut Vec<Ident>) -> bool {
    if stack.contains(name) {
        return true;
    }

    let Some(tree) = engine.internal_tree(name) else {
        return false;
    };

    let mut names = Vec::new();
    callees(&tree, &mut names);

    stack.push(name.clone());
    let recursive = names.iter().any(|callee| is_recursive(engine, callee, stack));
    stack.pop();

    recursive
}

fuzz_target!(|context: Context| {
    let source = match &context.raw_source {
        Some(raw) => raw.clone(),
        None => context
            .defs
            .iter()
            .map(|def| format!("def {} {{ {} }}", def.name, def.body.iter().map(Item::to_source).join(" ")))
            .join("\n"),
    };

    let params: tilde_lang::Value = context.params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

    let mut optimized = Engine::default();
    let mut plain = Engine::default();
    plain.set_optimize(false);

    let compiled = optimized.compile(&source, "fuzz.tl").is_ok();
    assert_eq!(compiled, plain.compile(&source, "fuzz.tl").is_ok());

    for name in optimized.template_names() {
        if is_recursive(&plain, &name, &mut Vec::new()) {
            continue;
        }

        let lhs = optimized.render(&name, &params).ok();
        let rhs = plain.render(&name, &params).ok();
        assert_eq!(lhs, rhs);
    }
});
