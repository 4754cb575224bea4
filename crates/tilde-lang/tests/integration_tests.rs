use std::cell::Cell;

use rstest::{fixture, rstest};
use serde_json::json;
use tilde_lang::{
    CallArgs, Engine, EvalError, HostObject, Ident, InnerError, LexerError, Opcode, ParseError, Resolver,
    Value,
};

#[fixture]
fn engine() -> Engine {
    Engine::default()
}

fn params(json: serde_json::Value) -> Value {
    json.into()
}

#[rstest]
#[case::empty_def("def d {}", json!({}), "")]
#[case::literal_whitespace("def d { ~  a  b ~ }", json!({}), "  a  b ")]
#[case::literal_escape(r"def d { ~a\~b \@c~ }", json!({}), "a~b @c")]
#[case::tag_composition(r#"def d { div#i.c1.c2[data-k="v"] }"#, json!({}), r#"<div id="i" class="c1 c2" data-k="v"></div>"#)]
#[case::nested_body("def d { div { span { ~hi~ } } }", json!({}), "<div><span>hi</span></div>")]
#[case::keyword_case("DEF d { ~x~ }", json!({}), "x")]
#[case::comment_nesting("def d { ~a~ /* /* nested */ still a comment */ }", json!({}), "a")]
#[case::comments_between_defs("/* a */ def d { ~x~ } /* b */", json!({}), "x")]
#[case::html_ref("def d { ~@x~ }", json!({"x": "<b>"}), "<b>")]
#[case::text_ref("def d { @~x }", json!({"x": "<a>&\"b\""}), "&lt;a&gt;&amp;&quot;b&quot;")]
#[case::dotted_path("def d { ~@user.name~ }", json!({"user": {"name": "Ann"}}), "Ann")]
#[case::parenthesized_path("def d { a.@(user.role).x }", json!({"user": {"role": "admin"}}), r#"<a class="admin x"></a>"#)]
#[case::reference_id("def d { li#@id }", json!({"id": 7}), r#"<li id="7"></li>"#)]
#[case::reference_attr("def d { a[href=@url] { ~go~ } }", json!({"url": "/x?a&b"}), r#"<a href="/x?a&b">go</a>"#)]
#[case::array_index("def d { ~@items.1~ }", json!({"items": ["a", "b"]}), "b")]
#[case::number("def d { ~@n @f~ }", json!({"n": 3, "f": 1.5}), "3 1.5")]
#[case::extreme_numbers("def d { ~@big @neg @small~ }", json!({"big": 1e20, "neg": -1e20, "small": 0.0000001}), "100000000000000000000 -100000000000000000000 0.0000001")]
#[case::bool_and_null("def d { ~@t@nothing~ }", json!({"t": true, "nothing": null}), "true")]
fn test_render(
    mut engine: Engine,
    #[case] code: &str,
    #[case] input: serde_json::Value,
    #[case] expected: &str,
) {
    engine.compile(code, "test.tl").unwrap();
    assert_eq!(engine.render("d", &params(input)).unwrap(), expected);
}

#[rstest]
#[case::passes_argument("caller", json!({}), "x")]
#[case::passes_through_params("caller2", json!({"v": "y"}), "y")]
#[case::argument_shadows_params("caller", json!({"v": "y"}), "x")]
fn test_dynamic_scope(
    mut engine: Engine,
    #[case] template: &str,
    #[case] input: serde_json::Value,
    #[case] expected: &str,
) {
    engine
        .compile(
            r#"def callee { ~@v~ } def caller { callee(v: "x") } def caller2 { callee() }"#,
            "scope.tl",
        )
        .unwrap();
    assert_eq!(engine.render(template, &params(input)).unwrap(), expected);
}

#[rstest]
fn test_arguments_evaluate_in_caller_scope(mut engine: Engine) {
    engine
        .compile(
            r#"
            def item { li { @~label } }
            def list { ul { item(label: ~@prefix: @name~) item(label: { b { @~name } }) } }
            "#,
            "list.tl",
        )
        .unwrap();

    let output = engine
        .render("list", &params(json!({"prefix": "#", "name": "<x>"})))
        .unwrap();
    assert_eq!(
        output,
        "<ul><li>#: &lt;x&gt;</li><li>&lt;b&gt;&amp;lt;x&amp;gt;&lt;/b&gt;</li></ul>"
    );
}

#[rstest]
fn test_bare_reference_argument_passes_value(mut engine: Engine) {
    engine
        .compile(
            "def name { ~@user.first @user.last~ } def card { name(user: @account.owner) }",
            "card.tl",
        )
        .unwrap();

    let input = params(json!({"account": {"owner": {"first": "Ann", "last": "Lee"}}}));
    assert_eq!(engine.render("card", &input).unwrap(), "Ann Lee");
}

#[rstest]
fn test_escaped_reference_argument_passes_rendering(mut engine: Engine) {
    engine
        .compile("def show { ~@v~ } def page { show(v: @~raw) }", "page.tl")
        .unwrap();

    let input = params(json!({"raw": "<i>"}));
    assert_eq!(engine.render("page", &input).unwrap(), "&lt;i&gt;");
}

#[rstest]
fn test_missing_parameter(mut engine: Engine) {
    engine.compile("def d {\n  ~a~ @missing\n}", "missing.tl").unwrap();

    let error = engine.render("d", &Value::empty_map()).unwrap_err();
    assert!(error.is_resolution_error());
    assert!(matches!(
        &error.cause,
        InnerError::Eval(EvalError::ParamNotFound { segment, .. }) if segment == "missing"
    ));
    assert_eq!(error.position().map(|p| (p.line, p.column)), Some((2, 7)));
}

#[rstest]
fn test_missing_intermediate_segment(mut engine: Engine) {
    engine.compile("def d { ~@a.b.c~ }", "missing.tl").unwrap();

    let error = engine.render("d", &params(json!({"a": {"x": 1}}))).unwrap_err();
    assert!(matches!(
        &error.cause,
        InnerError::Eval(EvalError::ParamNotFound { segment, .. }) if segment == "b"
    ));
    assert_eq!(
        error.to_string(),
        "Parameter `b` not found while resolving `@a.b.c`"
    );
}

#[rstest]
fn test_map_is_not_renderable(mut engine: Engine) {
    engine.compile("def d { ~@a~ }", "map.tl").unwrap();

    let error = engine.render("d", &params(json!({"a": {"x": 1}}))).unwrap_err();
    assert!(matches!(
        error.cause,
        InnerError::Eval(EvalError::NotRenderable { .. })
    ));
}

#[rstest]
fn test_unknown_template(mut engine: Engine) {
    engine.compile("def d { nope() }", "d.tl").unwrap();

    let error = engine.render("d", &Value::empty_map()).unwrap_err();
    assert!(matches!(
        &error.cause,
        InnerError::Eval(EvalError::NotDefined(_, name)) if name == "nope"
    ));
    assert_eq!(error.file_name(), Some("d.tl"));

    let error = engine.render("absent", &Value::empty_map()).unwrap_err();
    assert!(matches!(
        error.cause,
        InnerError::Eval(EvalError::TemplateNotFound(_))
    ));
}

#[rstest]
fn test_forward_reference_binds_external(mut engine: Engine) {
    engine
        .compile("def caller { later() } def later { ~internal~ }", "fwd.tl")
        .unwrap();

    let tree = engine.internal_tree("caller").unwrap();
    let Opcode::Body(children) = &tree.op else {
        panic!("expected body");
    };
    assert!(matches!(&children[0].op, Opcode::ExtCall(name, _) if name == "later"));
    assert_eq!(engine.render("caller", &Value::empty_map()).unwrap(), "internal");

    engine.register_external("later", |_: &CallArgs| "native".to_string());
    assert_eq!(engine.render("caller", &Value::empty_map()).unwrap(), "native");

    // The call site stays external and follows whichever entry was written last.
    engine.compile("def later { ~again~ }", "again.tl").unwrap();
    assert_eq!(engine.render("caller", &Value::empty_map()).unwrap(), "again");
    engine.register_external("later", |_: &CallArgs| "native".to_string());
    assert_eq!(engine.render("caller", &Value::empty_map()).unwrap(), "native");
}

#[rstest]
fn test_def_after_register_external_replaces_it(mut engine: Engine) {
    engine.register_external("later", |_: &CallArgs| "native".to_string());
    engine
        .compile("def caller { later() } def later { ~internal~ }", "fwd.tl")
        .unwrap();

    let tree = engine.internal_tree("caller").unwrap();
    let Opcode::Body(children) = &tree.op else {
        panic!("expected body");
    };
    assert!(matches!(&children[0].op, Opcode::ExtCall(name, _) if name == "later"));
    assert_eq!(engine.render("caller", &Value::empty_map()).unwrap(), "internal");
    assert_eq!(engine.render("later", &Value::empty_map()).unwrap(), "internal");
}

#[rstest]
fn test_register_external_between_compiles_wins(mut engine: Engine) {
    engine.compile("def caller { later() }", "caller.tl").unwrap();
    engine.register_external("later", |_: &CallArgs| "native".to_string());

    assert_eq!(engine.render("caller", &Value::empty_map()).unwrap(), "native");
}

#[rstest]
fn test_earlier_def_binds_internal(mut engine: Engine) {
    engine
        .compile("def later { ~internal~ } def caller { later() }", "bwd.tl")
        .unwrap();
    engine.register_external("later", |_: &CallArgs| "native".to_string());

    assert!(engine.is_internal("later"));
    assert_eq!(engine.render("caller", &Value::empty_map()).unwrap(), "internal");
    assert_eq!(engine.render("later", &Value::empty_map()).unwrap(), "native");
}

#[rstest]
fn test_internal_binding_spans_compile_calls(mut engine: Engine) {
    engine.compile("def base { ~base~ }", "a.tl").unwrap();
    engine.compile("def page { base() }", "b.tl").unwrap();

    let tree = engine.internal_tree("page").unwrap();
    let Opcode::Body(children) = &tree.op else {
        panic!("expected body");
    };
    assert!(matches!(&children[0].op, Opcode::IntCall(name, _) if name == "base"));
}

#[rstest]
fn test_native_template_reads_arguments(mut engine: Engine) {
    engine.register_external("greet", |args: &CallArgs| {
        let name = args.get_text("name").unwrap_or_default();
        let site = args
            .get_path(&["site", "title"])
            .and_then(|v| v.to_text().map(|t| t.into_owned()))
            .unwrap_or_default();
        format!("{name}@{site}")
    });
    engine.compile(r#"def d { greet(name: "ann") }"#, "d.tl").unwrap();

    let input = params(json!({"site": {"title": "home"}}));
    assert_eq!(engine.render("d", &input).unwrap(), "ann@home");
    assert_eq!(engine.render("greet", &input).unwrap(), "@home");
}

#[rstest]
fn test_native_template_is_called_once_per_site(mut engine: Engine) {
    thread_local! {
        static CALLS: Cell<usize> = const { Cell::new(0) };
    }

    engine.register_external("tick", |_: &CallArgs| {
        CALLS.with(|calls| calls.set(calls.get() + 1));
        String::new()
    });
    engine.compile("def d { tick() div { tick() } }", "d.tl").unwrap();
    engine.render("d", &Value::empty_map()).unwrap();

    assert_eq!(CALLS.with(Cell::get), 2);
}

#[rstest]
#[case::unterminated_literal("def d { ~open }", "LexerError::UnterminatedLiteral")]
#[case::unterminated_comment("def d { /* /* */ }", "LexerError::UnterminatedComment")]
#[case::unterminated_quote(r#"def d { f(a: "x) }"#, "LexerError::UnterminatedQuote")]
#[case::unmatched_brace("def d { ~a~ } }", "ParseError::ExpectedDef")]
#[case::missing_brace("def d { ~a~", "ParseError::ExpectedClosingBrace")]
#[case::missing_bracket(r#"def d { a[href="x" }"#, "ParseError::ExpectedClosingBracket")]
#[case::missing_paren(r#"def d { f(a: "x" }"#, "ParseError::ExpectedClosingParen")]
#[case::missing_argument_name(r#"def d { f(: "x") }"#, "ParseError::MissingArgumentName")]
#[case::missing_argument_value("def d { f(a: ) }", "ParseError::MissingArgumentValue")]
#[case::trailing_text("def d { } ~x~", "ParseError::ExpectedDef")]
fn test_syntax_errors(mut engine: Engine, #[case] code: &str, #[case] expected: &str) {
    use miette::Diagnostic;

    let error = engine.compile(code, "bad.tl").unwrap_err();
    assert!(error.is_syntax_error());
    assert_eq!(error.file_name(), Some("bad.tl"));
    assert!(error.position().is_some());
    assert_eq!(error.code().map(|c| c.to_string()), Some(expected.to_string()));
}

#[rstest]
fn test_partial_compilation_is_kept(mut engine: Engine) {
    let error = engine
        .compile("def a { ~a~ } def b { ~b~ } def c { ] }", "abc.tl")
        .unwrap_err();

    assert!(matches!(
        error.cause,
        InnerError::Parse(ParseError::UnexpectedToken(_))
    ));
    assert_eq!(engine.template_names(), vec![Ident::from("a"), Ident::from("b")]);
    assert_eq!(engine.render("b", &Value::empty_map()).unwrap(), "b");
}

#[rstest]
fn test_partial_compilation_before_lexer_error(mut engine: Engine) {
    let error = engine
        .compile("def a { ~a~ }\ndef b { /* open", "ab.tl")
        .unwrap_err();

    assert!(matches!(
        error.cause,
        InnerError::Lexer(LexerError::UnterminatedComment(_))
    ));
    assert!(engine.is_defined("a"));
    assert!(!engine.is_defined("b"));
}

#[rstest]
fn test_render_into_keeps_partial_output(mut engine: Engine) {
    engine
        .compile("def d { div { ~before~ @missing ~after~ } }", "d.tl")
        .unwrap();

    let mut out = String::from(">");
    let error = engine
        .render_into("d", &Value::empty_map(), &mut out)
        .unwrap_err();

    assert!(error.is_resolution_error());
    assert_eq!(out, "><div>before");
}

#[rstest]
#[case::tags(r#"def d { div#i.a.b[x="1"] { span { ~t~ } p } }"#, json!({}))]
#[case::references("def d { ul { li { ~@a~ } li { @~b } } }", json!({"a": "<1>", "b": "<2>"}))]
#[case::calls(
    r#"def i { ~[@v]~ } def d { div { i(v: "x") i(v: { i(v: ~y~) }) i() } }"#,
    json!({"v": "z"})
)]
fn test_optimize_does_not_change_output(#[case] code: &str, #[case] input: serde_json::Value) {
    let input = params(input);

    let mut optimized = Engine::default();
    optimized.compile(code, "o.tl").unwrap();
    let mut plain = Engine::default();
    plain.set_optimize(false);
    plain.compile(code, "p.tl").unwrap();

    assert_eq!(
        optimized.render("d", &input).unwrap(),
        plain.render("d", &input).unwrap()
    );
}

#[derive(Debug)]
struct Upper;

impl Resolver for Upper {
    fn resolve(&self, container: &Value, key: &str) -> Option<Value> {
        container
            .get(&key.to_lowercase())
            .cloned()
            .map(|value| match value {
                Value::String(s) => Value::String(s.to_uppercase()),
                other => other,
            })
    }
}

#[rstest]
fn test_custom_resolver(mut engine: Engine) {
    engine.set_resolver(Upper);
    engine.compile("def d { ~@USER.NAME~ }", "d.tl").unwrap();

    let input = params(json!({"user": {"name": "ann"}}));
    assert_eq!(engine.render("d", &input).unwrap(), "ANN");
}

#[derive(Debug)]
struct Article {
    title: String,
    views: u32,
}

impl HostObject for Article {
    fn field(&self, key: &str) -> Option<Value> {
        match key {
            "title" => Some(self.title.as_str().into()),
            "views" => Some(Value::Number(self.views.into())),
            _ => None,
        }
    }

    fn text(&self) -> Option<String> {
        Some(format!("Article({})", self.title))
    }
}

#[rstest]
fn test_host_object_parameters(mut engine: Engine) {
    engine
        .compile("def d { h1 { @~a.title } ~@a.views @a~ }", "d.tl")
        .unwrap();

    let input = Value::from_iter([(
        "a",
        Value::object(Article {
            title: "R&D".to_string(),
            views: 10,
        }),
    )]);
    assert_eq!(
        engine.render("d", &input).unwrap(),
        "<h1>R&amp;D</h1>10 Article(R&D)"
    );
}

#[rstest]
fn test_engines_are_independent(mut engine: Engine) {
    engine.compile("def d { ~one~ }", "d.tl").unwrap();

    let mut other = engine.clone();
    other.compile("def d { ~two~ }", "d.tl").unwrap();

    assert_eq!(engine.render("d", &Value::empty_map()).unwrap(), "one");
    assert_eq!(other.render("d", &Value::empty_map()).unwrap(), "two");
}
