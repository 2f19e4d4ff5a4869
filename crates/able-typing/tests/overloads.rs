use able_base::Diagnostic;
use able_syntax::build::*;
use able_syntax::{BinaryOp, Module, Statement};
use able_typing::{CheckerConfig, TypeChecker};

fn check(source: &Module) -> (TypeChecker, Vec<Diagnostic>) {
    let mut checker = TypeChecker::with_config(CheckerConfig::default());
    let diagnostics = checker
        .check_module(Some(source))
        .expect("module is present");
    (checker, diagnostics)
}

fn messages(diagnostics: &[Diagnostic]) -> Vec<String> {
    diagnostics.iter().map(|diag| diag.message.clone()).collect()
}

fn point_struct() -> Statement {
    struct_def("Point", vec![field("x", ty("i32"))]).into()
}

fn text_fn(fn_name: &str, params: Vec<able_syntax::Param>, ret: &str) -> Statement {
    let body = match ret {
        "bool" => boolean(true),
        "i32" => int(1),
        _ => string(fn_name),
    };
    fn_def(fn_name, params, Some(ty(ret)), vec![stmt(body)]).into()
}

#[test]
fn inherent_method_wins_over_free_functions() {
    let described = method_call(name("p"), "describe", Vec::new());
    let described_id = described.id();
    let source = module(vec![
        point_struct(),
        methods_def(
            ty("Point"),
            vec![fn_def(
                "describe",
                vec![untyped_param("self")],
                Some(ty("String")),
                vec![stmt(string("method"))],
            )],
        )
        .into(),
        text_fn("describe", vec![param("p", ty("Point"))], "String"),
        text_fn(
            "describe",
            vec![param("p", ty("Point")), param("verbose", ty("bool"))],
            "String",
        ),
        declare("p", struct_lit("Point", vec![("x", int(1))])),
        declare("text", described),
        declare("free", call("describe", vec![name("p")])),
    ]);
    let (checker, diagnostics) = check(&source);
    assert!(diagnostics.is_empty(), "{diagnostics:#?}");
    assert_eq!(
        checker
            .inferred_type(described_id)
            .map(ToString::to_string)
            .as_deref(),
        Some("String")
    );
}

#[test]
fn methods_and_free_functions_are_interchangeable() {
    let as_function = call("norm", vec![name("p")]);
    let as_function_id = as_function.id();
    let as_method = method_call(name("n"), "double", Vec::new());
    let as_method_id = as_method.id();
    let source = module(vec![
        point_struct(),
        methods_def(
            ty("Point"),
            vec![fn_def(
                "norm",
                vec![untyped_param("self")],
                Some(ty("i32")),
                vec![stmt(member(name("self"), "x"))],
            )],
        )
        .into(),
        fn_def(
            "double",
            vec![param("n", ty("i32"))],
            Some(ty("i32")),
            vec![stmt(binary(BinaryOp::Mul, name("n"), int(2)))],
        )
        .into(),
        declare("p", struct_lit("Point", vec![("x", int(3))])),
        declare("length", as_function),
        declare("n", int(4)),
        declare("twice", as_method),
    ]);
    let (checker, diagnostics) = check(&source);
    assert!(diagnostics.is_empty(), "{diagnostics:#?}");
    for id in [as_function_id, as_method_id] {
        let inferred = checker.inferred_type(id).map(ToString::to_string);
        assert_eq!(inferred.as_deref(), Some("i32"));
    }
}

#[test]
fn equally_ranked_overloads_are_ambiguous() {
    let source = module(vec![
        text_fn("pick", vec![param("a", ty("String"))], "i32"),
        text_fn("pick", vec![param("a", ty("String"))], "bool"),
        stmt(call("pick", vec![string("x")])),
    ]);
    let (_, diagnostics) = check(&source);
    assert_eq!(messages(&diagnostics), vec!["ambiguous overload for pick"]);
}

#[test]
fn overloads_without_a_fit_are_reported() {
    let source = module(vec![
        text_fn("show", vec![param("a", ty("String"))], "String"),
        text_fn("show", vec![param("a", ty("i32"))], "String"),
        stmt(call("show", vec![boolean(true)])),
        stmt(call("show", vec![int(7)])),
    ]);
    let (_, diagnostics) = check(&source);
    assert_eq!(
        messages(&diagnostics),
        vec!["no overloads of show match provided arguments"]
    );
}

#[test]
fn identical_overload_is_a_duplicate() {
    let source = module(vec![
        text_fn("show", vec![param("a", ty("String"))], "String"),
        text_fn("show", vec![param("b", ty("String"))], "String"),
    ]);
    let (_, diagnostics) = check(&source);
    assert_eq!(messages(&diagnostics), vec!["duplicate declaration 'show'"]);
}

#[test]
fn missing_arguments_produce_a_partial_application() {
    let partial = call("add", vec![int(1)]);
    let partial_id = partial.id();
    let applied = call("inc", vec![int(2)]);
    let applied_id = applied.id();
    let source = module(vec![
        fn_def(
            "add",
            vec![param("a", ty("i32")), param("b", ty("i32"))],
            Some(ty("i32")),
            vec![stmt(binary(BinaryOp::Add, name("a"), name("b")))],
        )
        .into(),
        declare("inc", partial),
        declare("three", applied),
        stmt(call("add", vec![int(1), int(2), int(3)])),
    ]);
    let (checker, diagnostics) = check(&source);
    assert_eq!(
        messages(&diagnostics),
        vec!["function expects 2 arguments, got 3"]
    );
    let partial_type = checker.inferred_type(partial_id).map(ToString::to_string);
    assert_eq!(partial_type.as_deref(), Some("fn(i32) -> i32"));
    let applied_type = checker.inferred_type(applied_id).map(ToString::to_string);
    assert_eq!(applied_type.as_deref(), Some("i32"));
}

#[test]
fn generic_calls_record_inferred_type_arguments() {
    let identity = fn_def(
        "identity",
        vec![param("value", ty("T"))],
        Some(ty("T")),
        vec![stmt(name("value"))],
    )
    .with_generics(vec![generic("T", Vec::new())]);
    let inferred_call = call("identity", vec![string("x")]);
    let inferred_id = inferred_call.id();
    let explicit_call = call_with_types(
        "identity",
        vec![string("x")],
        vec![ty("String"), ty("bool")],
    );
    let source = module(vec![
        identity.into(),
        declare("same", inferred_call),
        stmt(explicit_call),
    ]);
    let (checker, diagnostics) = check(&source);
    assert_eq!(
        messages(&diagnostics),
        vec!["function expects 1 type arguments, got 2"]
    );
    let type_args: Vec<String> = checker
        .inferred_type_arguments(inferred_id)
        .unwrap_or_default()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(type_args, vec!["String"]);
    assert_eq!(
        checker
            .inferred_type(inferred_id)
            .map(ToString::to_string)
            .as_deref(),
        Some("String")
    );
}

fn generic_fn(fn_name: &str, param_type: able_syntax::TypeExpr, ret: &str) -> Statement {
    let body = match ret {
        "bool" => boolean(true),
        _ => int(1),
    };
    fn_def(fn_name, vec![param("a", param_type)], Some(ty(ret)), vec![stmt(body)])
        .with_generics(vec![generic("T", Vec::new())])
        .into()
}

#[test]
fn overload_choice_does_not_depend_on_declaration_order() {
    for reversed in [false, true] {
        let shown = call("show", vec![int(5)]);
        let shown_id = shown.id();
        let wrapped = call("wrap", vec![array(vec![int(1)])]);
        let wrapped_id = wrapped.id();
        let mut declarations = vec![
            text_fn("show", vec![param("a", ty("i32"))], "String"),
            generic_fn("show", ty("T"), "bool"),
            generic_fn("wrap", generic_ty("Array", vec![ty("T")]), "i32"),
            generic_fn("wrap", ty("T"), "bool"),
        ];
        if reversed {
            declarations.reverse();
        }
        declarations.push(declare("shown", shown));
        declarations.push(declare("wrapped", wrapped));
        let (checker, diagnostics) = check(&module(declarations));
        assert!(diagnostics.is_empty(), "reversed={reversed}: {diagnostics:#?}");
        let inferred = |id| checker.inferred_type(id).map(ToString::to_string);
        // Non-generic beats generic; the more specific generic beats a bare parameter.
        assert_eq!(inferred(shown_id).as_deref(), Some("String"), "reversed={reversed}");
        assert_eq!(inferred(wrapped_id).as_deref(), Some("i32"), "reversed={reversed}");
    }
}
