use able_base::Diagnostic;
use able_syntax::build::*;
use able_syntax::{AssignOp, BinaryOp, Module, Statement};
use able_typing::{CheckerConfig, TypeChecker};

fn check(source: &Module) -> Vec<Diagnostic> {
    let mut checker = TypeChecker::with_config(CheckerConfig::default());
    checker
        .check_module(Some(source))
        .expect("module is present")
}

fn messages(diagnostics: &[Diagnostic]) -> Vec<String> {
    diagnostics.iter().map(|diag| diag.message.clone()).collect()
}

fn display_interface() -> able_syntax::Statement {
    interface_def(
        "Display",
        vec![signature(
            "to_string",
            vec![untyped_param("self")],
            Some(ty("String")),
        )],
    )
    .into()
}

fn display_for_string() -> able_syntax::Statement {
    impl_def(
        "Display",
        ty("String"),
        vec![fn_def(
            "to_string",
            vec![untyped_param("self")],
            Some(ty("String")),
            vec![stmt(name("self"))],
        )],
    )
    .into()
}

#[test]
fn unsatisfied_generic_bound_names_parameter_and_subject() {
    let source = module(vec![
        struct_def("Wrapper", vec![field("value", ty("String"))]).into(),
        fn_def(
            "useDisplay",
            vec![param("value", ty("T"))],
            Some(ty("String")),
            vec![stmt(method_call(name("value"), "to_string", Vec::new()))],
        )
        .with_generics(vec![generic("T", vec![ty("Display")])])
        .into(),
        stmt(call(
            "useDisplay",
            vec![struct_lit("Wrapper", vec![("value", string("hi"))])],
        )),
    ]);
    let diagnostics = check(&source);
    assert_eq!(diagnostics.len(), 1, "{diagnostics:#?}");
    let message = &diagnostics[0].message;
    assert!(message.contains("constraint on T"), "{message}");
    assert!(message.contains("Wrapper"), "{message}");
}

#[test]
fn satisfied_generic_bound_is_silent() {
    let source = module(vec![
        fn_def(
            "useDisplay",
            vec![param("value", ty("T"))],
            Some(ty("String")),
            vec![stmt(method_call(name("value"), "to_string", Vec::new()))],
        )
        .with_generics(vec![generic("T", vec![ty("Display")])])
        .into(),
        stmt(call("useDisplay", vec![int(5)])),
        stmt(call("useDisplay", vec![string("five")])),
    ]);
    let diagnostics = check(&source);
    assert!(diagnostics.is_empty(), "{diagnostics:#?}");
}

#[test]
fn builtin_display_overlaps_a_local_impl_for_string() {
    let diagnostics = check(&module(vec![display_for_string()]));
    assert_eq!(
        messages(&diagnostics),
        vec!["overlapping implementations of Display for String"]
    );
}

#[test]
fn redeclaring_display_suppresses_builtin_impls() {
    let diagnostics = check(&module(vec![display_interface(), display_for_string()]));
    assert!(diagnostics.is_empty(), "{diagnostics:#?}");
}

fn grid_with_index() -> Vec<able_syntax::Statement> {
    vec![
        struct_def(
            "Grid",
            vec![field("cells", generic_ty("Array", vec![ty("i32")]))],
        )
        .into(),
        interface_def(
            "Index",
            vec![signature(
                "get",
                vec![untyped_param("self"), param("at", ty("i32"))],
                Some(ty("i32")),
            )],
        )
        .into(),
        impl_def(
            "Index",
            ty("Grid"),
            vec![fn_def(
                "get",
                vec![untyped_param("self"), param("at", ty("i32"))],
                Some(ty("i32")),
                vec![stmt(index(member(name("self"), "cells"), name("at")))],
            )],
        )
        .into(),
        declare(
            "grid",
            struct_lit("Grid", vec![("cells", array(vec![int(1), int(2)]))]),
        ),
        declare("first", index(name("grid"), int(0))),
    ]
}

#[test]
fn index_assignment_requires_index_mut() {
    let mut body = grid_with_index();
    body.push(assign_place(
        AssignOp::Assign,
        index(name("grid"), int(0)),
        int(9),
    ));
    let diagnostics = check(&module(body));
    assert_eq!(diagnostics.len(), 1, "{diagnostics:#?}");
    insta::assert_snapshot!(
        diagnostics[0].message,
        @"cannot assign via [] without IndexMut implementation on type Grid"
    );
}

#[test]
fn index_mut_implementation_allows_assignment() {
    let mut body = grid_with_index();
    body.push(
        interface_def(
            "IndexMut",
            vec![signature(
                "set",
                vec![
                    untyped_param("self"),
                    param("at", ty("i32")),
                    param("value", ty("i32")),
                ],
                Some(ty("void")),
            )],
        )
        .into(),
    );
    body.push(
        impl_def(
            "IndexMut",
            ty("Grid"),
            vec![fn_def(
                "set",
                vec![
                    untyped_param("self"),
                    param("at", ty("i32")),
                    param("value", ty("i32")),
                ],
                Some(ty("void")),
                vec![assign_place(
                    AssignOp::Assign,
                    index(member(name("self"), "cells"), name("at")),
                    name("value"),
                )],
            )],
        )
        .into(),
    );
    body.push(assign_place(
        AssignOp::Assign,
        index(name("grid"), int(0)),
        int(9),
    ));
    let diagnostics = check(&module(body));
    assert!(diagnostics.is_empty(), "{diagnostics:#?}");
}

#[test]
fn impls_are_checked_against_their_interface() {
    let source = module(vec![
        struct_def("Point", vec![field("x", ty("i32"))]).into(),
        interface_def(
            "Describe",
            vec![
                signature("describe", vec![untyped_param("self")], Some(ty("String"))),
                signature("label", vec![untyped_param("self")], Some(ty("String"))),
            ],
        )
        .into(),
        impl_def(
            "Describe",
            ty("Point"),
            vec![
                fn_def(
                    "describe",
                    vec![untyped_param("self")],
                    Some(ty("i32")),
                    vec![stmt(int(1))],
                ),
                fn_def(
                    "extra",
                    vec![untyped_param("self")],
                    Some(ty("bool")),
                    vec![stmt(boolean(true))],
                ),
            ],
        )
        .into(),
    ]);
    let diagnostics = check(&source);
    insta::assert_snapshot!(messages(&diagnostics).join("\n"), @r"
    impl Describe for Point missing method 'label'
    impl Describe for Point method 'describe' has incompatible signature: expected fn(Point) -> String, got fn(Point) -> i32
    impl Describe for Point defines unknown method 'extra'
    ");
}

#[test]
fn alias_where_clauses_are_proven_at_use() {
    let shown = alias_def("Shown", ty("T"))
        .with_generics(vec![generic("T", Vec::new())])
        .with_where(vec![where_clause("T", vec![ty("Display")])]);
    let source = module(vec![
        shown.into(),
        struct_def("Opaque", Vec::new()).into(),
        declare_typed(
            "hidden",
            generic_ty("Shown", vec![ty("Opaque")]),
            struct_lit("Opaque", Vec::new()),
        ),
        declare_typed(
            "text",
            generic_ty("Shown", vec![ty("String")]),
            string("visible"),
        ),
    ]);
    let diagnostics = check(&source);
    assert_eq!(diagnostics.len(), 1, "{diagnostics:#?}");
    assert!(
        diagnostics[0]
            .message
            .starts_with("type alias 'Shown': Opaque does not implement Display"),
        "{diagnostics:#?}"
    );
}

fn iterable_interface() -> Statement {
    interface_def(
        "Iterable",
        vec![signature(
            "iterator",
            vec![untyped_param("self")],
            Some(generic_ty("Iterator", vec![ty("T")])),
        )],
    )
    .with_generics(vec![generic("T", Vec::new())])
    .into()
}

#[test]
fn for_loop_elements_come_from_an_iterable_bound() {
    let walk = fn_def(
        "walk",
        vec![param("items", ty("C"))],
        None,
        vec![for_loop(
            typed(bind("x"), ty("String")),
            name("items"),
            Vec::new(),
        )],
    )
    .with_generics(vec![generic(
        "C",
        vec![generic_ty("Iterable", vec![ty("i32")])],
    )]);
    let diagnostics = check(&module(vec![iterable_interface(), walk.into()]));
    assert_eq!(
        messages(&diagnostics),
        vec!["for-loop pattern expects type String, got i32"]
    );
}

#[test]
fn for_loop_over_an_iterable_interface_value() {
    let drain = fn_def(
        "drain",
        vec![param("items", generic_ty("Iterable", vec![ty("i32")]))],
        None,
        vec![for_loop(
            typed(bind("x"), ty("String")),
            name("items"),
            Vec::new(),
        )],
    );
    let diagnostics = check(&module(vec![iterable_interface(), drain.into()]));
    assert_eq!(
        messages(&diagnostics),
        vec!["for-loop pattern expects type String, got i32"]
    );
}

#[test]
fn for_loop_over_a_struct_implementing_iterable() {
    let source = module(vec![
        iterable_interface(),
        struct_def("Bag", Vec::new()).into(),
        impl_def(
            "Iterable",
            ty("Bag"),
            vec![fn_def(
                "iterator",
                vec![untyped_param("self")],
                Some(generic_ty("Iterator", vec![ty("i32")])),
                vec![stmt(iterator(Some(ty("i32")), vec![yield_stmt(int(1))]))],
            )],
        )
        .with_interface_args(vec![ty("i32")])
        .into(),
        declare("bag", struct_lit("Bag", Vec::new())),
        for_loop(
            bind("x"),
            name("bag"),
            vec![stmt(binary(BinaryOp::Add, name("x"), int(1)))],
        ),
        for_loop(typed(bind("y"), ty("String")), name("bag"), Vec::new()),
    ]);
    let diagnostics = check(&source);
    assert_eq!(
        messages(&diagnostics),
        vec!["for-loop pattern expects type String, got i32"]
    );
}

#[test]
fn method_set_constraints_name_the_method_that_requires_them() {
    let source = module(vec![
        interface_def(
            "Describe",
            vec![signature("describe", vec![untyped_param("self")], Some(ty("String")))],
        )
        .into(),
        struct_def("Box", vec![field("value", ty("T"))])
            .with_generics(vec![generic("T", Vec::new())])
            .into(),
        struct_def("Opaque", Vec::new()).into(),
        methods_def(
            generic_ty("Box", vec![ty("T")]),
            vec![fn_def(
                "describe",
                vec![untyped_param("self")],
                Some(ty("String")),
                vec![stmt(string("box"))],
            )],
        )
        .with_where(vec![where_clause("T", vec![ty("Display")])])
        .into(),
        fn_def(
            "show",
            vec![param("item", ty("D"))],
            Some(ty("String")),
            vec![stmt(method_call(name("item"), "describe", Vec::new()))],
        )
        .with_generics(vec![generic("D", vec![ty("Describe")])])
        .into(),
        stmt(call(
            "show",
            vec![struct_lit(
                "Box",
                vec![("value", struct_lit("Opaque", Vec::new()))],
            )],
        )),
    ]);
    let diagnostics = check(&source);
    assert_eq!(diagnostics.len(), 1, "{diagnostics:#?}");
    let message = &diagnostics[0].message;
    assert!(message.contains("constraint on D"), "{message}");
    assert!(message.contains("does not implement Display (via method 'describe')"), "{message}");
}
