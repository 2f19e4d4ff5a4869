use able_base::Diagnostic;
use able_syntax::build::*;
use able_syntax::Module;
use able_typing::{CheckerConfig, Scope, TypeChecker};

fn messages(diagnostics: &[Diagnostic]) -> Vec<String> {
    diagnostics.iter().map(|diag| diag.message.clone()).collect()
}

fn geometry() -> Module {
    package_module(
        "geometry",
        Vec::new(),
        vec![
            struct_def("Point", vec![field("x", ty("i32"))]).into(),
            fn_def(
                "origin",
                Vec::new(),
                Some(ty("Point")),
                vec![stmt(struct_lit("Point", vec![("x", int(0))]))],
            )
            .into(),
            fn_def("helper", Vec::new(), Some(ty("i32")), vec![stmt(int(1))])
                .private()
                .into(),
            impl_def(
                "Display",
                ty("Point"),
                vec![fn_def(
                    "to_string",
                    vec![untyped_param("self")],
                    Some(ty("String")),
                    vec![stmt(string("point"))],
                )],
            )
            .into(),
        ],
    )
}

/// Checks the geometry package and returns a checker seeded with its exports.
fn dependent_checker() -> TypeChecker {
    let mut library = TypeChecker::with_config(CheckerConfig::default());
    let diagnostics = library
        .check_module(Some(&geometry()))
        .expect("module is present");
    assert!(diagnostics.is_empty(), "{diagnostics:#?}");

    let scope: Scope = library.exported_scope("geometry");
    let mut checker = TypeChecker::with_config(CheckerConfig::default());
    checker.set_prelude(
        Some(&scope),
        library.module_implementations().to_vec(),
        library.module_method_sets().to_vec(),
    );
    checker
}

#[test]
fn private_declarations_are_not_exported() {
    let mut library = TypeChecker::with_config(CheckerConfig::default());
    library
        .check_module(Some(&geometry()))
        .expect("module is present");
    let exported: Vec<String> = library
        .exported_symbols()
        .iter()
        .map(|symbol| format!("{}: {}", symbol.name, symbol.ty))
        .collect();
    insta::assert_snapshot!(exported.join("\n"), @r"
    Point: Point
    origin: fn() -> Point
    ");
    assert_eq!(library.module_implementations().len(), 1);
}

#[test]
fn exports_round_trip_through_the_prelude() {
    let mut checker = dependent_checker();
    let text = method_call(name("p"), "to_string", Vec::new());
    let text_id = text.id();
    let app = package_module(
        "app",
        vec![import_selected("geometry", &["origin"])],
        vec![
            declare("p", call("origin", Vec::new())),
            declare("label", text),
            declare("q", struct_lit("Point", vec![("x", int(2))])),
            declare("r", call_expr(member(name("geometry"), "origin"), Vec::new())),
        ],
    );
    let diagnostics = checker.check_module(Some(&app)).expect("module is present");
    assert!(diagnostics.is_empty(), "{diagnostics:#?}");
    let label = checker.inferred_type(text_id).map(ToString::to_string);
    assert_eq!(label.as_deref(), Some("String"));
}

#[test]
fn imports_are_validated_against_the_prelude() {
    let mut checker = dependent_checker();
    let app = package_module(
        "app",
        vec![
            import("nowhere"),
            import_selected("geometry", &["helper"]),
        ],
        vec![stmt(member(name("geometry"), "missing"))],
    );
    let diagnostics = checker.check_module(Some(&app)).expect("module is present");
    insta::assert_snapshot!(messages(&diagnostics).join("\n"), @r"
    import references unknown package 'nowhere'
    package 'geometry' has no symbol 'helper'
    package 'geometry' has no symbol 'missing'
    ");
}

#[test]
fn clearing_the_prelude_forgets_its_symbols() {
    let mut checker = dependent_checker();
    checker.set_prelude(None, Vec::new(), Vec::new());
    let app = module(vec![declare("p", call("origin", Vec::new()))]);
    let diagnostics = checker.check_module(Some(&app)).expect("module is present");
    assert_eq!(messages(&diagnostics), vec!["undefined identifier 'origin'"]);
}
