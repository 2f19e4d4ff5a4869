use able_base::{Diagnostic, DiagnosticSeverity};
use able_syntax::build::*;
use able_syntax::{AssignOp, BinaryOp, IntegerKind, Module, Statement};
use able_typing::{CheckerConfig, TypeChecker};
use rustc_hash::FxHashMap;

fn check_with(config: CheckerConfig, source: &Module) -> (TypeChecker, Vec<Diagnostic>) {
    let mut checker = TypeChecker::with_config(config);
    let diagnostics = checker
        .check_module(Some(source))
        .expect("module is present");
    (checker, diagnostics)
}

fn check(source: &Module) -> (TypeChecker, Vec<Diagnostic>) {
    check_with(CheckerConfig::default(), source)
}

fn messages(diagnostics: &[Diagnostic]) -> Vec<String> {
    diagnostics.iter().map(|diag| diag.message.clone()).collect()
}

#[test]
fn literal_out_of_range_for_declared_width() {
    let source = module(vec![declare_typed("x", ty("u8"), int(300))]);
    let (_, diagnostics) = check(&source);
    assert_eq!(messages(&diagnostics), vec!["literal 300 does not fit in u8"]);
}

#[test]
fn literal_range_is_checked_inside_annotated_arrays() {
    let source = module(vec![declare_typed(
        "bytes",
        generic_ty("Array", vec![ty("u8")]),
        array(vec![int(1), int(256)]),
    )]);
    let (_, diagnostics) = check(&source);
    assert_eq!(messages(&diagnostics), vec!["literal 256 does not fit in u8"]);
}

#[test]
fn mixed_array_elements_report_the_offending_position() {
    let source = module(vec![declare("items", array(vec![int(1), string("two")]))]);
    let (_, diagnostics) = check(&source);
    assert_eq!(diagnostics.len(), 1, "{diagnostics:#?}");
    insta::assert_snapshot!(
        diagnostics[0].message,
        @"array element 2 expects type i32, got String"
    );
}

#[test]
fn mixed_width_arithmetic_promotes() {
    let sum = binary(
        BinaryOp::Add,
        int_typed(1, IntegerKind::I8),
        int_typed(2, IntegerKind::U16),
    );
    let sum_id = sum.id();
    let source = module(vec![declare("total", sum)]);
    let (checker, diagnostics) = check(&source);
    assert!(diagnostics.is_empty(), "{diagnostics:#?}");
    let inferred = checker.inferred_type(sum_id).expect("sum is recorded");
    assert_eq!(inferred.to_string(), "i32");
}

#[test]
fn promotion_past_the_widest_integer_is_reported() {
    let source = module(vec![declare(
        "total",
        binary(
            BinaryOp::Add,
            int_typed(1, IntegerKind::I128),
            int_typed(2, IntegerKind::U64),
        ),
    )]);
    let (_, diagnostics) = check(&source);
    assert_eq!(diagnostics.len(), 1, "{diagnostics:#?}");
    assert!(
        diagnostics[0].message.contains("exceeding available widths"),
        "{diagnostics:#?}"
    );
}

#[test]
fn undefined_identifiers_depend_on_dynamic_lookups() {
    let source = module(vec![stmt(name("missing"))]);
    let (_, diagnostics) = check(&source);
    assert_eq!(messages(&diagnostics), vec!["undefined identifier 'missing'"]);

    let relaxed = CheckerConfig {
        allow_dynamic_lookups: true,
        ..CheckerConfig::default()
    };
    let (_, diagnostics) = check_with(relaxed, &source);
    assert!(diagnostics.is_empty(), "{diagnostics:#?}");
}

#[test]
fn duplicate_declarations_point_at_the_first_origin() {
    let first = struct_def("Point", vec![field("x", ty("i32"))]);
    let second = struct_def("Point", vec![field("y", ty("i32"))]);
    let mut origins = FxHashMap::default();
    origins.insert(first.id, "geometry.able".to_string());
    let source = module(vec![first.into(), second.into()]);

    let mut checker = TypeChecker::with_config(CheckerConfig::default());
    checker.set_node_origins(origins);
    let diagnostics = checker.check_module(Some(&source)).expect("module is present");
    assert_eq!(messages(&diagnostics), vec!["duplicate declaration 'Point'"]);
    insta::assert_snapshot!(
        diagnostics[0].notes[0].message,
        @"previous declaration at geometry.able"
    );
}

#[test]
fn unknown_struct_member_is_reported() {
    let source = module(vec![
        struct_def("Point", vec![field("x", ty("i32"))]).into(),
        declare("p", struct_lit("Point", vec![("x", int(1))])),
        stmt(member(name("p"), "y")),
    ]);
    let (_, diagnostics) = check(&source);
    assert_eq!(messages(&diagnostics), vec!["Point has no member 'y'"]);
}

#[test]
fn struct_literals_check_their_fields() {
    let source = module(vec![
        struct_def("Point", vec![field("x", ty("i32")), field("y", ty("i32"))]).into(),
        declare(
            "p",
            struct_lit("Point", vec![("x", string("one")), ("z", int(3))]),
        ),
    ]);
    let (_, diagnostics) = check(&source);
    insta::assert_snapshot!(
        messages(&diagnostics).join("\n"),
        @r"
    struct 'Point' has no field 'z'
    missing field 'y' in struct 'Point'
    struct field 'x' expects i32, got String
    "
    );
}

#[test]
fn indexing_requires_integers_and_indexable_values() {
    let source = module(vec![
        declare("xs", array(vec![int(1), int(2)])),
        stmt(index(name("xs"), string("first"))),
        declare("flag", boolean(true)),
        stmt(index(name("flag"), int(0))),
        assign_place(AssignOp::Declare, index(name("xs"), int(0)), int(5)),
    ]);
    let (_, diagnostics) = check(&source);
    insta::assert_snapshot!(
        messages(&diagnostics).join("\n"),
        @r"
    index must be an integer (got String)
    cannot index into type bool
    cannot use := on index assignment
    "
    );
}

#[test]
fn control_flow_misuse_is_reported() {
    let source = module(vec![
        rethrow(),
        stmt(loop_expr(vec![break_stmt(Some("outer"), None)])),
        break_stmt(None, None),
    ]);
    let (_, diagnostics) = check(&source);
    insta::assert_snapshot!(
        messages(&diagnostics).join("\n"),
        @r"
    rethrow is only valid inside rescue handlers
    unknown break label 'outer'
    break statement outside loop
    "
    );
}

#[test]
fn range_bounds_must_be_numeric() {
    let source = module(vec![declare(
        "span",
        range(string("a"), int(3), false),
    )]);
    let (_, diagnostics) = check(&source);
    assert_eq!(
        messages(&diagnostics),
        vec!["range start must be numeric (got String)"]
    );
}

#[test]
fn rescue_without_handlers_warns() {
    let source = module(vec![stmt(rescue(int(1), Vec::new()))]);
    let (_, diagnostics) = check(&source);
    assert_eq!(diagnostics.len(), 1, "{diagnostics:#?}");
    assert_eq!(diagnostics[0].severity, DiagnosticSeverity::Warning);
    assert_eq!(diagnostics[0].message, "rescue has no handler clauses");
    let json = serde_json::to_value(&diagnostics[0]).expect("diagnostic serializes");
    assert_eq!(json["severity"], "warning");
    assert_eq!(json["notes"], serde_json::json!([]));

    let quiet = CheckerConfig {
        warn_unused_rescue: false,
        ..CheckerConfig::default()
    };
    let (_, diagnostics) = check_with(quiet, &source);
    assert!(diagnostics.is_empty(), "{diagnostics:#?}");
}

#[test]
fn unannotated_functions_take_their_inferred_return_type() {
    let source = module(vec![
        fn_def("answer", Vec::new(), None, vec![stmt(int(42))]).into(),
        fn_def(
            "greet",
            vec![param("who", ty("String"))],
            Some(ty("String")),
            vec![stmt(interpolate(vec![string("hi "), name("who")]))],
        )
        .into(),
    ]);
    let (checker, diagnostics) = check(&source);
    assert!(diagnostics.is_empty(), "{diagnostics:#?}");
    let exported: Vec<String> = checker
        .exported_symbols()
        .iter()
        .map(|symbol| format!("{}: {}", symbol.name, symbol.ty))
        .collect();
    insta::assert_snapshot!(exported.join("\n"), @r"
    answer: fn() -> i32
    greet: fn(String) -> String
    ");
}

#[test]
fn return_type_mismatch_is_reported_at_the_tail() {
    let source = module(vec![Statement::from(fn_def(
        "flag",
        Vec::new(),
        Some(ty("bool")),
        vec![stmt(string("yes"))],
    ))]);
    let (_, diagnostics) = check(&source);
    assert_eq!(
        messages(&diagnostics),
        vec!["return type mismatch: expected bool, got String"]
    );
}

#[test]
fn literal_range_checks_reach_every_typed_slot() {
    let source = module(vec![
        declare_typed(
            "lookup",
            generic_ty("Map", vec![ty("String"), ty("u8")]),
            map(vec![entry(string("a"), int(300))]),
        ),
        declare_typed(
            "span",
            generic_ty("Range", vec![ty("u8")]),
            range(int(0), int(301), false),
        ),
        stmt(iterator(Some(ty("u8")), vec![yield_stmt(int(302))])),
        declare_typed("job", generic_ty("Proc", vec![ty("u8")]), proc_expr(int(303))),
        declare_typed("task", generic_ty("Future", vec![ty("u8")]), spawn(int(304))),
        declare_typed(
            "grid",
            generic_ty("Array", vec![generic_ty("Array", vec![ty("u8")])]),
            array(vec![array(vec![int(1)]), array(vec![int(305)])]),
        ),
    ]);
    let (_, diagnostics) = check(&source);
    insta::assert_snapshot!(
        messages(&diagnostics).join("\n"),
        @r"
    literal 300 does not fit in u8
    literal 301 does not fit in u8
    literal 302 does not fit in u8
    literal 303 does not fit in u8
    literal 304 does not fit in u8
    literal 305 does not fit in u8
    "
    );
}

#[test]
fn loop_and_iterator_annotations_are_enforced() {
    let source = module(vec![
        for_loop(
            typed(bind("word"), ty("String")),
            array(vec![int(1), int(2)]),
            Vec::new(),
        ),
        stmt(iterator(Some(ty("i32")), vec![yield_stmt(string("one"))])),
    ]);
    let (_, diagnostics) = check(&source);
    insta::assert_snapshot!(
        messages(&diagnostics).join("\n"),
        @r"
    for-loop pattern expects type String, got i32
    iterator annotation expects elements of type i32, got String
    "
    );
}

#[test]
fn typed_match_clause_refines_an_unknown_subject() {
    let seen = name("value");
    let seen_id = seen.id();
    let source = module(vec![Statement::from(fn_def(
        "classify",
        vec![untyped_param("value")],
        None,
        vec![stmt(match_expr(
            name("value"),
            vec![clause(typed(bind("n"), ty("i32")), seen)],
        ))],
    ))]);
    let (checker, diagnostics) = check(&source);
    assert!(diagnostics.is_empty(), "{diagnostics:#?}");
    let refined = checker.inferred_type(seen_id).map(ToString::to_string);
    assert_eq!(refined.as_deref(), Some("i32"));
}

#[test]
fn map_literals_report_key_and_spread_mismatches() {
    let source = module(vec![
        declare("base", map(vec![entry(int(1), string("one"))])),
        declare(
            "mixed",
            map(vec![entry(string("a"), int(1)), entry(int(2), int(3))]),
        ),
        declare(
            "merged",
            map(vec![entry(string("b"), string("two")), spread(name("base"))]),
        ),
        declare("flat", map(vec![spread(int(5))])),
    ]);
    let (_, diagnostics) = check(&source);
    insta::assert_snapshot!(
        messages(&diagnostics).join("\n"),
        @r"
    map key expects type String, got i32
    map spread expects type Map String String, got Map i32 String
    map spread expects a Map, got i32
    "
    );
}

#[test]
fn unsigned_128_bit_operand_keeps_its_width() {
    let sum = binary(
        BinaryOp::Add,
        int_typed(1, IntegerKind::U128),
        int_typed(2, IntegerKind::I32),
    );
    let sum_id = sum.id();
    let (checker, diagnostics) = check(&module(vec![declare("total", sum)]));
    assert!(diagnostics.is_empty(), "{diagnostics:#?}");
    let inferred = checker.inferred_type(sum_id).expect("sum is recorded");
    assert_eq!(inferred.to_string(), "u128");
}
