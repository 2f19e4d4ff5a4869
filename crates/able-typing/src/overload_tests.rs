use able_syntax::IntegerKind;
use num_bigint::BigInt;

use crate::overload::{
    ImplementationOracle, NoImplementations, OverloadCandidate, OverloadOutcome, resolve_overload,
    resolve_overload_with_type_args, specificity,
};
use crate::types::{FunctionType, GenericParamSpec, IntegerType, InterfaceRef, Type};

fn candidates(signatures: Vec<FunctionType>) -> Vec<OverloadCandidate> {
    signatures.into_iter().map(OverloadCandidate::from).collect()
}

fn identity() -> FunctionType {
    FunctionType {
        type_params: vec![GenericParamSpec::unconstrained("T")],
        ..FunctionType::new(vec![Type::param("T")], Type::param("T"))
    }
}

fn i32_literal(value: i64) -> Type {
    Type::Integer(IntegerType {
        kind: IntegerKind::I32,
        literal: Some(BigInt::from(value)),
        explicit: false,
    })
}

/// Every struct named `Point` implements `Display`.
struct PointDisplay;

impl ImplementationOracle for PointDisplay {
    fn implements(&self, ty: &Type, interface: &InterfaceRef) -> bool {
        ty.nominal_name() == Some("Point") && interface.name == "Display"
    }
}

fn resolved_index(outcome: OverloadOutcome) -> usize {
    match outcome {
        OverloadOutcome::Resolved(inst) => inst.index,
        other => panic!("expected a resolved overload, got {other:?}"),
    }
}

#[test]
fn concrete_candidate_beats_generic_at_equal_score() {
    let overloads = candidates(vec![
        identity(),
        FunctionType::new(vec![Type::int(IntegerKind::I32)], Type::string()),
    ]);
    let outcome = resolve_overload(&overloads, &[Type::int(IntegerKind::I32)], &NoImplementations);
    assert_eq!(resolved_index(outcome), 1);
}

#[test]
fn nullable_slot_scores_below_exact_match() {
    let overloads = candidates(vec![
        FunctionType::new(vec![Type::nullable(Type::string())], Type::void()),
        FunctionType::new(vec![Type::string()], Type::void()),
    ]);
    let outcome = resolve_overload(&overloads, &[Type::string()], &NoImplementations);
    assert_eq!(resolved_index(outcome), 1);
}

#[test]
fn literal_that_does_not_fit_rejects_the_candidate() {
    let overloads = candidates(vec![
        FunctionType::new(vec![Type::int(IntegerKind::U8)], Type::void()),
        FunctionType::new(vec![Type::int(IntegerKind::I64)], Type::void()),
    ]);
    let outcome = resolve_overload(&overloads, &[i32_literal(300)], &NoImplementations);
    assert_eq!(resolved_index(outcome), 1);
}

#[test]
fn interface_parameters_consult_the_oracle() {
    let overloads = candidates(vec![
        FunctionType::new(vec![Type::interface("Display")], Type::string()),
        FunctionType::new(vec![Type::int(IntegerKind::I32)], Type::string()),
    ]);
    let point = Type::Struct("Point".to_string());
    let outcome = resolve_overload(&overloads, std::slice::from_ref(&point), &PointDisplay);
    assert_eq!(resolved_index(outcome), 0);

    let outcome = resolve_overload(&overloads, &[point], &NoImplementations);
    assert!(matches!(outcome, OverloadOutcome::NoMatch));
}

#[test]
fn identical_candidates_are_ambiguous() {
    let overloads = candidates(vec![
        FunctionType::new(vec![Type::string()], Type::void()),
        FunctionType::new(vec![Type::string()], Type::bool()),
    ]);
    let outcome = resolve_overload(&overloads, &[Type::string()], &NoImplementations);
    match outcome {
        OverloadOutcome::Ambiguous(indices) => assert_eq!(indices, vec![0, 1]),
        other => panic!("expected ambiguity, got {other:?}"),
    }
}

#[test]
fn too_few_arguments_yield_a_partial_application() {
    let i32_ty = Type::int(IntegerKind::I32);
    let overloads = candidates(vec![
        FunctionType::new(vec![i32_ty.clone(), i32_ty.clone()], i32_ty.clone()),
        FunctionType::new(vec![i32_ty.clone(), i32_ty.clone(), i32_ty.clone()], i32_ty.clone()),
    ]);
    let outcome = resolve_overload(&overloads, &[i32_ty], &NoImplementations);
    match outcome {
        OverloadOutcome::Partial { chosen, remaining } => {
            assert_eq!(chosen.index, 0);
            insta::assert_snapshot!(Type::Function(remaining).to_string(), @"fn(i32) -> i32");
        }
        other => panic!("expected a partial application, got {other:?}"),
    }
}

#[test]
fn explicit_type_arguments_bind_generics() {
    let overloads = candidates(vec![identity()]);
    let outcome = resolve_overload_with_type_args(
        &overloads,
        &[Type::string()],
        &[Type::string()],
        &NoImplementations,
    );
    match outcome {
        OverloadOutcome::Resolved(inst) => {
            assert_eq!(inst.type_args, vec![Type::string()]);
            assert_eq!(*inst.signature.ret, Type::string());
        }
        other => panic!("expected a resolved overload, got {other:?}"),
    }

    let outcome = resolve_overload_with_type_args(
        &overloads,
        &[Type::string(), Type::bool()],
        &[Type::string()],
        &NoImplementations,
    );
    assert!(matches!(outcome, OverloadOutcome::NoMatch));
}

#[test]
fn specificity_counts_concrete_constructors() {
    assert_eq!(specificity(&Type::param("T")), 0);
    assert_eq!(specificity(&Type::array(Type::param("T"))), 1);
    assert_eq!(specificity(&Type::array(Type::string())), 2);
}
