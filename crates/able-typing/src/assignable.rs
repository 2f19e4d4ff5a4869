use crate::numeric::{literal_fits, range_contains};
use crate::types::{FloatType, FunctionType, IntegerType, PrimitiveKind, Type, UnionType};
use able_syntax::FloatKind;

/// Structural assignability of `actual` into a slot declared as `expected`.
///
/// `Unknown` and type parameters are accepted in either position; the solver and later
/// instantiation deal with parameters. Interface slots are not handled here because they need
/// the implementation registry.
pub fn type_assignable(actual: &Type, expected: &Type) -> bool {
    match (actual, expected) {
        (Type::Unknown, _) | (_, Type::Unknown) => true,
        (Type::TypeParameter(_), _) | (_, Type::TypeParameter(_)) => true,
        (_, Type::Primitive(PrimitiveKind::Void)) => true,
        (Type::Alias(_) | Type::Applied { .. }, _) | (_, Type::Alias(_) | Type::Applied { .. }) => {
            let actual_resolved = actual.resolved();
            let expected_resolved = expected.resolved();
            match (&actual_resolved, &expected_resolved) {
                (Type::Applied { base: ab, args: aa }, Type::Applied { base: eb, args: ea }) => {
                    ab.nominal_name() == eb.nominal_name() && all_assignable(aa, ea)
                }
                (Type::Applied { .. }, _) | (_, Type::Applied { .. }) => false,
                _ => type_assignable(&actual_resolved, &expected_resolved),
            }
        }
        (Type::Integer(a), Type::Integer(e)) => integer_assignable(a, e),
        (Type::Integer(a), Type::Float(_)) => a.is_flexible_literal(),
        (Type::Float(a), Type::Float(e)) => float_assignable(a, e),
        (Type::Primitive(PrimitiveKind::Nil), Type::Nullable(_)) => true,
        (Type::Nullable(a), Type::Nullable(e)) => type_assignable(a, e),
        (Type::Nullable(inner), Type::Union(union)) => {
            union_accepts_nil(union) && type_assignable(inner, expected)
        }
        (Type::Union(a), Type::Union(e)) if a.name.is_some() && a.name == e.name => true,
        (Type::Union(a), _) => a
            .variants
            .iter()
            .all(|variant| type_assignable(variant, expected)),
        (_, Type::Nullable(inner)) => type_assignable(actual, inner),
        (_, Type::Union(union)) => union
            .variants
            .iter()
            .any(|variant| type_assignable(actual, variant)),
        (Type::Primitive(a), Type::Primitive(e)) => a == e,
        (Type::Array(a), Type::Array(e))
        | (Type::Range(a), Type::Range(e))
        | (Type::Iterator(a), Type::Iterator(e))
        | (Type::Proc(a), Type::Proc(e))
        | (Type::Future(a), Type::Future(e)) => type_assignable(a, e),
        (Type::Map(ak, av), Type::Map(ek, ev)) => type_assignable(ak, ek) && type_assignable(av, ev),
        (Type::Function(a), Type::Function(e)) => {
            a.params.len() == e.params.len()
                && a
                    .params
                    .iter()
                    .zip(&e.params)
                    .all(|(ap, ep)| type_assignable(ep, ap))
                && type_assignable(&a.ret, &e.ret)
        }
        (Type::Overloads(candidates), Type::Function(_)) => candidates
            .iter()
            .any(|candidate| type_assignable(&Type::Function(candidate.clone()), expected)),
        (
            Type::Struct(_) | Type::StructInstance { .. },
            Type::Struct(_) | Type::StructInstance { .. },
        ) => {
            actual.nominal_name() == expected.nominal_name()
                && all_assignable(struct_args(actual), struct_args(expected))
        }
        (Type::Interface(a), Type::Interface(e)) => a.name == e.name && all_assignable(&a.args, &e.args),
        (Type::Package(a), Type::Package(e)) => a.name == e.name,
        (Type::ImplementationNamespace(a), Type::ImplementationNamespace(e)) => a.name == e.name,
        _ => false,
    }
}

fn struct_args(ty: &Type) -> &[Type] {
    match ty {
        Type::StructInstance { args, .. } => args,
        _ => &[],
    }
}

/// Missing arguments on either side are treated as unconstrained.
fn all_assignable(actual: &[Type], expected: &[Type]) -> bool {
    if actual.is_empty() || expected.is_empty() {
        return true;
    }
    actual.len() == expected.len()
        && actual
            .iter()
            .zip(expected)
            .all(|(a, e)| type_assignable(a, e))
}

fn integer_assignable(actual: &IntegerType, expected: &IntegerType) -> bool {
    if actual.kind == expected.kind {
        return true;
    }
    match &actual.literal {
        Some(value) if !actual.explicit => literal_fits(value, expected.kind),
        _ => range_contains(expected.kind, actual.kind),
    }
}

fn float_assignable(actual: &FloatType, expected: &FloatType) -> bool {
    actual.kind == expected.kind
        || (actual.literal && !actual.explicit)
        || (actual.kind == FloatKind::F32 && expected.kind == FloatKind::F64)
}

fn union_accepts_nil(union: &UnionType) -> bool {
    union
        .variants
        .iter()
        .any(|variant| matches!(variant, Type::Primitive(PrimitiveKind::Nil) | Type::Nullable(_)))
}

/// Explains why an integer literal (possibly nested in a container) cannot take the expected
/// type, e.g. `literal 300 does not fit in u8`.
pub fn literal_mismatch(actual: &Type, expected: &Type) -> Option<String> {
    match (actual, expected) {
        (Type::Integer(int), Type::Integer(target)) => match &int.literal {
            Some(value) if !literal_fits(value, target.kind) => {
                Some(format!("literal {value} does not fit in {}", target.kind))
            }
            _ => None,
        },
        (Type::Nullable(a), Type::Nullable(e)) => literal_mismatch(a, e),
        (_, Type::Nullable(inner)) => literal_mismatch(actual, inner),
        (Type::Array(a), Type::Array(e))
        | (Type::Range(a), Type::Range(e))
        | (Type::Iterator(a), Type::Iterator(e))
        | (Type::Proc(a), Type::Proc(e))
        | (Type::Future(a), Type::Future(e)) => literal_mismatch(a, e),
        (Type::Map(ak, av), Type::Map(ek, ev)) => {
            literal_mismatch(ak, ek).or_else(|| literal_mismatch(av, ev))
        }
        (_, Type::Union(union)) => {
            if union
                .variants
                .iter()
                .any(|variant| type_assignable(actual, variant))
            {
                return None;
            }
            union
                .variants
                .iter()
                .find_map(|variant| literal_mismatch(actual, variant))
        }
        (_, Type::Alias(_) | Type::Applied { .. }) => {
            let resolved = expected.resolved();
            if matches!(resolved, Type::Applied { .. }) {
                None
            } else {
                literal_mismatch(actual, &resolved)
            }
        }
        _ => None,
    }
}

/// Two types denote the same type once aliases are unwrapped.
pub fn types_equivalent(a: &Type, b: &Type) -> bool {
    a.resolved() == b.resolved()
}

/// Equivalence used when comparing declared signatures, e.g. an impl method against its
/// interface. Type parameters match each other by position only; `Unknown` matches anything.
pub fn signature_types_equivalent(a: &Type, b: &Type) -> bool {
    match (a, b) {
        (Type::Unknown, _) | (_, Type::Unknown) => true,
        (Type::TypeParameter(_), other) | (other, Type::TypeParameter(_)) => {
            other.is_type_parameter()
        }
        (
            Type::Struct(_) | Type::StructInstance { .. },
            Type::Struct(_) | Type::StructInstance { .. },
        ) => a.nominal_name() == b.nominal_name(),
        (Type::Applied { base: ab, args: aa }, Type::Applied { base: bb, args: ba }) => {
            signature_types_equivalent(ab, bb)
                && aa.len() == ba.len()
                && aa
                    .iter()
                    .zip(ba)
                    .all(|(x, y)| signature_types_equivalent(x, y))
        }
        (Type::Applied { base, .. }, other @ (Type::Struct(_) | Type::StructInstance { .. }))
        | (other @ (Type::Struct(_) | Type::StructInstance { .. }), Type::Applied { base, .. }) => {
            signature_types_equivalent(base, other)
        }
        (Type::Array(x), Type::Array(y))
        | (Type::Nullable(x), Type::Nullable(y))
        | (Type::Range(x), Type::Range(y))
        | (Type::Iterator(x), Type::Iterator(y))
        | (Type::Proc(x), Type::Proc(y))
        | (Type::Future(x), Type::Future(y)) => signature_types_equivalent(x, y),
        (Type::Map(ak, av), Type::Map(bk, bv)) => {
            signature_types_equivalent(ak, bk) && signature_types_equivalent(av, bv)
        }
        (Type::Union(x), Type::Union(y)) if x.name.is_none() && y.name.is_none() => {
            x.variants.len() == y.variants.len()
                && x
                    .variants
                    .iter()
                    .zip(&y.variants)
                    .all(|(p, q)| signature_types_equivalent(p, q))
        }
        (Type::Function(x), Type::Function(y)) => signatures_equivalent(x, y),
        _ => a.to_string() == b.to_string(),
    }
}

pub fn signatures_equivalent(a: &FunctionType, b: &FunctionType) -> bool {
    a.params.len() == b.params.len()
        && a
            .params
            .iter()
            .zip(&b.params)
            .all(|(x, y)| signature_types_equivalent(x, y))
        && signature_types_equivalent(&a.ret, &b.ret)
}

#[cfg(test)]
mod tests {
    use able_syntax::IntegerKind;
    use num_bigint::BigInt;

    use super::*;

    fn literal(value: i64) -> Type {
        Type::Integer(IntegerType {
            kind: IntegerKind::I32,
            literal: Some(BigInt::from(value)),
            explicit: false,
        })
    }

    #[test]
    fn literals_fit_by_range() {
        let u8_ty = Type::int(IntegerKind::U8);
        assert!(type_assignable(&literal(255), &u8_ty));
        assert!(!type_assignable(&literal(300), &u8_ty));
        assert_eq!(
            literal_mismatch(&literal(300), &u8_ty).as_deref(),
            Some("literal 300 does not fit in u8")
        );
    }

    #[test]
    fn narrower_integers_widen() {
        assert!(type_assignable(
            &Type::int(IntegerKind::U8),
            &Type::int(IntegerKind::I32)
        ));
        assert!(!type_assignable(
            &Type::int(IntegerKind::I64),
            &Type::int(IntegerKind::I32)
        ));
        assert!(!type_assignable(
            &Type::int(IntegerKind::I8),
            &Type::int(IntegerKind::U64)
        ));
    }

    #[test]
    fn nullable_accepts_nil_and_inner() {
        let expected = Type::nullable(Type::string());
        assert!(type_assignable(&Type::nil(), &expected));
        assert!(type_assignable(&Type::string(), &expected));
        assert!(!type_assignable(&Type::bool(), &expected));
        assert!(!type_assignable(&expected, &Type::string()));
    }

    #[test]
    fn containers_are_covariant() {
        let expected = Type::array(Type::nullable(Type::int(IntegerKind::I64)));
        assert!(type_assignable(
            &Type::array(Type::int(IntegerKind::I32)),
            &expected
        ));
        assert!(!type_assignable(&Type::array(Type::string()), &expected));
        assert_eq!(
            literal_mismatch(&Type::array(literal(-1)), &Type::array(Type::int(IntegerKind::U16)))
                .as_deref(),
            Some("literal -1 does not fit in u16")
        );
    }

    #[test]
    fn unknown_is_silent() {
        assert!(type_assignable(&Type::Unknown, &Type::string()));
        assert!(type_assignable(&Type::bool(), &Type::Unknown));
    }
}
