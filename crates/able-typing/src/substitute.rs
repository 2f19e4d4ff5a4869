use rustc_hash::FxHashMap;

use crate::types::{
    AliasType, ConstraintObligation, FunctionType, GenericParamSpec, InterfaceRef, Type,
    UnionType, WhereConstraint,
};

pub type Bindings = FxHashMap<String, Type>;

/// Pairs generic parameters with arguments; missing arguments become `Unknown`.
pub fn bind_params(params: &[GenericParamSpec], args: &[Type]) -> Bindings {
    params
        .iter()
        .enumerate()
        .map(|(idx, param)| {
            (
                param.name.clone(),
                args.get(idx).cloned().unwrap_or(Type::Unknown),
            )
        })
        .collect()
}

pub fn substitute(ty: &Type, bindings: &Bindings) -> Type {
    if bindings.is_empty() {
        return ty.clone();
    }
    match ty {
        Type::TypeParameter(name) => bindings.get(name).cloned().unwrap_or_else(|| ty.clone()),
        Type::StructInstance { name, args } => Type::StructInstance {
            name: name.clone(),
            args: substitute_all(args, bindings),
        },
        Type::Interface(iface) => Type::Interface(substitute_interface(iface, bindings)),
        Type::Union(union) => Type::Union(UnionType {
            name: union.name.clone(),
            type_params: union.type_params.clone(),
            variants: substitute_all(&union.variants, bindings),
        }),
        Type::Array(inner) => Type::Array(Box::new(substitute(inner, bindings))),
        Type::Map(key, value) => Type::Map(
            Box::new(substitute(key, bindings)),
            Box::new(substitute(value, bindings)),
        ),
        Type::Range(inner) => Type::Range(Box::new(substitute(inner, bindings))),
        Type::Iterator(inner) => Type::Iterator(Box::new(substitute(inner, bindings))),
        Type::Nullable(inner) => Type::nullable(substitute(inner, bindings)),
        Type::Proc(inner) => Type::Proc(Box::new(substitute(inner, bindings))),
        Type::Future(inner) => Type::Future(Box::new(substitute(inner, bindings))),
        Type::Function(func) => Type::Function(substitute_function(func, bindings)),
        Type::Alias(alias) => {
            let shadowed = without_params(bindings, &alias.type_params);
            Type::Alias(AliasType {
                name: alias.name.clone(),
                type_params: alias.type_params.clone(),
                target: Box::new(substitute(&alias.target, &shadowed)),
                where_clause: alias.where_clause.clone(),
            })
        }
        Type::Applied { base, args } => Type::Applied {
            base: base.clone(),
            args: substitute_all(args, bindings),
        },
        Type::Overloads(funcs) => Type::Overloads(
            funcs
                .iter()
                .map(|func| substitute_function(func, bindings))
                .collect(),
        ),
        _ => ty.clone(),
    }
}

fn substitute_all(types: &[Type], bindings: &Bindings) -> Vec<Type> {
    types.iter().map(|ty| substitute(ty, bindings)).collect()
}

fn without_params(bindings: &Bindings, params: &[GenericParamSpec]) -> Bindings {
    let mut filtered = bindings.clone();
    for param in params {
        filtered.remove(&param.name);
    }
    filtered
}

pub fn substitute_interface(iface: &InterfaceRef, bindings: &Bindings) -> InterfaceRef {
    InterfaceRef {
        name: iface.name.clone(),
        args: substitute_all(&iface.args, bindings),
    }
}

/// Substitutes a signature; type parameters that receive a binding are dropped from its
/// generic list.
pub fn substitute_function(func: &FunctionType, bindings: &Bindings) -> FunctionType {
    if bindings.is_empty() {
        return func.clone();
    }
    FunctionType {
        params: substitute_all(&func.params, bindings),
        ret: Box::new(substitute(&func.ret, bindings)),
        type_params: func
            .type_params
            .iter()
            .filter(|param| !bindings.contains_key(&param.name))
            .map(|param| GenericParamSpec {
                name: param.name.clone(),
                constraints: param
                    .constraints
                    .iter()
                    .map(|constraint| substitute_interface(constraint, bindings))
                    .collect(),
            })
            .collect(),
        where_clause: func
            .where_clause
            .iter()
            .map(|clause| WhereConstraint {
                type_param: clause.type_param.clone(),
                constraints: clause
                    .constraints
                    .iter()
                    .map(|constraint| substitute_interface(constraint, bindings))
                    .collect(),
            })
            .collect(),
        obligations: substitute_obligations(&func.obligations, bindings),
    }
}

pub fn substitute_obligations(
    obligations: &[ConstraintObligation],
    bindings: &Bindings,
) -> Vec<ConstraintObligation> {
    obligations
        .iter()
        .map(|obligation| ConstraintObligation {
            constraint: substitute_interface(&obligation.constraint, bindings),
            subject: substitute(&obligation.subject, bindings),
            ..obligation.clone()
        })
        .collect()
}

/// Infers bindings for `params` by walking `pattern` (a declared type) against `actual`.
///
/// First binding wins; later conflicting evidence is left for assignability checks to report.
pub fn infer_bindings(pattern: &Type, actual: &Type, params: &[String], bindings: &mut Bindings) {
    if actual.is_unknown() {
        return;
    }
    match (pattern, actual) {
        (Type::TypeParameter(name), _) if params.iter().any(|param| param == name) => {
            if !bindings.contains_key(name) {
                bindings.insert(name.clone(), widen_literal(actual));
            }
        }
        (Type::Array(p), Type::Array(a))
        | (Type::Range(p), Type::Range(a))
        | (Type::Iterator(p), Type::Iterator(a))
        | (Type::Proc(p), Type::Proc(a))
        | (Type::Future(p), Type::Future(a)) => infer_bindings(p, a, params, bindings),
        (Type::Nullable(p), Type::Nullable(a)) => infer_bindings(p, a, params, bindings),
        (Type::Nullable(p), other) if !other.is_nil() => infer_bindings(p, other, params, bindings),
        (Type::Map(pk, pv), Type::Map(ak, av)) => {
            infer_bindings(pk, ak, params, bindings);
            infer_bindings(pv, av, params, bindings);
        }
        (
            Type::StructInstance { name: pn, args: pa },
            Type::StructInstance { name: an, args: aa },
        ) if pn == an => {
            for (p, a) in pa.iter().zip(aa) {
                infer_bindings(p, a, params, bindings);
            }
        }
        (Type::Interface(p), Type::Interface(a)) if p.name == a.name => {
            for (p, a) in p.args.iter().zip(&a.args) {
                infer_bindings(p, a, params, bindings);
            }
        }
        (Type::Applied { base, args }, actual) => match (base.as_ref(), actual) {
            (Type::Struct(name), Type::StructInstance { name: an, args: aa }) if name == an => {
                for (p, a) in args.iter().zip(aa) {
                    infer_bindings(p, a, params, bindings);
                }
            }
            _ => {
                let resolved = pattern.resolved();
                if !matches!(resolved, Type::Applied { .. }) {
                    infer_bindings(&resolved, actual, params, bindings);
                }
            }
        },
        (Type::Function(p), Type::Function(a)) => {
            for (p, a) in p.params.iter().zip(&a.params) {
                infer_bindings(p, a, params, bindings);
            }
            infer_bindings(&p.ret, &a.ret, params, bindings);
        }
        (Type::Union(p), actual) => {
            // `T | Error` against a plain value binds `T` to the value.
            let open: Vec<&Type> = p
                .variants
                .iter()
                .filter(|variant| matches!(variant, Type::TypeParameter(name) if params.contains(name)))
                .collect();
            if let (Type::Union(a), true) = (actual, open.is_empty()) {
                for (p, a) in p.variants.iter().zip(&a.variants) {
                    infer_bindings(p, a, params, bindings);
                }
            } else if open.len() == 1 {
                infer_bindings(open[0], actual, params, bindings);
            }
        }
        _ => {}
    }
}

/// An unsuffixed literal binds a type parameter to its default kind, not to the literal.
fn widen_literal(ty: &Type) -> Type {
    match ty {
        Type::Integer(int) => Type::int(int.kind),
        Type::Float(float) => Type::float(float.kind),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use able_syntax::IntegerKind;

    use super::*;

    #[test]
    fn infers_through_containers() {
        let pattern = Type::Map(Box::new(Type::param("K")), Box::new(Type::array(Type::param("V"))));
        let actual = Type::Map(
            Box::new(Type::string()),
            Box::new(Type::array(Type::int(IntegerKind::U8))),
        );
        let mut bindings = Bindings::default();
        infer_bindings(&pattern, &actual, &["K".into(), "V".into()], &mut bindings);
        assert_eq!(bindings.get("K"), Some(&Type::string()));
        assert_eq!(bindings.get("V"), Some(&Type::int(IntegerKind::U8)));
    }

    #[test]
    fn substitution_drops_bound_type_params() {
        let mut func = FunctionType::new(vec![Type::param("T")], Type::array(Type::param("T")));
        func.type_params = vec![GenericParamSpec::unconstrained("T")];
        let mut bindings = Bindings::default();
        bindings.insert("T".into(), Type::bool());
        let inst = substitute_function(&func, &bindings);
        assert!(inst.type_params.is_empty());
        assert_eq!(*inst.ret, Type::array(Type::bool()));
    }
}
