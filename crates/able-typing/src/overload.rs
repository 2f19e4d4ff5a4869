//! Scoring and ranking of same-name call candidates.
//!
//! Resolution is a pure function of the candidate list, the argument types and any explicit
//! type arguments. Interface-shaped parameters consult an [`ImplementationOracle`] so the
//! engine can be exercised without a full checker.

use std::cmp::Ordering;

use crate::assignable::{literal_mismatch, type_assignable};
use crate::substitute::{Bindings, bind_params, infer_bindings, substitute_function};
use crate::types::{FunctionType, InterfaceRef, Type};

/// Answers "does `ty` implement `interface`" for interface-typed parameters.
pub trait ImplementationOracle {
    fn implements(&self, ty: &Type, interface: &InterfaceRef) -> bool;
}

/// An oracle that knows no implementations.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImplementations;

impl ImplementationOracle for NoImplementations {
    fn implements(&self, _ty: &Type, _interface: &InterfaceRef) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverloadCandidate {
    pub signature: FunctionType,
}

impl From<FunctionType> for OverloadCandidate {
    fn from(signature: FunctionType) -> Self {
        Self { signature }
    }
}

/// A candidate with its generics bound against one call site.
#[derive(Debug, Clone)]
pub struct Instantiation {
    /// Position of the candidate in the list handed to the resolver.
    pub index: usize,
    pub signature: FunctionType,
    pub bindings: Bindings,
    /// Bound type arguments in declaration order of the candidate's type parameters.
    pub type_args: Vec<Type>,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub enum OverloadOutcome {
    Resolved(Instantiation),
    /// Too few arguments for every candidate; `remaining` is the type of the partial application.
    Partial {
        chosen: Instantiation,
        remaining: FunctionType,
    },
    /// Indices of the candidates sharing the best rank.
    Ambiguous(Vec<usize>),
    NoMatch,
}

/// Binds a signature's type parameters from explicit type arguments, or infers them from the
/// argument types. Parameters left without evidence become `Unknown`.
pub fn instantiate(signature: &FunctionType, type_args: &[Type], args: &[Type]) -> Instantiation {
    if !signature.is_generic() {
        return Instantiation {
            index: 0,
            signature: signature.clone(),
            bindings: Bindings::default(),
            type_args: Vec::new(),
            score: 0.0,
        };
    }
    let mut bindings = if type_args.is_empty() {
        let names: Vec<String> = signature
            .type_params
            .iter()
            .map(|param| param.name.clone())
            .collect();
        let mut inferred = Bindings::default();
        for (param, arg) in signature.params.iter().zip(args) {
            infer_bindings(param, arg, &names, &mut inferred);
        }
        inferred
    } else {
        bind_params(&signature.type_params, type_args)
    };
    for param in &signature.type_params {
        bindings.entry(param.name.clone()).or_insert(Type::Unknown);
    }
    let type_args = signature
        .type_params
        .iter()
        .map(|param| bindings.get(&param.name).cloned().unwrap_or_default())
        .collect();
    Instantiation {
        index: 0,
        signature: substitute_function(signature, &bindings),
        bindings,
        type_args,
        score: 0.0,
    }
}

/// The interface named by a parameter type, looking through generic application.
pub fn interface_of(ty: &Type) -> Option<InterfaceRef> {
    match ty {
        Type::Interface(iface) => Some(iface.clone()),
        Type::Applied { .. } | Type::Alias(_) => match ty.resolved() {
            Type::Interface(iface) => Some(iface),
            _ => None,
        },
        _ => None,
    }
}

/// Whether an argument may be passed for a parameter, counting interface implementations.
pub fn argument_matches(actual: &Type, expected: &Type, oracle: &impl ImplementationOracle) -> bool {
    if type_assignable(actual, expected) {
        return true;
    }
    satisfies_interface_param(actual, expected, oracle)
}

fn satisfies_interface_param(
    actual: &Type,
    expected: &Type,
    oracle: &impl ImplementationOracle,
) -> bool {
    let target = match expected {
        Type::Nullable(inner) => inner.as_ref(),
        other => other,
    };
    interface_of(target).is_some_and(|iface| oracle.implements(actual, &iface))
}

/// Sums per-argument compatibility: 2 for a direct match, 1 through a nullable slot or an
/// interface implementation. `None` rejects the candidate.
pub fn score_arguments(
    params: &[Type],
    args: &[Type],
    allow_unknown: bool,
    oracle: &impl ImplementationOracle,
) -> Option<f64> {
    let mut score = 0.0;
    for (expected, actual) in params.iter().zip(args) {
        if expected.is_unknown() || actual.is_unknown() {
            continue;
        }
        if !allow_unknown && actual.contains_unknown() && !expected.contains_unknown() {
            return None;
        }
        if literal_mismatch(actual, expected).is_some() {
            return None;
        }
        if !type_assignable(actual, expected) {
            if satisfies_interface_param(actual, expected, oracle) {
                score += 1.0;
                continue;
            }
            return None;
        }
        score += if matches!(expected, Type::Nullable(_)) {
            1.0
        } else {
            2.0
        };
    }
    Some(score)
}

/// Structural weight: type parameters count 0, every concrete constructor 1 plus its arguments.
pub fn specificity(ty: &Type) -> u32 {
    match ty {
        Type::Unknown | Type::TypeParameter(_) | Type::Overloads(_) => 0,
        Type::StructInstance { args, .. } => 1 + args.iter().map(specificity).sum::<u32>(),
        Type::Interface(_)
        | Type::Primitive(_)
        | Type::Integer(_)
        | Type::Float(_)
        | Type::Struct(_)
        | Type::Union(_)
        | Type::Package(_)
        | Type::ImplementationNamespace(_) => 1,
        Type::Alias(alias) => 1 + specificity(&alias.target),
        Type::Applied { base, args } => {
            1 + specificity(base) + args.iter().map(specificity).sum::<u32>()
        }
        Type::Array(inner)
        | Type::Range(inner)
        | Type::Iterator(inner)
        | Type::Nullable(inner)
        | Type::Proc(inner)
        | Type::Future(inner) => 1 + specificity(inner),
        Type::Map(key, value) => 1 + specificity(key) + specificity(value),
        Type::Function(func) => {
            1 + specificity(&func.ret) + func.params.iter().map(specificity).sum::<u32>()
        }
    }
}

fn arity_matches(params: usize, args: usize, optional_last: bool) -> bool {
    params == args || (optional_last && args + 1 == params)
}

struct Ranked {
    inst: Instantiation,
    generic: bool,
    specificity: u32,
}

fn compare(a: &Ranked, b: &Ranked) -> Ordering {
    const EPSILON: f64 = 1e-9;
    if a.inst.score > b.inst.score + EPSILON {
        return Ordering::Greater;
    }
    if b.inst.score > a.inst.score + EPSILON {
        return Ordering::Less;
    }
    match (a.generic, b.generic) {
        (false, true) => Ordering::Greater,
        (true, false) => Ordering::Less,
        (true, true) => a.specificity.cmp(&b.specificity),
        (false, false) => Ordering::Equal,
    }
}

pub fn resolve_overload(
    candidates: &[OverloadCandidate],
    args: &[Type],
    oracle: &impl ImplementationOracle,
) -> OverloadOutcome {
    resolve_overload_with_type_args(candidates, &[], args, oracle)
}

pub fn resolve_overload_with_type_args(
    candidates: &[OverloadCandidate],
    type_args: &[Type],
    args: &[Type],
    oracle: &impl ImplementationOracle,
) -> OverloadOutcome {
    let allow_unknown = candidates.len() <= 1;
    let mut ranked: Vec<Ranked> = Vec::new();
    for (index, candidate) in candidates.iter().enumerate() {
        let signature = &candidate.signature;
        if !type_args.is_empty() && signature.type_params.len() != type_args.len() {
            continue;
        }
        let mut inst = instantiate(signature, type_args, args);
        inst.index = index;
        let optional_last = inst.signature.has_optional_last();
        let param_count = inst.signature.params.len();
        if !arity_matches(param_count, args.len(), optional_last) {
            continue;
        }
        let considered = &inst.signature.params[..args.len().min(param_count)];
        let Some(mut score) = score_arguments(considered, args, allow_unknown, oracle) else {
            continue;
        };
        if args.len() < param_count {
            score -= 0.5;
        }
        inst.score = score;
        let generic = signature.is_generic();
        let specificity = if generic {
            signature.params[..args.len().min(signature.params.len())]
                .iter()
                .map(specificity)
                .sum()
        } else {
            0
        };
        ranked.push(Ranked {
            inst,
            generic,
            specificity,
        });
    }

    if !ranked.is_empty() {
        let mut best = 0;
        for idx in 1..ranked.len() {
            if compare(&ranked[idx], &ranked[best]) == Ordering::Greater {
                best = idx;
            }
        }
        let tied: Vec<usize> = ranked
            .iter()
            .filter(|other| compare(other, &ranked[best]) == Ordering::Equal)
            .map(|other| other.inst.index)
            .collect();
        if tied.len() > 1 {
            tracing::debug!(candidates = ?tied, "ambiguous overload");
            return OverloadOutcome::Ambiguous(tied);
        }
        let winner = ranked.swap_remove(best);
        tracing::trace!(index = winner.inst.index, score = winner.inst.score, "overload selected");
        return OverloadOutcome::Resolved(winner.inst);
    }

    match select_partial(candidates, type_args, args, allow_unknown, oracle) {
        Some(chosen) => {
            let remaining = FunctionType::new(
                chosen.signature.params[args.len()..].to_vec(),
                (*chosen.signature.ret).clone(),
            );
            OverloadOutcome::Partial { chosen, remaining }
        }
        None => OverloadOutcome::NoMatch,
    }
}

/// Among candidates needing more arguments than supplied, the one with the fewest remaining
/// parameters whose supplied prefix still scores.
fn select_partial(
    candidates: &[OverloadCandidate],
    type_args: &[Type],
    args: &[Type],
    allow_unknown: bool,
    oracle: &impl ImplementationOracle,
) -> Option<Instantiation> {
    let mut best: Option<Instantiation> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let signature = &candidate.signature;
        if !type_args.is_empty() && signature.type_params.len() != type_args.len() {
            continue;
        }
        let mut inst = instantiate(signature, type_args, args);
        inst.index = index;
        let params = &inst.signature.params;
        let min_args = if inst.signature.has_optional_last() {
            params.len().saturating_sub(1)
        } else {
            params.len()
        };
        if args.len() >= min_args {
            continue;
        }
        let Some(score) = score_arguments(&params[..args.len()], args, allow_unknown, oracle)
        else {
            continue;
        };
        inst.score = score;
        let remaining = params.len() - args.len();
        let better = match &best {
            None => true,
            Some(current) => {
                let current_remaining = current.signature.params.len() - args.len();
                remaining < current_remaining
                    || (remaining == current_remaining && score > current.score)
            }
        };
        if better {
            best = Some(inst);
        }
    }
    best
}
