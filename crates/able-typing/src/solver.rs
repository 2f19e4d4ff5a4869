//! Deferred constraint obligations and implementation lookup.

use std::collections::BTreeSet;

use able_base::{Diagnostic, NodeId};

use crate::assignable::{signature_types_equivalent, signatures_equivalent};
use crate::env::Environment;
use crate::overload::ImplementationOracle;
use crate::substitute::{
    Bindings, infer_bindings, substitute, substitute_function, substitute_obligations,
};
use crate::types::{
    ConstraintObligation, FunctionType, GenericParamSpec, ImplementationSpec, InterfaceRef,
    MethodSetSpec, PrimitiveKind, SELF_TYPE, Type, WhereConstraint,
};

const MAX_DEPTH: usize = 12;

/// Obligations for every constrained type parameter of `signature` bound in `bindings`.
pub fn obligations_for_call(
    signature: &FunctionType,
    bindings: &Bindings,
    owner: &str,
    node: NodeId,
) -> Vec<ConstraintObligation> {
    let mut obligations = Vec::new();
    let constrained = signature
        .type_params
        .iter()
        .map(|param| (&param.name, &param.constraints))
        .chain(
            signature
                .where_clause
                .iter()
                .map(|clause| (&clause.type_param, &clause.constraints)),
        );
    for (param, constraints) in constrained {
        let Some(subject) = bindings.get(param) else {
            continue;
        };
        for constraint in constraints {
            obligations.push(ConstraintObligation {
                owner: owner.to_string(),
                type_param: param.clone(),
                constraint: crate::substitute::substitute_interface(constraint, bindings),
                subject: subject.clone(),
                context: String::new(),
                node,
            });
        }
    }
    for obligation in substitute_obligations(&signature.obligations, bindings) {
        obligations.push(ConstraintObligation {
            node: if obligation.node.is_dummy() {
                node
            } else {
                obligation.node
            },
            ..obligation
        });
    }
    obligations
}

/// Obligations recording the constraints of generic parameters and where clauses, with the
/// parameter itself as subject. They are substituted when the owner is instantiated.
pub fn deferred_obligations(
    params: &[GenericParamSpec],
    where_clause: &[WhereConstraint],
    owner: &str,
    context: &str,
    node: NodeId,
) -> Vec<ConstraintObligation> {
    let constrained = params
        .iter()
        .map(|param| (&param.name, &param.constraints))
        .chain(
            where_clause
                .iter()
                .map(|clause| (&clause.type_param, &clause.constraints)),
        );
    let mut obligations = Vec::new();
    for (param, constraints) in constrained {
        for constraint in constraints {
            obligations.push(ConstraintObligation {
                owner: owner.to_string(),
                type_param: param.clone(),
                constraint: constraint.clone(),
                subject: Type::param(param.clone()),
                context: context.to_string(),
                node,
            });
        }
    }
    obligations
}

/// Result of matching a receiver type against a declared implementation or method-set target.
#[derive(Debug, Clone, Default)]
pub struct TargetMatch {
    pub bindings: Bindings,
    /// Number of type parameters bound to concrete types.
    pub score: u32,
}

fn nominal_parts(ty: &Type) -> Option<(String, Vec<Type>)> {
    match ty {
        Type::Struct(name) => Some((name.clone(), Vec::new())),
        Type::StructInstance { name, args } => Some((name.clone(), args.clone())),
        Type::Interface(iface) => Some((iface.name.clone(), iface.args.clone())),
        Type::Union(union) => union.name.clone().map(|name| (name, Vec::new())),
        Type::Array(element) => Some(("Array".to_string(), vec![(**element).clone()])),
        Type::Map(key, value) => Some((
            "Map".to_string(),
            vec![(**key).clone(), (**value).clone()],
        )),
        Type::Range(element) => Some(("Range".to_string(), vec![(**element).clone()])),
        Type::Iterator(element) => Some(("Iterator".to_string(), vec![(**element).clone()])),
        Type::Applied { base, args } => {
            nominal_parts(base).map(|(name, _)| (name, args.clone()))
        }
        Type::Alias(_) => nominal_parts(&ty.resolved()),
        _ => None,
    }
}

fn match_argument(actual: &Type, pattern: &Type, bindings: &mut Bindings) -> Option<u32> {
    if pattern.is_unknown() || actual.is_unknown() {
        return Some(0);
    }
    match pattern {
        Type::TypeParameter(name) => {
            if let Some(existing) = bindings.get(name) {
                return signature_types_equivalent(existing, actual).then_some(0);
            }
            bindings.insert(name.clone(), actual.clone());
            Some(1)
        }
        Type::Nullable(inner) => match actual {
            Type::Nullable(actual_inner) => match_argument(actual_inner, inner, bindings),
            _ => None,
        },
        _ => {
            if let (Some((pn, pa)), Some((an, aa))) = (nominal_parts(pattern), nominal_parts(actual))
            {
                if pn != an {
                    return None;
                }
                let mut score = 0;
                for (idx, pattern_arg) in pa.iter().enumerate() {
                    let actual_arg = aa.get(idx).cloned().unwrap_or_default();
                    score += match_argument(&actual_arg, pattern_arg, bindings)?;
                }
                return Some(score);
            }
            signature_types_equivalent(actual, pattern).then_some(0)
        }
    }
}

/// Matches `subject` against a declared `target`, binding the declaration's type parameters.
pub fn match_target(subject: &Type, target: &Type, params: &[GenericParamSpec]) -> Option<TargetMatch> {
    let mut bindings = Bindings::default();
    let score = match (subject, target) {
        (Type::Integer(a), Type::Integer(b)) => (a.kind == b.kind).then_some(0)?,
        (Type::Float(a), Type::Float(b)) => (a.kind == b.kind).then_some(0)?,
        (Type::Primitive(a), Type::Primitive(b)) => (a == b).then_some(0)?,
        (_, Type::Union(union)) if union.name.is_none() => {
            let Type::Union(subject_union) = subject else {
                return None;
            };
            let same = subject_union.variants.len() == union.variants.len()
                && union.variants.iter().all(|variant| {
                    subject_union
                        .variants
                        .iter()
                        .any(|candidate| signature_types_equivalent(candidate, variant))
                });
            same.then_some(0)?
        }
        _ => match_argument(subject, target, &mut bindings)?,
    };
    for param in params {
        bindings.entry(param.name.clone()).or_insert(Type::Unknown);
    }
    Some(TargetMatch { bindings, score })
}

pub(crate) fn uses_type_params(ty: &Type) -> bool {
    match ty {
        Type::TypeParameter(_) => true,
        Type::StructInstance { args, .. } | Type::Applied { args, .. } => {
            args.iter().any(uses_type_params)
        }
        Type::Interface(iface) => iface.args.iter().any(uses_type_params),
        Type::Array(inner)
        | Type::Range(inner)
        | Type::Iterator(inner)
        | Type::Nullable(inner)
        | Type::Proc(inner)
        | Type::Future(inner) => uses_type_params(inner),
        Type::Map(key, value) => uses_type_params(key) || uses_type_params(value),
        Type::Union(union) => union.variants.iter().any(uses_type_params),
        Type::Function(func) => {
            func.params.iter().any(uses_type_params) || uses_type_params(&func.ret)
        }
        Type::Alias(alias) => uses_type_params(&alias.target),
        _ => false,
    }
}

fn target_specificity(ty: &Type) -> u32 {
    match ty {
        Type::Struct(_) | Type::Primitive(_) | Type::Integer(_) | Type::Float(_) => 1,
        Type::StructInstance { args, .. } => 1 + args.iter().map(target_specificity).sum::<u32>(),
        Type::Applied { base, args } => {
            target_specificity(base) + args.iter().map(target_specificity).sum::<u32>()
        }
        Type::Array(inner) | Type::Range(inner) | Type::Iterator(inner) => {
            1 + target_specificity(inner)
        }
        Type::Map(key, value) => 1 + target_specificity(key) + target_specificity(value),
        Type::Nullable(inner) => target_specificity(inner),
        Type::Union(union) if union.name.is_none() => {
            union.variants.iter().map(target_specificity).sum()
        }
        Type::Union(_) | Type::Interface(_) => 1,
        _ => 0,
    }
}

fn interface_label(iface: &InterfaceRef) -> String {
    Type::Interface(iface.clone()).to_string()
}

/// Unbound or unknown arguments on either side are compatible.
fn interface_args_compatible(actual: &[Type], expected: &[Type]) -> bool {
    if expected.is_empty() {
        return true;
    }
    actual.len() == expected.len()
        && actual.iter().zip(expected).all(|(a, e)| {
            a.is_unknown()
                || e.is_unknown()
                || a.is_type_parameter()
                || e.is_type_parameter()
                || signature_types_equivalent(a, e)
        })
}

struct ImplementationMatch<'a> {
    spec: &'a ImplementationSpec,
    bindings: Bindings,
    concrete: bool,
    constraint_keys: BTreeSet<String>,
    specificity: u32,
}

fn constraint_keys(spec: &ImplementationSpec) -> BTreeSet<String> {
    spec.obligations
        .iter()
        .map(|ob| format!("{}->{}", ob.type_param, interface_label(&ob.constraint)))
        .collect()
}

fn is_strict_superset(a: &BTreeSet<String>, b: &BTreeSet<String>) -> bool {
    !a.is_empty() && a.len() > b.len() && b.is_subset(a)
}

fn compare_matches(a: &ImplementationMatch<'_>, b: &ImplementationMatch<'_>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    if a.concrete != b.concrete {
        return if a.concrete {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if is_strict_superset(&a.constraint_keys, &b.constraint_keys) {
        return Ordering::Greater;
    }
    if is_strict_superset(&b.constraint_keys, &a.constraint_keys) {
        return Ordering::Less;
    }
    a.specificity.cmp(&b.specificity)
}

/// Outcome of looking up the implementation of an interface for a concrete type.
#[derive(Debug)]
pub enum ImplementationLookup<'a> {
    Found {
        spec: &'a ImplementationSpec,
        bindings: Bindings,
    },
    /// Several equally specific implementations apply; carries the rendered detail.
    Ambiguous(String),
    /// Nothing applies; the detail explains the closest miss when there is one.
    Missing(String),
}

/// Implementation methods found for a receiver.
#[derive(Debug, Default)]
pub struct MethodLookup<'a> {
    pub found: Vec<(&'a ImplementationSpec, FunctionType)>,
    pub ambiguities: Vec<String>,
}

/// Read-only view over the implementations and method sets visible to a module.
pub struct Solver<'a> {
    implementations: &'a [ImplementationSpec],
    method_sets: &'a [MethodSetSpec],
    env: &'a Environment,
}

impl<'a> Solver<'a> {
    pub fn new(
        implementations: &'a [ImplementationSpec],
        method_sets: &'a [MethodSetSpec],
        env: &'a Environment,
    ) -> Self {
        Self {
            implementations,
            method_sets,
            env,
        }
    }

    /// Diagnostics for every obligation that cannot be proven.
    pub fn evaluate_all(&self, obligations: &[ConstraintObligation]) -> Vec<Diagnostic> {
        // A method-level obligation already covers the method set it came from.
        let method_owners: BTreeSet<&str> = obligations
            .iter()
            .filter_map(|ob| ob.owner.strip_prefix("methods for "))
            .filter_map(|label| label.split_once("::").map(|(target, _)| target))
            .collect();
        obligations
            .iter()
            .filter(|ob| {
                let set_level = ob
                    .owner
                    .strip_prefix("methods for ")
                    .filter(|label| !label.contains("::") && ob.context == "via method set");
                !set_level.is_some_and(|label| method_owners.contains(label))
            })
            .filter_map(|ob| self.evaluate(ob))
            .collect()
    }

    pub fn evaluate(&self, ob: &ConstraintObligation) -> Option<Diagnostic> {
        let context = if ob.context.is_empty()
            || (ob.context == "via method set" && ob.owner.starts_with("methods for "))
        {
            String::new()
        } else {
            format!(" ({})", ob.context)
        };
        let prefix = format!("{} constraint on {}{}", ob.owner, ob.type_param, context);
        let Some(info) = self.env.lookup_interface(&ob.constraint.name) else {
            return Some(Diagnostic::error(
                ob.node,
                format!(
                    "{prefix} references unknown interface '{}'",
                    ob.constraint.name
                ),
            ));
        };
        let expected = info.type_params.len();
        let provided = ob.constraint.args.len();
        if expected > 0 && provided == 0 {
            return Some(Diagnostic::error(
                ob.node,
                format!(
                    "{prefix} requires {expected} type argument(s) for interface '{}'",
                    info.name
                ),
            ));
        }
        if provided != 0 && expected != provided {
            return Some(Diagnostic::error(
                ob.node,
                format!(
                    "{prefix} expected {expected} type argument(s) for interface '{}', got {provided}",
                    info.name
                ),
            ));
        }
        if ob.subject.is_unknown() || ob.subject.is_type_parameter() {
            return None;
        }
        match self.type_implements(&ob.subject, &ob.constraint, 0) {
            Ok(()) => {
                tracing::trace!(owner = %ob.owner, subject = %ob.subject, "obligation satisfied");
                None
            }
            Err(detail) => {
                let reason = if detail.is_empty() {
                    String::new()
                } else {
                    format!(": {detail}")
                };
                tracing::debug!(owner = %ob.owner, subject = %ob.subject, "obligation failed");
                Some(Diagnostic::error(
                    ob.node,
                    format!(
                        "{prefix} is not satisfied: {} does not implement {}{reason}",
                        ob.subject,
                        interface_label(&ob.constraint)
                    ),
                ))
            }
        }
    }

    /// `Err` carries a detail message, possibly empty.
    pub fn type_implements(
        &self,
        subject: &Type,
        iface: &InterfaceRef,
        depth: usize,
    ) -> Result<(), String> {
        if depth > MAX_DEPTH || subject.is_unknown() || subject.is_type_parameter() {
            return Ok(());
        }
        if implements_intrinsic(subject, &iface.name) {
            return Ok(());
        }
        match subject {
            Type::Alias(_) | Type::Applied { .. } => {
                let resolved = subject.resolved();
                if &resolved != subject {
                    return self.type_implements(&resolved, iface, depth + 1);
                }
            }
            Type::Nullable(inner) => {
                let direct = self.implementation_provides(subject, iface, depth);
                if matches!(direct, ImplementationLookup::Found { .. }) {
                    return Ok(());
                }
                return self.type_implements(inner, iface, depth + 1).map_err(|detail| {
                    if detail.is_empty() {
                        lookup_detail(direct)
                    } else {
                        detail
                    }
                });
            }
            Type::Union(union) if union.name.is_none() => {
                let direct = self.implementation_provides(subject, iface, depth);
                if matches!(direct, ImplementationLookup::Found { .. }) {
                    return Ok(());
                }
                for member in &union.variants {
                    self.type_implements(member, iface, depth + 1)?;
                }
                return Ok(());
            }
            Type::Interface(own) if own.name == iface.name => {
                return if interface_args_compatible(&own.args, &iface.args) {
                    Ok(())
                } else {
                    Err(String::new())
                };
            }
            _ => {}
        }
        let implementation_detail = match self.implementation_provides(subject, iface, depth) {
            ImplementationLookup::Found { .. } => return Ok(()),
            ImplementationLookup::Ambiguous(detail) => return Err(detail),
            ImplementationLookup::Missing(detail) => detail,
        };
        match self.method_set_provides(subject, iface, depth) {
            Ok(()) => Ok(()),
            Err(detail) if !detail.is_empty() => Err(detail),
            Err(_) => Err(implementation_detail),
        }
    }

    /// The unnamed implementation of `iface` for `subject`, choosing the most specific one.
    pub fn implementation_provides(
        &self,
        subject: &Type,
        iface: &InterfaceRef,
        depth: usize,
    ) -> ImplementationLookup<'a> {
        let mut matches: Vec<ImplementationMatch<'a>> = Vec::new();
        let mut best_detail = String::new();
        for spec in self.implementations {
            if spec.impl_name.is_some() || spec.interface != iface.name {
                continue;
            }
            let Some(target_match) = match_target(subject, &spec.target, &spec.type_params) else {
                continue;
            };
            let mut bindings = target_match.bindings;
            bindings.retain(|_, bound| !bound.is_unknown());
            let names: Vec<String> = spec.type_params.iter().map(|p| p.name.clone()).collect();
            for (pattern, actual) in spec.interface_args.iter().zip(&iface.args) {
                infer_bindings(pattern, actual, &names, &mut bindings);
            }
            for name in &names {
                bindings.entry(name.clone()).or_insert(Type::Unknown);
            }
            bindings.insert(SELF_TYPE.to_string(), subject.clone());
            let actual_args: Vec<Type> = spec
                .interface_args
                .iter()
                .map(|arg| substitute(arg, &bindings))
                .collect();
            let label = candidate_label(spec, &bindings, &actual_args);
            if !interface_args_compatible(&actual_args, &iface.args) {
                let detail = format!(
                    "{label}: interface arguments do not match expected {}",
                    interface_label(iface)
                );
                if detail.len() > best_detail.len() {
                    best_detail = detail;
                }
                continue;
            }
            if !spec.obligations.is_empty() {
                let obligations = substitute_obligations(&spec.obligations, &bindings);
                if let Err((detail, _)) = self.obligations_satisfied(&obligations, depth + 1) {
                    let annotated = if detail.starts_with(&label) {
                        detail
                    } else {
                        format!("{label}: {detail}")
                    };
                    if annotated.len() > best_detail.len() {
                        best_detail = annotated;
                    }
                    continue;
                }
            }
            matches.push(ImplementationMatch {
                spec,
                bindings,
                concrete: !uses_type_params(&spec.target),
                constraint_keys: constraint_keys(spec),
                specificity: target_specificity(&spec.target),
            });
        }
        if matches.is_empty() {
            return ImplementationLookup::Missing(best_detail);
        }
        let mut best = 0;
        for idx in 1..matches.len() {
            if compare_matches(&matches[idx], &matches[best]).is_gt() {
                best = idx;
            }
        }
        let contenders: Vec<&ImplementationMatch<'a>> = matches
            .iter()
            .filter(|candidate| compare_matches(candidate, &matches[best]).is_eq())
            .collect();
        if contenders.len() > 1 {
            let labels: BTreeSet<String> = contenders
                .iter()
                .map(|candidate| {
                    format!(
                        "impl {} for {}",
                        candidate.spec.interface,
                        substitute(&candidate.spec.target, &candidate.bindings)
                    )
                })
                .collect();
            let listed: Vec<String> = labels.into_iter().collect();
            return ImplementationLookup::Ambiguous(format!(
                "ambiguous implementations of {} for {}: {}",
                iface.name,
                subject,
                listed.join(", ")
            ));
        }
        let winner = matches.swap_remove(best);
        ImplementationLookup::Found {
            spec: winner.spec,
            bindings: winner.bindings,
        }
    }

    /// An inherent method set on `subject` that structurally provides every interface method.
    fn method_set_provides(
        &self,
        subject: &Type,
        iface: &InterfaceRef,
        depth: usize,
    ) -> Result<(), String> {
        let Some(info) = self.env.lookup_interface(&iface.name) else {
            return Err(String::new());
        };
        let mut best_detail = String::new();
        let mut best_score: Option<u32> = None;
        for spec in self.method_sets {
            let Some(target_match) = match_target(subject, &spec.target, &spec.type_params) else {
                continue;
            };
            let label = format!(
                "methods for {}",
                substitute(&spec.target, &target_match.bindings)
            );
            let mut combined = target_match.bindings.clone();
            combined.insert(SELF_TYPE.to_string(), subject.clone());
            let mut interface_bindings = Bindings::default();
            interface_bindings.insert(SELF_TYPE.to_string(), subject.clone());
            for (idx, param) in info.type_params.iter().enumerate() {
                let replacement = iface
                    .args
                    .get(idx)
                    .filter(|arg| !arg.is_unknown())
                    .cloned()
                    .unwrap_or_else(|| Type::param(param.name.clone()));
                if !replacement.is_type_parameter() {
                    combined.insert(param.name.clone(), replacement.clone());
                }
                interface_bindings.insert(param.name.clone(), replacement);
            }

            let mut failure: Option<String> = None;
            let mut obligations = Vec::new();
            if spec.methods.is_empty() || info.methods.is_empty() {
                failure = Some("method set is empty".to_string());
            }
            for (name, interface_method) in &info.methods {
                if failure.is_some() {
                    break;
                }
                let expected = substitute_function(interface_method, &interface_bindings);
                let Some(actual) = spec.methods.get(name) else {
                    failure = Some(format!("method '{name}' not provided"));
                    break;
                };
                let actual = substitute_function(actual, &combined);
                if !signatures_equivalent(&expected, &actual) {
                    failure = Some(format!(
                        "method '{name}' signature does not satisfy interface"
                    ));
                    break;
                }
                for mut obligation in substitute_obligations(&actual.obligations, &combined) {
                    obligation.context = format!("via method '{name}'");
                    obligations.push(obligation);
                }
            }
            if failure.is_none() {
                for mut obligation in substitute_obligations(&spec.obligations, &combined) {
                    if obligation.context.is_empty() {
                        obligation.context = "via method set".to_string();
                    }
                    obligations.push(obligation);
                }
                match self.obligations_satisfied(&obligations, depth + 1) {
                    Ok(()) => return Ok(()),
                    Err((detail, ob)) => {
                        let owner = if ob.owner.is_empty() {
                            label.clone()
                        } else {
                            ob.owner.clone()
                        };
                        failure = Some(if detail.starts_with(&owner) {
                            detail
                        } else {
                            format!("{owner}: {detail}")
                        });
                    }
                }
            } else if let Some(detail) = failure.take() {
                failure = Some(format!("{label}: {detail}"));
            }
            if let Some(detail) = failure {
                let better = match best_score {
                    None => true,
                    Some(score) => {
                        target_match.score > score
                            || (target_match.score == score && detail.len() > best_detail.len())
                    }
                };
                if better {
                    best_score = Some(target_match.score);
                    best_detail = detail;
                }
            }
        }
        Err(best_detail)
    }

    fn obligations_satisfied(
        &self,
        obligations: &[ConstraintObligation],
        depth: usize,
    ) -> Result<(), (String, ConstraintObligation)> {
        for ob in obligations {
            if ob.subject.is_unknown() || ob.subject.is_type_parameter() {
                continue;
            }
            if self.env.lookup_interface(&ob.constraint.name).is_none() {
                let detail = format!("references unknown interface '{}'", ob.constraint.name);
                return Err((with_context(detail, &ob.context), ob.clone()));
            }
            if let Err(detail) = self.type_implements(&ob.subject, &ob.constraint, depth) {
                let detail = if detail.is_empty() {
                    format!(
                        "{} does not implement {}",
                        ob.subject,
                        interface_label(&ob.constraint)
                    )
                } else {
                    detail
                };
                return Err((with_context(detail, &ob.context), ob.clone()));
            }
        }
        Ok(())
    }

    /// Methods named `method` supplied by implementations for `receiver`, with each
    /// implementation's bindings applied. Ambiguous lookups are returned as rendered details.
    pub fn implementation_method(&self, receiver: &Type, method: &str) -> MethodLookup<'a> {
        let mut lookup = MethodLookup::default();
        let mut seen_interfaces: BTreeSet<&str> = BTreeSet::new();
        for spec in self.implementations {
            if spec.impl_name.is_some() || !spec.methods.contains_key(method) {
                continue;
            }
            if !seen_interfaces.insert(spec.interface.as_str()) {
                continue;
            }
            let iface = InterfaceRef::named(spec.interface.clone());
            match self.implementation_provides(receiver, &iface, 0) {
                ImplementationLookup::Found { spec, bindings } => {
                    if let Some(signature) = spec.methods.get(method) {
                        lookup
                            .found
                            .push((spec, substitute_function(signature, &bindings)));
                    }
                }
                ImplementationLookup::Ambiguous(detail) => lookup.ambiguities.push(detail),
                ImplementationLookup::Missing(_) => {}
            }
        }
        lookup
    }

    /// Inherent methods named `method` whose target matches `receiver`.
    pub fn method_set_methods(
        &self,
        receiver: &Type,
        method: &str,
    ) -> Vec<(&'a MethodSetSpec, FunctionType)> {
        let mut found = Vec::new();
        for spec in self.method_sets {
            let Some(signature) = spec.methods.get(method) else {
                continue;
            };
            if let Some(target_match) = match_target(receiver, &spec.target, &spec.type_params) {
                let mut bindings = target_match.bindings;
                bindings.insert(SELF_TYPE.to_string(), receiver.clone());
                found.push((spec, substitute_function(signature, &bindings)));
            }
        }
        found
    }
}

fn with_context(detail: String, context: &str) -> String {
    if context.is_empty() || detail.contains(context) {
        detail
    } else {
        format!("{detail} ({context})")
    }
}

fn lookup_detail(lookup: ImplementationLookup<'_>) -> String {
    match lookup {
        ImplementationLookup::Found { .. } => String::new(),
        ImplementationLookup::Ambiguous(detail) | ImplementationLookup::Missing(detail) => detail,
    }
}

fn candidate_label(spec: &ImplementationSpec, bindings: &Bindings, args: &[Type]) -> String {
    if let Some(name) = &spec.impl_name {
        return name.clone();
    }
    let target = substitute(&spec.target, bindings);
    let mut label = format!("impl {}", spec.interface);
    for arg in args {
        label.push(' ');
        label.push_str(&arg.to_string());
    }
    label.push_str(&format!(" for {target}"));
    label
}

/// Interfaces every primitive satisfies without a declared implementation.
fn implements_intrinsic(subject: &Type, interface: &str) -> bool {
    matches!(interface, "Hash" | "Eq")
        && matches!(
            subject,
            Type::Primitive(PrimitiveKind::String | PrimitiveKind::Bool | PrimitiveKind::Char)
                | Type::Integer(_)
        )
}

impl ImplementationOracle for Solver<'_> {
    fn implements(&self, ty: &Type, interface: &InterfaceRef) -> bool {
        self.type_implements(ty, interface, 0).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use able_syntax::IntegerKind;

    use super::*;
    use crate::env::Scope;
    use crate::types::InterfaceInfo;

    fn display_env() -> Environment {
        let mut scope = Scope::new();
        let mut methods = std::collections::BTreeMap::new();
        methods.insert(
            "to_string".to_string(),
            FunctionType::new(vec![Type::param(SELF_TYPE)], Type::string()),
        );
        scope.define_interface(InterfaceInfo {
            name: "Display".into(),
            type_params: Vec::new(),
            methods,
            defaulted: Vec::new(),
            where_clause: Vec::new(),
            node: NodeId::DUMMY,
        });
        Environment::new(scope)
    }

    fn display_impl(target: Type, type_params: Vec<GenericParamSpec>) -> ImplementationSpec {
        let mut methods = std::collections::BTreeMap::new();
        methods.insert(
            "to_string".to_string(),
            FunctionType::new(vec![target.clone()], Type::string()),
        );
        ImplementationSpec {
            interface: "Display".into(),
            interface_args: Vec::new(),
            target,
            methods,
            type_params,
            where_clause: Vec::new(),
            obligations: Vec::new(),
            impl_name: None,
            node: NodeId::DUMMY,
        }
    }

    fn obligation(subject: Type) -> ConstraintObligation {
        ConstraintObligation {
            owner: "fn show".into(),
            type_param: "T".into(),
            constraint: InterfaceRef::named("Display"),
            subject,
            context: String::new(),
            node: NodeId::DUMMY,
        }
    }

    #[test]
    fn missing_implementation_names_param_and_subject() {
        let env = display_env();
        let solver = Solver::new(&[], &[], &env);
        let diag = solver
            .evaluate(&obligation(Type::Struct("Wrapper".into())))
            .expect("diagnostic");
        assert_eq!(
            diag.message,
            "fn show constraint on T is not satisfied: Wrapper does not implement Display"
        );
    }

    #[test]
    fn concrete_implementation_beats_generic() {
        let env = display_env();
        let generic = display_impl(
            Type::StructInstance {
                name: "Box".into(),
                args: vec![Type::param("T")],
            },
            vec![GenericParamSpec::unconstrained("T")],
        );
        let concrete = display_impl(
            Type::StructInstance {
                name: "Box".into(),
                args: vec![Type::int(IntegerKind::I32)],
            },
            Vec::new(),
        );
        let impls = vec![generic, concrete];
        let solver = Solver::new(&impls, &[], &env);
        let subject = Type::StructInstance {
            name: "Box".into(),
            args: vec![Type::int(IntegerKind::I32)],
        };
        let lookup = solver.implementation_provides(&subject, &InterfaceRef::named("Display"), 0);
        match lookup {
            ImplementationLookup::Found { spec, .. } => assert!(!uses_type_params(&spec.target)),
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn equally_specific_implementations_are_ambiguous() {
        let env = display_env();
        let impls = vec![
            display_impl(Type::Struct("Point".into()), Vec::new()),
            display_impl(Type::Struct("Point".into()), Vec::new()),
        ];
        let solver = Solver::new(&impls, &[], &env);
        let diag = solver
            .evaluate(&obligation(Type::Struct("Point".into())))
            .expect("diagnostic");
        assert!(
            diag.message
                .contains("ambiguous implementations of Display for Point"),
            "{}",
            diag.message
        );
    }

    #[test]
    fn method_set_with_matching_signature_satisfies_interface() {
        let env = display_env();
        let mut methods = std::collections::BTreeMap::new();
        methods.insert(
            "to_string".to_string(),
            FunctionType::new(vec![Type::param(SELF_TYPE)], Type::string()),
        );
        let sets = vec![MethodSetSpec {
            target: Type::Struct("Point".into()),
            methods,
            type_params: Vec::new(),
            where_clause: Vec::new(),
            obligations: Vec::new(),
            node: NodeId::DUMMY,
        }];
        let solver = Solver::new(&[], &sets, &env);
        assert!(solver.evaluate(&obligation(Type::Struct("Point".into()))).is_none());
    }
}
