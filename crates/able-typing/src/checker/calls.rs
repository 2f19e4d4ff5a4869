use able_base::NodeId;
use able_syntax::{Expr, TypeExpr};

use super::TypeChecker;
use crate::overload::{
    Instantiation, OverloadCandidate, OverloadOutcome, instantiate, resolve_overload_with_type_args,
};
use crate::solver::{obligations_for_call, uses_type_params};
use crate::types::{FunctionType, Type};

/// Arguments and explicit type arguments of one call expression.
#[derive(Debug, Clone, Copy)]
pub(super) struct CallSite<'a> {
    pub node: NodeId,
    pub args: &'a [Expr],
    pub explicit: &'a [Type],
}

fn hint_for(param: Option<&Type>) -> Option<Type> {
    param
        .filter(|ty| !ty.is_unknown() && !uses_type_params(ty))
        .cloned()
}

impl TypeChecker {
    pub(super) fn check_call(
        &mut self,
        node: NodeId,
        callee: &Expr,
        args: &[Expr],
        type_args: &[TypeExpr],
    ) -> Type {
        let explicit: Vec<Type> = type_args.iter().map(|arg| self.resolve_type(arg)).collect();
        let site = CallSite {
            node,
            args,
            explicit: &explicit,
        };
        match callee {
            Expr::Member {
                id,
                object,
                member,
                safe,
            } => self.check_method_call(site, *id, object, member, *safe),
            Expr::Ident(ident) => match self.env.lookup(&ident.name).cloned() {
                Some(ty) => {
                    self.record(ident.id, ty.clone());
                    self.call_value(site, &ident.name, ty)
                }
                None => {
                    let inherent = self.inherent_functions(&ident.name);
                    if !inherent.is_empty() {
                        return self.call_candidates(site, &ident.name, inherent, None);
                    }
                    self.check_arguments_loosely(args);
                    if !self.config.allow_dynamic_lookups {
                        self.error(ident.id, format!("undefined identifier '{}'", ident.name));
                    }
                    Type::Unknown
                }
            },
            other => {
                let ty = self.check_expr(other, None);
                self.call_value(site, "closure", ty)
            }
        }
    }

    /// Calls a value of type `callee`: a function, an overload set, or something unknown.
    pub(super) fn call_value(&mut self, site: CallSite<'_>, name: &str, callee: Type) -> Type {
        match callee.resolved() {
            Type::Function(signature) => self.call_candidates(site, name, vec![signature], None),
            Type::Overloads(signatures) => self.call_candidates(site, name, signatures, None),
            Type::Unknown | Type::TypeParameter(_) => {
                self.check_arguments_loosely(site.args);
                Type::Unknown
            }
            other => {
                self.check_arguments_loosely(site.args);
                self.error(site.node, format!("cannot call non-callable value {other}"));
                Type::Unknown
            }
        }
    }

    pub(super) fn check_arguments_loosely(&mut self, args: &[Expr]) {
        for arg in args {
            self.check_expr(arg, None);
        }
    }

    /// Inherent methods named `name`, callable as plain functions with an explicit receiver.
    fn inherent_functions(&self, name: &str) -> Vec<FunctionType> {
        let mut found: Vec<FunctionType> = Vec::new();
        for spec in &self.method_sets {
            if let Some(signature) = spec.methods.get(name) {
                if !found.contains(signature) {
                    found.push(signature.clone());
                }
            }
        }
        found
    }

    /// Resolves a call against `candidates`. A `receiver` is passed as the first argument.
    pub(super) fn call_candidates(
        &mut self,
        site: CallSite<'_>,
        name: &str,
        candidates: Vec<FunctionType>,
        receiver: Option<Type>,
    ) -> Type {
        if let [signature] = candidates.as_slice() {
            return self.apply_single(site, name, signature.clone(), receiver);
        }
        let CallSite {
            node,
            args,
            explicit,
        } = site;
        let mut arg_types: Vec<Type> = receiver.into_iter().collect();
        for arg in args {
            arg_types.push(self.check_expr(arg, None));
        }
        let overloads: Vec<OverloadCandidate> = candidates
            .iter()
            .cloned()
            .map(OverloadCandidate::from)
            .collect();
        let outcome = {
            let solver = self.solver();
            resolve_overload_with_type_args(&overloads, explicit, &arg_types, &solver)
        };
        match outcome {
            OverloadOutcome::Resolved(inst) => {
                let ret = (*inst.signature.ret).clone();
                if let Some(signature) = candidates.get(inst.index) {
                    self.finish_generic_call(node, name, signature, &inst, explicit);
                }
                ret
            }
            OverloadOutcome::Partial { chosen, remaining } => {
                if let Some(signature) = candidates.get(chosen.index) {
                    self.finish_generic_call(node, name, signature, &chosen, explicit);
                }
                Type::Function(remaining)
            }
            OverloadOutcome::Ambiguous(_) => {
                self.error(node, format!("ambiguous overload for {name}"));
                Type::Unknown
            }
            OverloadOutcome::NoMatch => {
                self.error(
                    node,
                    format!("no overloads of {name} match provided arguments"),
                );
                Type::Unknown
            }
        }
    }

    fn apply_single(
        &mut self,
        site: CallSite<'_>,
        name: &str,
        signature: FunctionType,
        receiver: Option<Type>,
    ) -> Type {
        let CallSite {
            node,
            args,
            explicit,
        } = site;
        let offset = usize::from(receiver.is_some());
        let explicit_ok = explicit.is_empty() || explicit.len() == signature.type_params.len();
        if !explicit_ok {
            self.error(
                node,
                format!(
                    "function expects {} type arguments, got {}",
                    signature.type_params.len(),
                    explicit.len()
                ),
            );
        }
        // Explicit type arguments make parameter types concrete before the arguments are seen.
        let hinted = if explicit_ok && !explicit.is_empty() {
            instantiate(&signature, explicit, &[]).signature
        } else {
            signature.clone()
        };
        let mut arg_types: Vec<Type> = receiver.into_iter().collect();
        for (idx, arg) in args.iter().enumerate() {
            let hint = hint_for(hinted.params.get(idx + offset));
            arg_types.push(self.check_expr(arg, hint.as_ref()));
        }

        let declared = signature.params.len().saturating_sub(offset);
        let required = if signature.has_optional_last() {
            declared.saturating_sub(1)
        } else {
            declared
        };
        if args.len() > declared {
            self.error(
                node,
                format!("function expects {declared} arguments, got {}", args.len()),
            );
            return Type::Unknown;
        }

        let type_args: &[Type] = if explicit_ok { explicit } else { &[] };
        let inst = instantiate(&signature, type_args, &arg_types);
        for (idx, arg) in args.iter().enumerate() {
            let (Some(expected), Some(actual)) = (
                inst.signature.params.get(idx + offset),
                arg_types.get(idx + offset),
            ) else {
                continue;
            };
            self.check_value(arg.id(), actual, expected, |actual, expected| {
                format!("argument {} has type {actual}, expected {expected}", idx + 1)
            });
        }
        self.finish_generic_call(node, name, &signature, &inst, explicit);

        if args.len() < required {
            let supplied = args.len() + offset;
            return Type::Function(FunctionType::new(
                inst.signature.params[supplied..].to_vec(),
                (*inst.signature.ret).clone(),
            ));
        }
        (*inst.signature.ret).clone()
    }

    /// Records inferred type arguments and queues the callee's constraint obligations.
    fn finish_generic_call(
        &mut self,
        node: NodeId,
        name: &str,
        signature: &FunctionType,
        inst: &Instantiation,
        explicit: &[Type],
    ) {
        if signature.is_generic() && explicit.is_empty() {
            self.inferred_type_args.insert(node, inst.type_args.clone());
        }
        if signature.is_generic() || !signature.obligations.is_empty() {
            let obligations =
                obligations_for_call(signature, &inst.bindings, &format!("fn {name}"), node);
            tracing::trace!(callee = name, queued = obligations.len(), "call obligations");
            self.obligations.extend(obligations);
        }
    }
}
