use able_base::Diagnostic;

use super::TypeChecker;
use crate::assignable::{signature_types_equivalent, signatures_equivalent};
use crate::substitute::{Bindings, bind_params, substitute, substitute_function, substitute_interface};
use crate::types::{SELF_TYPE, Type};

impl TypeChecker {
    /// Proves every obligation queued during inference, plus `where` clauses of applied aliases.
    pub(super) fn solve_obligations(&mut self) {
        let mut diagnostics = self.solver().evaluate_all(&self.obligations);
        tracing::debug!(
            obligations = self.obligations.len(),
            failed = diagnostics.len(),
            "obligations evaluated"
        );

        let solver = self.solver();
        for inst in &self.alias_instantiations {
            let bindings = bind_params(&inst.alias.type_params, &inst.args);
            for clause in &inst.alias.where_clause {
                let subject = substitute(&Type::param(clause.type_param.clone()), &bindings);
                if subject.is_unknown() || subject.is_type_parameter() {
                    continue;
                }
                for constraint in &clause.constraints {
                    let constraint = substitute_interface(constraint, &bindings);
                    let Err(detail) = solver.type_implements(&subject, &constraint, 0) else {
                        continue;
                    };
                    let reason = if detail.is_empty() {
                        String::new()
                    } else {
                        format!(": {detail}")
                    };
                    diagnostics.push(Diagnostic::error(
                        inst.node,
                        format!(
                            "type alias '{}': {subject} does not implement {}{reason}",
                            inst.alias.name,
                            Type::Interface(constraint)
                        ),
                    ));
                }
            }
        }
        for diagnostic in diagnostics {
            self.push_diagnostic(diagnostic);
        }
    }

    /// Checks local implementations against their interfaces and against each other.
    pub(super) fn check_coherence(&mut self) {
        let start = self.local_implementations_start;
        let mut problems = Vec::new();
        for (offset, spec) in self.implementations[start..].iter().enumerate() {
            let Some(info) = self.env.lookup_interface(&spec.interface) else {
                continue;
            };
            let label = spec.label();
            for name in info.methods.keys() {
                if !spec.methods.contains_key(name) {
                    problems.push((spec.node, format!("{label} missing method '{name}'")));
                }
            }
            let mut bindings: Bindings = bind_params(&info.type_params, &spec.interface_args);
            bindings.insert(SELF_TYPE.to_string(), spec.target.clone());
            for (name, actual) in &spec.methods {
                let Some(declared) = info.methods.get(name) else {
                    problems.push((spec.node, format!("{label} defines unknown method '{name}'")));
                    continue;
                };
                let expected = substitute_function(declared, &bindings);
                if !signatures_equivalent(&expected, actual) {
                    problems.push((
                        spec.node,
                        format!(
                            "{label} method '{name}' has incompatible signature: expected {}, got {}",
                            Type::Function(expected),
                            Type::Function(actual.clone())
                        ),
                    ));
                }
            }

            if spec.impl_name.is_some() {
                continue;
            }
            let overlapping = self.implementations[..start + offset].iter().any(|other| {
                other.impl_name.is_none()
                    && other.interface == spec.interface
                    && signature_types_equivalent(&other.target, &spec.target)
                    && other.interface_args.len() == spec.interface_args.len()
                    && other
                        .interface_args
                        .iter()
                        .zip(&spec.interface_args)
                        .all(|(a, b)| signature_types_equivalent(a, b))
            });
            if overlapping {
                problems.push((
                    spec.node,
                    format!("overlapping implementations of {} for {}", spec.interface, spec.target),
                ));
            }
        }
        for (node, message) in problems {
            self.error(node, message);
        }
    }
}
