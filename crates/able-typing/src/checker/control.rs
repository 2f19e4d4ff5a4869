use able_base::NodeId;
use able_syntax::{Block, Expr, Identifier, MatchClause, Pattern, TypeExpr};

use super::expressions::element_slot;
use super::patterns::BindMode;
use super::{TypeChecker, merge_branches, settle};
use crate::types::{InterfaceRef, PrimitiveKind, Type};

const ERROR_INTERFACE: &str = "Error";

fn handle_slot(expected: Option<&Type>, proc: bool) -> Option<Type> {
    let inner = match expected?.resolved() {
        Type::Proc(inner) if proc => *inner,
        Type::Future(inner) if !proc => *inner,
        _ => return None,
    };
    (!inner.is_unknown()).then_some(inner)
}

impl TypeChecker {
    /// Expressions that open scopes or steer control flow.
    pub(super) fn check_control(&mut self, expr: &Expr, expected: Option<&Type>) -> Type {
        match expr {
            Expr::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => self.check_if(condition, then_branch, else_branch.as_deref(), expected),
            Expr::Match {
                subject, clauses, ..
            } => self.check_match(subject, clauses, expected),
            Expr::Loop { body, .. } => {
                self.control.loops.push(Vec::new());
                self.check_block(body, None);
                let values = self.control.loops.pop().unwrap_or_default();
                if values.is_empty() {
                    Type::void()
                } else {
                    merge_branches(values)
                }
            }
            Expr::Breakpoint { label, body, .. } => self.check_breakpoint(label, body, expected),
            Expr::Iterator {
                element_type, body, ..
            } => self.check_iterator_literal(element_type.as_ref(), body, expected),
            Expr::Rescue {
                id,
                expr: guarded,
                clauses,
            } => self.check_rescue(*id, guarded, clauses, expected),
            Expr::Ensure {
                expr: guarded,
                ensure,
                ..
            } => {
                let ty = self.check_expr(guarded, expected);
                self.check_block(ensure, None);
                ty
            }
            Expr::OrElse {
                expr: operand,
                binding,
                handler,
                ..
            } => self.check_or_else(operand, binding.as_ref(), handler),
            Expr::Propagate { expr: operand, .. } => {
                let ty = self.check_expr(operand, expected);
                match self.split_failure(&ty, false) {
                    Some((success, _)) => success,
                    None => ty,
                }
            }
            Expr::Await { expr: operand, .. } => {
                match self.check_expr(operand, None).resolved() {
                    Type::Future(inner) | Type::Proc(inner) => *inner,
                    _ => Type::Unknown,
                }
            }
            Expr::Proc { expr: body, .. } => {
                let hint = handle_slot(expected, true);
                Type::Proc(Box::new(settle(&self.check_expr(body, hint.as_ref()))))
            }
            Expr::Spawn { expr: body, .. } => {
                let hint = handle_slot(expected, false);
                Type::Future(Box::new(settle(&self.check_expr(body, hint.as_ref()))))
            }
            other => {
                tracing::trace!(node = ?other.id(), "not a control expression");
                Type::Unknown
            }
        }
    }

    fn check_if(
        &mut self,
        condition: &Expr,
        then_branch: &Block,
        else_branch: Option<&Expr>,
        expected: Option<&Type>,
    ) -> Type {
        let condition_type = self.check_expr(condition, None);
        self.require_bool(condition.id(), &condition_type, "if condition");
        let then_type = self.check_block(then_branch, expected);
        match else_branch {
            Some(otherwise) => {
                let else_type = self.check_expr(otherwise, expected);
                merge_branches(vec![then_type, else_type])
            }
            None if then_type == Type::void() || then_type.is_unknown() => then_type,
            None => Type::nullable(settle(&then_type)),
        }
    }

    fn check_match(
        &mut self,
        subject: &Expr,
        clauses: &[MatchClause],
        expected: Option<&Type>,
    ) -> Type {
        let subject_type = self.check_expr(subject, None);
        let mut bodies = Vec::with_capacity(clauses.len());
        for clause in clauses {
            self.env.push();
            let mut matched = subject_type.clone();
            if let (Pattern::Typed { ty, .. }, Expr::Ident(name)) = (&clause.pattern, subject) {
                if subject_type.is_unknown() {
                    let declared = self.resolve_type(ty);
                    self.env.define(name.name.clone(), declared.clone());
                    matched = declared;
                }
            }
            self.bind_pattern(&clause.pattern, &matched, BindMode::Declare);
            if let Some(guard) = &clause.guard {
                let guard_type = self.check_expr(guard, None);
                self.require_bool(guard.id(), &guard_type, "match guard");
            }
            bodies.push(self.check_expr(&clause.body, expected));
            self.env.pop();
        }
        merge_branches(bodies)
    }

    fn check_breakpoint(
        &mut self,
        label: &Identifier,
        body: &Block,
        expected: Option<&Type>,
    ) -> Type {
        self.control
            .breakpoints
            .push((label.name.clone(), Vec::new()));
        let body_type = self.check_block(body, expected);
        let mut values = self
            .control
            .breakpoints
            .pop()
            .map(|(_, values)| values)
            .unwrap_or_default();
        values.push(body_type);
        merge_branches(values)
    }

    fn check_iterator_literal(
        &mut self,
        element_type: Option<&TypeExpr>,
        body: &Block,
        expected: Option<&Type>,
    ) -> Type {
        let annotation = match element_type {
            Some(ty) => Some(self.resolve_type(ty)),
            None => element_slot(expected),
        };
        self.push_iterator(annotation.clone());
        self.check_block(body, None);
        let frame = self.pop_iterator();
        let element = match annotation {
            Some(element) => element,
            None if frame.yields.is_empty() => Type::Unknown,
            None => merge_branches(frame.yields),
        };
        Type::Iterator(Box::new(element))
    }

    fn check_rescue(
        &mut self,
        node: NodeId,
        guarded: &Expr,
        clauses: &[MatchClause],
        expected: Option<&Type>,
    ) -> Type {
        let guarded_type = self.check_expr(guarded, expected);
        if clauses.is_empty() && self.config.warn_unused_rescue {
            self.warning(node, "rescue has no handler clauses");
        }
        let mut branches = vec![guarded_type];
        for clause in clauses {
            self.env.push();
            self.bind_pattern(
                &clause.pattern,
                &Type::interface(ERROR_INTERFACE),
                BindMode::Declare,
            );
            if let Some(guard) = &clause.guard {
                let guard_type = self.check_expr(guard, None);
                self.require_bool(guard.id(), &guard_type, "rescue guard");
            }
            self.control.rescue_depth += 1;
            branches.push(self.check_expr(&clause.body, expected));
            self.control.rescue_depth -= 1;
            self.env.pop();
        }
        merge_branches(branches)
    }

    fn check_or_else(
        &mut self,
        operand: &Expr,
        binding: Option<&Identifier>,
        handler: &Block,
    ) -> Type {
        let operand_type = self.check_expr(operand, None);
        let (success, failure) = self
            .split_failure(&operand_type, true)
            .unwrap_or_else(|| (operand_type.clone(), Type::interface(ERROR_INTERFACE)));
        self.env.push();
        if let Some(binding) = binding {
            self.env.define(binding.name.clone(), failure.clone());
            self.record(binding.id, failure);
        }
        let hint = (!success.is_unknown()).then(|| success.clone());
        let fallback = self.check_block(handler, hint.as_ref());
        self.env.pop();
        if fallback == Type::void() || fallback.is_unknown() {
            success
        } else {
            merge_branches(vec![success, fallback])
        }
    }

    fn is_failure(&self, ty: &Type, include_nil: bool) -> bool {
        match ty {
            Type::Primitive(PrimitiveKind::Nil) => include_nil,
            Type::Interface(iface) => iface.name == ERROR_INTERFACE,
            Type::Struct(_) | Type::StructInstance { .. } => self
                .solver()
                .type_implements(ty, &InterfaceRef::named(ERROR_INTERFACE), 0)
                .is_ok(),
            _ => false,
        }
    }

    /// Splits a union into its success and failure members. `None` when nothing fails.
    fn split_failure(&self, ty: &Type, include_nil: bool) -> Option<(Type, Type)> {
        let resolved = ty.resolved();
        let variants = match &resolved {
            Type::Nullable(inner) if include_nil => {
                return Some(((**inner).clone(), Type::nil()));
            }
            Type::Union(union) => union.variants.clone(),
            _ => return None,
        };
        let (failures, successes): (Vec<Type>, Vec<Type>) = variants
            .into_iter()
            .partition(|variant| self.is_failure(&variant.resolved(), include_nil));
        if failures.is_empty() {
            return None;
        }
        let success = if successes.is_empty() {
            Type::void()
        } else {
            Type::union_of(successes)
        };
        Some((success, Type::union_of(failures)))
    }
}
