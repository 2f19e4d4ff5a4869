use able_base::NodeId;
use able_syntax::{
    AssignOp, AssignTarget, BinaryOp, Expr, FloatKind, Identifier, IntegerKind, MapElement, Param,
    Pattern, StructFieldInit, TypeExpr, UnaryOp,
};
use num_bigint::BigInt;
use rustc_hash::FxHashSet;

use super::patterns::{BindMode, pattern_names};
use super::{TypeChecker, merge_branches, settle};
use crate::assignable::type_assignable;
use crate::numeric::{literal_fits, promote_floats, promote_integers};
use crate::solver::{obligations_for_call, uses_type_params};
use crate::substitute::{Bindings, bind_params, infer_bindings, substitute};
use crate::types::{FloatType, FunctionType, IntegerType, Type};

/// Numeric slot an unsuffixed literal can adapt to.
#[derive(Debug, Clone, Copy)]
enum NumericSlot {
    Integer(IntegerKind),
    Float(FloatKind),
}

fn numeric_slot(expected: &Type) -> Option<NumericSlot> {
    match expected.resolved() {
        Type::Integer(int) => Some(NumericSlot::Integer(int.kind)),
        Type::Float(float) => Some(NumericSlot::Float(float.kind)),
        Type::Nullable(inner) => numeric_slot(&inner),
        Type::Union(union) => {
            let mut slots = union.variants.iter().filter_map(numeric_slot);
            let first = slots.next()?;
            slots.next().is_none().then_some(first)
        }
        _ => None,
    }
}

/// Element type expected by an `Array`/`Range`/`Iterator` slot, when it is concrete.
pub(super) fn element_slot(expected: Option<&Type>) -> Option<Type> {
    let element = match expected?.resolved() {
        Type::Array(element) | Type::Range(element) | Type::Iterator(element) => *element,
        Type::Nullable(inner) => return element_slot(Some(inner.as_ref())),
        _ => return None,
    };
    concrete(element)
}

fn concrete(ty: Type) -> Option<Type> {
    (!ty.is_unknown() && !uses_type_params(&ty)).then_some(ty)
}

fn map_slots(expected: Option<&Type>) -> Option<(Option<Type>, Option<Type>)> {
    match expected?.resolved() {
        Type::Map(key, value) => Some((concrete(*key), concrete(*value))),
        Type::Nullable(inner) => map_slots(Some(inner.as_ref())),
        _ => None,
    }
}

fn flexible_integer(kind: IntegerKind, value: BigInt) -> Type {
    Type::Integer(IntegerType {
        kind,
        literal: Some(value),
        explicit: false,
    })
}

fn is_open(ty: &Type) -> bool {
    ty.is_unknown() || ty.is_type_parameter()
}

/// Result of an arithmetic operator on two numeric operands, or the reason it is rejected.
pub(super) fn arithmetic_result(left: &Type, right: &Type) -> Result<Type, String> {
    let (l, r) = (left.resolved(), right.resolved());
    if is_open(&l) || is_open(&r) {
        return Ok(if is_open(&l) { r } else { l });
    }
    match (&l, &r) {
        (Type::Integer(a), Type::Integer(b)) => integer_result(a, b),
        (Type::Float(a), Type::Float(b)) => Ok(Type::float(promote_floats(a.kind, b.kind))),
        (Type::Integer(a), Type::Float(b)) if a.is_flexible_literal() => Ok(Type::float(b.kind)),
        (Type::Float(a), Type::Integer(b)) if b.is_flexible_literal() => Ok(Type::float(a.kind)),
        (Type::Integer(_), Type::Float(_)) | (Type::Float(_), Type::Integer(_)) => Err(format!(
            "cannot mix float and integer operands (got {left} and {right})"
        )),
        _ => Err(format!("requires numeric operands (got {left} and {right})")),
    }
}

fn integer_result(a: &IntegerType, b: &IntegerType) -> Result<Type, String> {
    if let (Some(value), false) = (&a.literal, a.explicit) {
        if !b.is_flexible_literal() && literal_fits(value, b.kind) {
            return Ok(Type::int(b.kind));
        }
    }
    if let (Some(value), false) = (&b.literal, b.explicit) {
        if !a.is_flexible_literal() && literal_fits(value, a.kind) {
            return Ok(Type::int(a.kind));
        }
    }
    promote_integers(a.kind, b.kind)
        .map(Type::int)
        .map_err(|err| err.to_string())
}

fn bitwise_result(op: BinaryOp, left: &Type, right: &Type) -> Result<Type, String> {
    let (l, r) = (left.resolved(), right.resolved());
    if is_open(&l) || is_open(&r) {
        return Ok(if is_open(&l) { r } else { l });
    }
    match (&l, &r) {
        (Type::Integer(a), Type::Integer(_)) if matches!(op, BinaryOp::Shl | BinaryOp::Shr) => {
            Ok(Type::int(a.kind))
        }
        (Type::Integer(a), Type::Integer(b)) => integer_result(a, b),
        _ => Err(format!("requires integer operands (got {left} and {right})")),
    }
}

fn division_result(left: &Type, right: &Type) -> Result<Type, String> {
    let (l, r) = (left.resolved(), right.resolved());
    match (&l, &r) {
        (Type::Integer(_), Type::Integer(_)) => Ok(Type::float(FloatKind::F64)),
        _ if is_open(&l) || is_open(&r) => Ok(Type::float(FloatKind::F64)),
        _ => arithmetic_result(left, right),
    }
}

impl TypeChecker {
    /// Infers the type of `expr`. `expected` is a hint used by literals, lambdas and containers;
    /// mismatches against it are reported by the caller.
    pub(super) fn check_expr(&mut self, expr: &Expr, expected: Option<&Type>) -> Type {
        let ty = match expr {
            Expr::Ident(ident) => self.check_identifier(ident),
            Expr::Integer { id, value, suffix } => {
                self.check_integer_literal(*id, value.clone(), *suffix, expected)
            }
            Expr::Float { suffix, .. } => Type::Float(match suffix {
                Some(kind) => FloatType {
                    kind: *kind,
                    literal: true,
                    explicit: true,
                },
                None => FloatType {
                    kind: match expected.and_then(numeric_slot) {
                        Some(NumericSlot::Float(kind)) => kind,
                        _ => FloatKind::F64,
                    },
                    literal: true,
                    explicit: false,
                },
            }),
            Expr::Bool { .. } => Type::bool(),
            Expr::Nil { .. } => Type::nil(),
            Expr::Char { .. } => Type::char(),
            Expr::String { .. } => Type::string(),
            Expr::Interpolation { parts, .. } => {
                for part in parts {
                    self.check_expr(part, None);
                }
                Type::string()
            }
            Expr::Array { elements, .. } => self.check_array_literal(elements, expected),
            Expr::Map { elements, .. } => self.check_map_literal(elements, expected),
            Expr::StructLiteral {
                id,
                name,
                type_args,
                fields,
                positional,
            } => self.check_struct_literal(*id, name, type_args, fields, *positional, expected),
            Expr::Unary { id, op, operand } => self.check_unary(*id, *op, operand, expected),
            Expr::Binary {
                id,
                op,
                left,
                right,
            } => self.check_binary(*id, *op, left, right, expected),
            Expr::Call {
                id,
                callee,
                args,
                type_args,
            } => self.check_call(*id, callee, args, type_args),
            Expr::Member {
                object,
                member,
                safe,
                ..
            } => self.check_member_access(object, member, *safe),
            Expr::Index { id, object, index } => self.check_index(*id, object, index),
            Expr::Block(block) => self.check_block(block, expected),
            Expr::Assign {
                id,
                op,
                target,
                value,
            } => self.check_assignment(*id, *op, target, value),
            Expr::Range {
                id, start, end, ..
            } => self.check_range(*id, start, end, expected),
            Expr::Lambda {
                params,
                return_type,
                body,
                ..
            } => self.check_lambda(params, return_type.as_ref(), body, expected),
            Expr::Proc { .. }
            | Expr::Spawn { .. }
            | Expr::Await { .. }
            | Expr::Propagate { .. }
            | Expr::OrElse { .. }
            | Expr::Breakpoint { .. }
            | Expr::If { .. }
            | Expr::Match { .. }
            | Expr::Loop { .. }
            | Expr::Iterator { .. }
            | Expr::Rescue { .. }
            | Expr::Ensure { .. } => self.check_control(expr, expected),
        };
        self.record(expr.id(), ty)
    }

    fn check_identifier(&mut self, ident: &Identifier) -> Type {
        if let Some(ty) = self.env.lookup(&ident.name) {
            return ty.clone();
        }
        if !self.config.allow_dynamic_lookups {
            self.error(ident.id, format!("undefined identifier '{}'", ident.name));
        }
        Type::Unknown
    }

    fn check_integer_literal(
        &mut self,
        node: NodeId,
        value: BigInt,
        suffix: Option<IntegerKind>,
        expected: Option<&Type>,
    ) -> Type {
        if let Some(kind) = suffix {
            if !literal_fits(&value, kind) {
                self.error(node, format!("literal {value} does not fit in {kind}"));
                return Type::int(kind);
            }
            return Type::Integer(IntegerType {
                kind,
                literal: Some(value),
                explicit: true,
            });
        }
        match expected.and_then(numeric_slot) {
            Some(NumericSlot::Integer(kind)) => {
                if literal_fits(&value, kind) {
                    flexible_integer(kind, value)
                } else {
                    self.error(node, format!("literal {value} does not fit in {kind}"));
                    Type::int(kind)
                }
            }
            Some(NumericSlot::Float(kind)) => Type::Float(FloatType {
                kind,
                literal: true,
                explicit: false,
            }),
            None => {
                let default = [IntegerKind::I32, IntegerKind::I64, IntegerKind::I128]
                    .into_iter()
                    .find(|kind| literal_fits(&value, *kind));
                match default {
                    Some(kind) => flexible_integer(kind, value),
                    None => {
                        self.error(
                            node,
                            format!("literal {value} does not fit in {}", IntegerKind::I128),
                        );
                        Type::int(IntegerKind::I128)
                    }
                }
            }
        }
    }

    fn check_array_literal(&mut self, elements: &[Expr], expected: Option<&Type>) -> Type {
        if let Some(element) = element_slot(expected) {
            for (idx, item) in elements.iter().enumerate() {
                let actual = self.check_expr(item, Some(&element));
                self.check_value(item.id(), &actual, &element, |actual, expected| {
                    format!("array element {} expects type {expected}, got {actual}", idx + 1)
                });
            }
            return Type::array(element);
        }
        let mut reference: Option<Type> = None;
        for (idx, item) in elements.iter().enumerate() {
            let actual = self.check_expr(item, None);
            let Some(current) = &reference else {
                reference = Some(actual);
                continue;
            };
            if actual.is_unknown() || type_assignable(&actual, current) {
                continue;
            }
            if type_assignable(current, &actual) {
                reference = Some(actual);
                continue;
            }
            self.error(
                item.id(),
                format!(
                    "array element {} expects type {}, got {actual}",
                    idx + 1,
                    settle(current)
                ),
            );
        }
        Type::array(reference.as_ref().map(settle).unwrap_or_default())
    }

    fn check_map_literal(&mut self, elements: &[MapElement], expected: Option<&Type>) -> Type {
        let (key_slot, value_slot) = map_slots(expected).unwrap_or((None, None));
        let annotated = (key_slot.is_some(), value_slot.is_some());
        let mut key_type = key_slot;
        let mut value_type = value_slot;
        let mut key_reported = false;
        for element in elements {
            match element {
                MapElement::Entry { key, value, .. } => {
                    let actual_key = self.check_expr(key, key_type.as_ref());
                    let actual_value = self.check_expr(value, value_type.as_ref());
                    match key_type.clone() {
                        Some(expected_key) if annotated.0 || !key_reported => {
                            let ok = self.check_value(key.id(), &actual_key, &expected_key, |actual, expected| {
                                format!("map key expects type {expected}, got {actual}")
                            });
                            key_reported |= !ok;
                        }
                        Some(_) => {}
                        None => key_type = Some(settle(&actual_key)),
                    }
                    match value_type.clone() {
                        // An unannotated map widens to the first value type that covers both.
                        Some(current)
                            if !annotated.1
                                && !type_assignable(&actual_value, &current)
                                && type_assignable(&current, &actual_value) =>
                        {
                            value_type = Some(settle(&actual_value));
                        }
                        Some(expected_value) => {
                            self.check_value(value.id(), &actual_value, &expected_value, |actual, expected| {
                                format!("map value expects type {expected}, got {actual}")
                            });
                        }
                        None => value_type = Some(settle(&actual_value)),
                    }
                }
                MapElement::Spread { id, value } => {
                    let spread = self.check_expr(value, expected);
                    match spread.resolved() {
                        Type::Map(key, val) => {
                            let current = Type::Map(
                                Box::new(key_type.clone().unwrap_or_else(|| (*key).clone())),
                                Box::new(value_type.clone().unwrap_or_else(|| (*val).clone())),
                            );
                            if !self.accepts(&spread, &current) {
                                self.error(*id, format!("map spread expects type {current}, got {spread}"));
                            }
                            key_type.get_or_insert(*key);
                            value_type.get_or_insert(*val);
                        }
                        Type::Unknown | Type::TypeParameter(_) => {}
                        other => self.error(*id, format!("map spread expects a Map, got {other}")),
                    }
                }
            }
        }
        Type::Map(
            Box::new(key_type.unwrap_or_default()),
            Box::new(value_type.unwrap_or_default()),
        )
    }

    fn check_struct_literal(
        &mut self,
        node: NodeId,
        name: &Identifier,
        type_args: &[TypeExpr],
        fields: &[StructFieldInit],
        positional: bool,
        expected: Option<&Type>,
    ) -> Type {
        let Some(info) = self.env.lookup_struct(&name.name).cloned() else {
            for field in fields {
                self.check_expr(&field.value, None);
            }
            self.error(name.id, format!("unknown struct '{}'", name.name));
            return Type::Unknown;
        };
        let struct_name = info.name.clone();
        let explicit: Vec<Type> = type_args.iter().map(|arg| self.resolve_type(arg)).collect();
        if !explicit.is_empty() && explicit.len() != info.type_params.len() {
            self.error(
                node,
                format!(
                    "struct '{struct_name}' expects {} type argument(s), got {}",
                    info.type_params.len(),
                    explicit.len()
                ),
            );
        }
        let param_names: Vec<String> = info.type_params.iter().map(|p| p.name.clone()).collect();
        let mut bindings: Bindings = if !explicit.is_empty() {
            bind_params(&info.type_params, &explicit)
        } else {
            match expected.map(Type::resolved) {
                Some(Type::StructInstance { name, args }) if name == struct_name => {
                    bind_params(&info.type_params, &args)
                        .into_iter()
                        .filter(|(_, ty)| !ty.is_unknown())
                        .collect()
                }
                _ => Bindings::default(),
            }
        };

        let mut checks: Vec<(NodeId, String, Type, Type)> = Vec::new();
        if positional || info.positional {
            if fields.len() != info.fields.len() {
                self.error(
                    node,
                    format!(
                        "struct '{struct_name}' expects {} fields, got {}",
                        info.fields.len(),
                        fields.len()
                    ),
                );
            }
            for (idx, field) in fields.iter().enumerate() {
                let declared = info.fields.get(idx).map(|(_, ty)| ty.clone());
                let hint = declared
                    .as_ref()
                    .map(|ty| substitute(ty, &bindings))
                    .and_then(concrete);
                let actual = self.check_expr(&field.value, hint.as_ref());
                if let Some(declared) = declared {
                    infer_bindings(&declared, &actual, &param_names, &mut bindings);
                    checks.push((field.value.id(), idx.to_string(), declared, actual));
                }
            }
        } else {
            let mut seen = FxHashSet::default();
            for field in fields {
                let Some(field_name) = &field.name else {
                    self.check_expr(&field.value, None);
                    self.error(field.id, format!("struct '{struct_name}' requires named fields"));
                    continue;
                };
                if !seen.insert(field_name.name.clone()) {
                    self.error(
                        field_name.id,
                        format!("duplicate struct field '{}'", field_name.name),
                    );
                }
                let Some(declared) = info.field(&field_name.name).cloned() else {
                    self.check_expr(&field.value, None);
                    self.error(
                        field_name.id,
                        format!("struct '{struct_name}' has no field '{}'", field_name.name),
                    );
                    continue;
                };
                let hint = concrete(substitute(&declared, &bindings));
                let actual = self.check_expr(&field.value, hint.as_ref());
                infer_bindings(&declared, &actual, &param_names, &mut bindings);
                checks.push((field.value.id(), field_name.name.clone(), declared, actual));
            }
            for (field_name, _) in &info.fields {
                if !seen.contains(field_name) {
                    self.error(
                        node,
                        format!("missing field '{field_name}' in struct '{struct_name}'"),
                    );
                }
            }
        }
        for (at, field_name, declared, actual) in checks {
            let declared = substitute(&declared, &bindings);
            self.check_value(at, &actual, &declared, |actual, expected| {
                format!("struct field '{field_name}' expects {expected}, got {actual}")
            });
        }

        if info.type_params.is_empty() {
            return Type::Struct(struct_name);
        }
        for param in &param_names {
            bindings.entry(param.clone()).or_insert(Type::Unknown);
        }
        let generic = FunctionType {
            type_params: info.type_params.clone(),
            ..FunctionType::default()
        };
        let obligations =
            obligations_for_call(&generic, &bindings, &format!("struct {struct_name}"), node);
        self.obligations.extend(obligations);
        Type::StructInstance {
            name: struct_name,
            args: param_names
                .iter()
                .map(|param| bindings.get(param).cloned().unwrap_or_default())
                .collect(),
        }
    }

    fn check_unary(
        &mut self,
        node: NodeId,
        op: UnaryOp,
        operand: &Expr,
        expected: Option<&Type>,
    ) -> Type {
        match op {
            UnaryOp::Neg => {
                if let Expr::Integer { id, value, suffix } = operand {
                    let ty = self.check_integer_literal(node, -value.clone(), *suffix, expected);
                    return self.record(*id, ty);
                }
                let ty = self.check_expr(operand, expected);
                let resolved = ty.resolved();
                if resolved.is_numeric() || is_open(&resolved) {
                    return ty;
                }
                self.error(
                    node,
                    format!("unary '-' requires numeric operand (got {ty})"),
                );
                Type::Unknown
            }
            UnaryOp::Not => {
                let ty = self.check_expr(operand, None);
                let resolved = ty.resolved();
                if !(resolved.is_bool() || is_open(&resolved)) {
                    self.error(node, format!("unary '!' requires bool operand (got {ty})"));
                }
                Type::bool()
            }
            UnaryOp::BitNot => {
                let ty = self.check_expr(operand, expected);
                let resolved = ty.resolved();
                if resolved.is_integer() || is_open(&resolved) {
                    return ty;
                }
                self.error(
                    node,
                    format!("unary '.~' requires integer operand (got {ty})"),
                );
                Type::Unknown
            }
        }
    }

    fn check_binary(
        &mut self,
        node: NodeId,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        expected: Option<&Type>,
    ) -> Type {
        let numeric_hint = expected.filter(|ty| numeric_slot(ty).is_some());
        let hint = match op {
            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Rem
            | BinaryOp::Pow
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor => numeric_hint,
            _ => None,
        };
        let l = self.check_expr(left, hint);
        let r = self.check_expr(right, hint);
        self.binary_result(node, op, &l, &r)
    }

    /// Type of `left op right`, reporting operand errors at `node`.
    pub(super) fn binary_result(&mut self, node: NodeId, op: BinaryOp, l: &Type, r: &Type) -> Type {
        let symbol = op.symbol();
        let outcome = match op {
            BinaryOp::Add if l.resolved().is_string() && r.resolved().is_string() => {
                Ok(Type::string())
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Rem | BinaryOp::Pow => {
                arithmetic_result(l, r)
            }
            BinaryOp::Div => division_result(l, r),
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr => {
                bitwise_result(op, l, r)
            }
            BinaryOp::Eq | BinaryOp::Ne => Ok(Type::bool()),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                self.comparison_result(l, r)
            }
            BinaryOp::And | BinaryOp::Or => {
                let (lr, rr) = (l.resolved(), r.resolved());
                if (lr.is_bool() || is_open(&lr)) && (rr.is_bool() || is_open(&rr)) {
                    Ok(Type::bool())
                } else {
                    Ok(merge_branches(vec![l.clone(), r.clone()]))
                }
            }
        };
        match outcome {
            Ok(ty) => ty,
            Err(reason) => {
                self.error(node, format!("'{symbol}' {reason}"));
                Type::Unknown
            }
        }
    }

    fn comparison_result(&self, l: &Type, r: &Type) -> Result<Type, String> {
        let (lr, rr) = (l.resolved(), r.resolved());
        if is_open(&lr) || is_open(&rr) || (lr.is_numeric() && rr.is_numeric()) {
            return Ok(Type::bool());
        }
        let comparable = type_assignable(l, r) || type_assignable(r, l);
        let ordered = lr.is_string()
            || matches!(lr, Type::Primitive(crate::types::PrimitiveKind::Char))
            || self
                .solver()
                .type_implements(&lr, &crate::types::InterfaceRef::named("Ord"), 0)
                .is_ok();
        if comparable && ordered {
            Ok(Type::bool())
        } else {
            Err(format!("requires numeric operands (got {l} and {r})"))
        }
    }

    fn check_range(
        &mut self,
        node: NodeId,
        start: &Expr,
        end: &Expr,
        expected: Option<&Type>,
    ) -> Type {
        let slot = element_slot(expected);
        let start_type = self.check_expr(start, slot.as_ref());
        let end_type = self.check_expr(end, slot.as_ref());
        let mut valid = true;
        for (bound, ty, label) in [(start, &start_type, "start"), (end, &end_type, "end")] {
            let resolved = ty.resolved();
            if !(resolved.is_numeric() || is_open(&resolved)) {
                self.error(bound.id(), format!("range {label} must be numeric (got {ty})"));
                valid = false;
            }
        }
        if !valid {
            return Type::Range(Box::new(Type::Unknown));
        }
        match arithmetic_result(&start_type, &end_type) {
            Ok(element) => Type::Range(Box::new(settle(&element))),
            Err(_) => {
                self.error(
                    node,
                    format!(
                        "range bounds must share a numeric type (got {start_type} and {end_type})"
                    ),
                );
                Type::Range(Box::new(Type::Unknown))
            }
        }
    }

    fn require_integer_index(&mut self, node: NodeId, index: &Type) {
        let resolved = index.resolved();
        if !(resolved.is_integer() || is_open(&resolved)) {
            self.error(node, format!("index must be an integer (got {index})"));
        }
    }

    fn check_index(&mut self, node: NodeId, object: &Expr, index: &Expr) -> Type {
        let object_type = self.check_expr(object, None);
        match object_type.resolved() {
            Type::Unknown | Type::TypeParameter(_) => {
                self.check_expr(index, None);
                Type::Unknown
            }
            Type::Array(element) => {
                let index_type = self.check_expr(index, None);
                self.require_integer_index(index.id(), &index_type);
                *element
            }
            Type::Primitive(crate::types::PrimitiveKind::String) => {
                let index_type = self.check_expr(index, None);
                self.require_integer_index(index.id(), &index_type);
                Type::char()
            }
            Type::Map(key, value) => {
                let index_type = self.check_expr(index, Some(key.as_ref()));
                self.check_value(index.id(), &index_type, &key, |actual, expected| {
                    format!("index expects type {expected}, got {actual}")
                });
                Type::nullable(*value)
            }
            _ => match self.index_method(&object_type, "Index", "get") {
                Some(method) => {
                    let slot = method.params.get(1).cloned().unwrap_or_default();
                    let index_type = self.check_expr(index, concrete(slot.clone()).as_ref());
                    self.check_value(index.id(), &index_type, &slot, |actual, expected| {
                        format!("index expects type {expected}, got {actual}")
                    });
                    (*method.ret).clone()
                }
                None => {
                    self.check_expr(index, None);
                    self.error(node, format!("cannot index into type {object_type}"));
                    Type::Unknown
                }
            },
        }
    }

    /// Method `method` of the implementation of `interface` for `receiver`, bindings applied.
    fn index_method(&self, receiver: &Type, interface: &str, method: &str) -> Option<FunctionType> {
        use crate::solver::ImplementationLookup;
        let solver = self.solver();
        match solver.implementation_provides(
            receiver,
            &crate::types::InterfaceRef::named(interface),
            0,
        ) {
            ImplementationLookup::Found { spec, bindings } => spec
                .methods
                .get(method)
                .or_else(|| spec.methods.values().next())
                .map(|sig| crate::substitute::substitute_function(sig, &bindings)),
            _ => None,
        }
    }

    fn check_assignment(
        &mut self,
        node: NodeId,
        op: AssignOp,
        target: &AssignTarget,
        value: &Expr,
    ) -> Type {
        match target {
            AssignTarget::Pattern(pattern) => match op {
                AssignOp::Declare => {
                    let annotation = match pattern {
                        Pattern::Typed { ty, .. } => concrete(self.resolve_type(ty)),
                        _ => None,
                    };
                    let value_type = self.check_expr(value, annotation.as_ref());
                    let names = pattern_names(pattern);
                    if !names.is_empty()
                        && names.iter().all(|name| self.env.defined_innermost(name))
                    {
                        self.error(node, "':=' requires at least one new binding");
                    }
                    self.bind_pattern(pattern, &value_type, BindMode::Declare);
                    value_type
                }
                AssignOp::Assign => {
                    let existing = match pattern {
                        Pattern::Ident(ident) => self.env.lookup(&ident.name).cloned(),
                        _ => None,
                    };
                    let hint = existing.clone().and_then(concrete);
                    let value_type = self.check_expr(value, hint.as_ref());
                    match (pattern, existing) {
                        (Pattern::Ident(ident), Some(current)) if !current.is_unknown() => {
                            self.check_value(value.id(), &value_type, &current, |actual, expected| {
                                format!("cannot assign {actual} to '{}' (expected {expected})", ident.name)
                            });
                            self.record(ident.id, current);
                        }
                        (Pattern::Ident(_), Some(_)) => {
                            self.bind_pattern(pattern, &value_type, BindMode::Assign)
                        }
                        (Pattern::Ident(_), None) => {
                            self.bind_pattern(pattern, &value_type, BindMode::Declare)
                        }
                        _ => self.bind_pattern(pattern, &value_type, BindMode::Assign),
                    }
                    value_type
                }
                AssignOp::Compound(binary) => {
                    let current = match pattern {
                        Pattern::Ident(ident) => self.check_identifier(ident),
                        _ => {
                            self.error(node, "compound assignment requires a name");
                            Type::Unknown
                        }
                    };
                    let value_type = self.check_expr(value, concrete(current.clone()).as_ref());
                    self.binary_result(node, binary, &current, &value_type)
                }
            },
            AssignTarget::Place(place) => {
                let ty = match place.as_ref() {
                    Expr::Member {
                        object, member, ..
                    } => self.check_member_assignment(node, op, object, member, value),
                    Expr::Index { object, index, .. } => {
                        self.check_index_assignment(node, op, object, index, value)
                    }
                    other => {
                        self.check_expr(other, None);
                        self.check_expr(value, None);
                        self.error(node, "invalid assignment target");
                        Type::Unknown
                    }
                };
                self.record(place.id(), ty.clone());
                ty
            }
        }
    }

    fn check_member_assignment(
        &mut self,
        node: NodeId,
        op: AssignOp,
        object: &Expr,
        member: &Identifier,
        value: &Expr,
    ) -> Type {
        if op == AssignOp::Declare {
            self.error(node, "cannot declare new binding on member assignment");
        }
        let object_type = self.check_expr(object, None);
        let field = self.field_type(&object_type, &member.name);
        let hint = field.clone().and_then(concrete);
        let value_type = self.check_expr(value, hint.as_ref());
        let Some(field) = field else {
            let resolved = object_type.resolved();
            let is_struct = resolved
                .nominal_name()
                .is_some_and(|name| self.env.lookup_struct(name).is_some());
            if is_struct {
                self.error(
                    member.id,
                    format!("{object_type} has no member '{}'", member.name),
                );
            }
            return Type::Unknown;
        };
        match op {
            AssignOp::Compound(binary) => {
                let result = self.binary_result(node, binary, &field, &value_type);
                self.check_value(value.id(), &result, &field, |actual, expected| {
                    format!("cannot assign {actual} to member (expected {expected})")
                });
            }
            _ => {
                self.check_value(value.id(), &value_type, &field, |actual, expected| {
                    format!("cannot assign {actual} to member (expected {expected})")
                });
            }
        }
        field
    }

    fn check_index_assignment(
        &mut self,
        node: NodeId,
        op: AssignOp,
        object: &Expr,
        index: &Expr,
        value: &Expr,
    ) -> Type {
        if op == AssignOp::Declare {
            self.error(node, "cannot use := on index assignment");
        }
        let object_type = self.check_expr(object, None);
        let (key, slot) = match object_type.resolved() {
            Type::Unknown | Type::TypeParameter(_) => (None, None),
            Type::Array(element) => (None, Some(*element)),
            Type::Map(key, value) => (Some(*key), Some(*value)),
            _ => match self.index_method(&object_type, "IndexMut", "set") {
                Some(method) => (method.params.get(1).cloned(), method.params.get(2).cloned()),
                None => {
                    self.check_expr(index, None);
                    self.check_expr(value, None);
                    self.error(
                        node,
                        format!(
                            "cannot assign via [] without IndexMut implementation on type {object_type}"
                        ),
                    );
                    return Type::Unknown;
                }
            },
        };
        let index_type = self.check_expr(index, key.clone().and_then(concrete).as_ref());
        match &key {
            Some(key) => {
                self.check_value(index.id(), &index_type, key, |actual, expected| {
                    format!("index expects type {expected}, got {actual}")
                });
            }
            None if matches!(object_type.resolved(), Type::Array(_)) => {
                self.require_integer_index(index.id(), &index_type)
            }
            None => {}
        }
        let value_type = self.check_expr(value, slot.clone().and_then(concrete).as_ref());
        let Some(slot) = slot else {
            return value_type;
        };
        let assigned = match op {
            AssignOp::Compound(binary) => self.binary_result(node, binary, &slot, &value_type),
            _ => value_type,
        };
        self.check_value(value.id(), &assigned, &slot, |actual, expected| {
            format!("index assignment expects value type {expected}, got {actual}")
        });
        slot
    }

    fn check_lambda(
        &mut self,
        params: &[Param],
        return_type: Option<&TypeExpr>,
        body: &Expr,
        expected: Option<&Type>,
    ) -> Type {
        let expected_fn = match expected.map(Type::resolved) {
            Some(Type::Function(func)) => Some(func),
            _ => None,
        };
        self.env.push();
        let mut param_types = Vec::with_capacity(params.len());
        for (idx, param) in params.iter().enumerate() {
            let ty = match &param.ty {
                Some(ty) => self.resolve_type(ty),
                None => expected_fn
                    .as_ref()
                    .and_then(|func| func.params.get(idx).cloned())
                    .and_then(concrete)
                    .unwrap_or_default(),
            };
            self.bind_pattern(&param.pattern, &ty, BindMode::Declare);
            param_types.push(ty);
        }
        let annotated = return_type.map(|ty| self.resolve_type(ty));
        let hint = annotated.clone().or_else(|| {
            expected_fn
                .as_ref()
                .and_then(|func| concrete((*func.ret).clone()))
        });
        let saved = self.enter_function(annotated.clone());
        let body_type = self.check_expr(body, hint.as_ref());
        let frame = self.leave_function(saved);
        self.env.pop();

        let ret = match annotated {
            Some(annotated) => {
                self.check_value(body.id(), &body_type, &annotated, |actual, expected| {
                    format!("lambda body returns {actual}, expected {expected}")
                });
                annotated
            }
            None => {
                let mut candidates = frame.returns;
                candidates.push(body_type);
                merge_branches(candidates)
            }
        };
        Type::Function(FunctionType::new(param_types, ret))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(kind: IntegerKind, value: i64) -> Type {
        flexible_integer(kind, BigInt::from(value))
    }

    #[test]
    fn flexible_literal_adopts_the_other_operand() {
        let result = arithmetic_result(&Type::int(IntegerKind::U8), &literal(IntegerKind::I32, 3));
        assert_eq!(result, Ok(Type::int(IntegerKind::U8)));
    }

    #[test]
    fn mixed_float_and_integer_is_rejected() {
        let err = arithmetic_result(
            &Type::float(FloatKind::F64),
            &Type::int(IntegerKind::I32),
        )
        .expect_err("mixed operands");
        assert_eq!(err, "cannot mix float and integer operands (got f64 and i32)");
    }

    #[test]
    fn integer_division_yields_f64() {
        assert_eq!(
            division_result(&Type::int(IntegerKind::I32), &Type::int(IntegerKind::I64)),
            Ok(Type::float(FloatKind::F64))
        );
    }

    #[test]
    fn numeric_slot_looks_through_nullable_and_single_numeric_unions() {
        let union = Type::union_of(vec![Type::int(IntegerKind::U8), Type::string()]);
        assert!(matches!(
            numeric_slot(&Type::nullable(union)),
            Some(NumericSlot::Integer(IntegerKind::U8))
        ));
        let ambiguous = Type::union_of(vec![Type::int(IntegerKind::U8), Type::int(IntegerKind::I64)]);
        assert!(numeric_slot(&ambiguous).is_none());
    }
}
