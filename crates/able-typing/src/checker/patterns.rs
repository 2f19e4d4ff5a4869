use std::sync::Arc;

use able_syntax::{FieldPattern, Identifier, Pattern};

use super::{TypeChecker, settle};
use crate::substitute::{Bindings, bind_params, substitute};
use crate::types::{StructInfo, Type};

/// Whether a pattern introduces fresh bindings or rebinds existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BindMode {
    Declare,
    Assign,
}

/// Names bound by a pattern, in source order.
pub(super) fn pattern_names(pattern: &Pattern) -> Vec<&str> {
    let mut names = Vec::new();
    collect_pattern_names(pattern, &mut names);
    names
}

fn collect_pattern_names<'a>(pattern: &'a Pattern, out: &mut Vec<&'a str>) {
    match pattern {
        Pattern::Ident(ident) => out.push(&ident.name),
        Pattern::Wildcard { .. } | Pattern::Literal { .. } => {}
        Pattern::Struct { fields, .. } => {
            for field in fields {
                collect_pattern_names(&field.pattern, out);
            }
        }
        Pattern::Array { elements, rest, .. } => {
            for element in elements {
                collect_pattern_names(element, out);
            }
            if let Some(rest) = rest {
                collect_pattern_names(rest, out);
            }
        }
        Pattern::Typed { pattern, .. } => collect_pattern_names(pattern, out),
    }
}

/// Type arguments carried by `subject` for struct `name`, looking into unions.
fn struct_args(subject: &Type, name: &str) -> Option<Vec<Type>> {
    match subject {
        Type::StructInstance { name: own, args } if own == name => Some(args.clone()),
        Type::Struct(own) if own == name => Some(Vec::new()),
        Type::Nullable(inner) => struct_args(inner, name),
        Type::Union(union) => union
            .variants
            .iter()
            .find_map(|variant| struct_args(&variant.resolved(), name)),
        _ => None,
    }
}

impl TypeChecker {
    /// Binds the names of `pattern` against a value of type `value`.
    pub(super) fn bind_pattern(&mut self, pattern: &Pattern, value: &Type, mode: BindMode) {
        match pattern {
            Pattern::Ident(ident) => {
                if ident.name == "_" {
                    return;
                }
                let ty = settle(value);
                match mode {
                    BindMode::Declare => self.env.define(ident.name.clone(), ty.clone()),
                    BindMode::Assign => self.env.assign(&ident.name, ty.clone()),
                }
                self.record(ident.id, ty);
            }
            Pattern::Wildcard { .. } => {}
            Pattern::Literal { value: literal, .. } => {
                self.check_expr(literal, None);
            }
            Pattern::Typed { pattern, ty, id } => {
                let declared = self.resolve_type(ty);
                let adopted = if declared.is_unknown() {
                    value.clone()
                } else {
                    declared
                };
                self.record(*id, adopted.clone());
                self.bind_pattern(pattern, &adopted, mode);
            }
            Pattern::Struct {
                id,
                name,
                fields,
                ..
            } => self.bind_struct_pattern(*id, name.as_ref(), fields, value, mode),
            Pattern::Array {
                id,
                elements,
                rest,
            } => {
                let element = match value.resolved() {
                    Type::Array(element) => *element,
                    Type::Unknown | Type::TypeParameter(_) => Type::Unknown,
                    other => {
                        self.error(*id, format!("array pattern cannot match type {other}"));
                        Type::Unknown
                    }
                };
                for pattern in elements {
                    self.bind_pattern(pattern, &element, mode);
                }
                if let Some(rest) = rest {
                    self.bind_pattern(rest, &Type::array(element), mode);
                }
            }
        }
    }

    fn bind_struct_pattern(
        &mut self,
        node: able_base::NodeId,
        name: Option<&Identifier>,
        fields: &[FieldPattern],
        value: &Type,
        mode: BindMode,
    ) {
        let subject = value.resolved();
        let info: Option<Arc<StructInfo>> = match name {
            Some(name) => {
                let info = self.env.lookup_struct(&name.name).cloned();
                if info.is_none() {
                    self.error(name.id, format!("unknown struct '{}'", name.name));
                }
                info
            }
            None => match subject.nominal_name() {
                Some(nominal) => self.env.lookup_struct(nominal).cloned(),
                None => None,
            },
        };
        let Some(info) = info else {
            if name.is_none() && !subject.is_unknown() && !subject.is_type_parameter() {
                self.error(node, format!("struct pattern cannot match type {value}"));
            }
            for field in fields {
                self.bind_pattern(&field.pattern, &Type::Unknown, mode);
            }
            return;
        };
        let bindings: Bindings = struct_args(&subject, &info.name)
            .map(|args| bind_params(&info.type_params, &args))
            .unwrap_or_default();
        for (idx, field) in fields.iter().enumerate() {
            let declared = match &field.field {
                Some(field_name) => info.field(&field_name.name),
                None => info.fields.get(idx).map(|(_, ty)| ty),
            };
            let declared = match declared {
                Some(ty) => substitute(ty, &bindings),
                None => {
                    let label = field
                        .field
                        .as_ref()
                        .map(|field_name| field_name.name.clone())
                        .unwrap_or_else(|| idx.to_string());
                    self.error(field.id, format!("struct pattern field '{label}' not found"));
                    Type::Unknown
                }
            };
            self.bind_pattern(&field.pattern, &declared, mode);
        }
    }
}
