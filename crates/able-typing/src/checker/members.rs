use able_base::NodeId;
use able_syntax::{Expr, Identifier, IntegerKind};

use super::TypeChecker;
use super::calls::CallSite;
use crate::builtins::{ITERATOR_END, PROC_ERROR, proc_status};
use crate::substitute::{Bindings, bind_params, substitute, substitute_function};
use crate::types::{FunctionType, SELF_TYPE, Type};

/// What a `receiver.name` access resolved to.
#[derive(Debug)]
enum Member {
    /// A value: struct field, package symbol or named-implementation method.
    Value(Type),
    /// Methods taking the receiver as their first parameter.
    Methods(Vec<FunctionType>),
    /// Nothing matched; a diagnostic has been reported.
    Missing,
}

fn method(receiver: &Type, params: Vec<Type>, ret: Type) -> FunctionType {
    let mut all = vec![receiver.clone()];
    all.extend(params);
    FunctionType::new(all, ret)
}

/// Methods every builtin container provides without a declaration.
fn native_method(receiver: &Type, name: &str) -> Option<FunctionType> {
    let index = || Type::int(IntegerKind::I32);
    let sig = |params: Vec<Type>, ret: Type| Some(method(receiver, params, ret));
    match receiver {
        Type::Array(element) => {
            let element = (**element).clone();
            match name {
                "len" => sig(vec![], index()),
                "push" => sig(vec![element], Type::void()),
                "pop" => sig(vec![], Type::nullable(element)),
                "get" => sig(vec![index()], Type::nullable(element)),
                "set" => sig(vec![index(), element], Type::void()),
                "clear" => sig(vec![], Type::void()),
                "contains" => sig(vec![element], Type::bool()),
                "iterator" => sig(vec![], Type::Iterator(Box::new(element))),
                _ => None,
            }
        }
        Type::Map(key, value) => {
            let (key, value) = ((**key).clone(), (**value).clone());
            match name {
                "len" => sig(vec![], index()),
                "get" => sig(vec![key], Type::nullable(value)),
                "set" => sig(vec![key, value], Type::void()),
                "contains" => sig(vec![key], Type::bool()),
                "remove" => sig(vec![key], Type::nullable(value)),
                "keys" => sig(vec![], Type::array(key)),
                "values" => sig(vec![], Type::array(value)),
                "clear" => sig(vec![], Type::void()),
                _ => None,
            }
        }
        Type::Range(element) => match name {
            "iterator" => sig(vec![], Type::Iterator(element.clone())),
            "contains" => sig(vec![(**element).clone()], Type::bool()),
            _ => None,
        },
        Type::Iterator(element) => match name {
            "next" => sig(
                vec![],
                Type::union_of(vec![
                    (**element).clone(),
                    Type::Struct(ITERATOR_END.to_string()),
                ]),
            ),
            "close" => sig(vec![], Type::nil()),
            _ => None,
        },
        Type::Proc(inner) => match name {
            "value" => sig(
                vec![],
                Type::union_of(vec![(**inner).clone(), Type::Struct(PROC_ERROR.to_string())]),
            ),
            "status" => sig(vec![], proc_status()),
            "cancel" => sig(vec![], Type::nil()),
            _ => None,
        },
        Type::Future(inner) => match name {
            "value" => sig(vec![], (**inner).clone()),
            "status" => sig(vec![], proc_status()),
            _ => None,
        },
        Type::Primitive(crate::types::PrimitiveKind::String) => match name {
            "len" => sig(vec![], index()),
            "contains" => sig(vec![Type::string()], Type::bool()),
            "split" => sig(vec![Type::string()], Type::array(Type::string())),
            "trim" => sig(vec![], Type::string()),
            _ => None,
        },
        _ => None,
    }
}

fn push_unique(found: &mut Vec<FunctionType>, signature: FunctionType) {
    if !found.contains(&signature) {
        found.push(signature);
    }
}

fn strip_nullable(ty: &Type) -> Type {
    match ty.resolved() {
        Type::Nullable(inner) => *inner,
        other => other,
    }
}

impl TypeChecker {
    /// Declared type of a struct field on `receiver`, with the instance's type arguments applied.
    pub(super) fn field_type(&self, receiver: &Type, field: &str) -> Option<Type> {
        let (name, args) = match receiver.resolved() {
            Type::Struct(name) => (name, Vec::new()),
            Type::StructInstance { name, args } => (name, args),
            _ => return None,
        };
        let info = self.env.lookup_struct(&name)?;
        let declared = info.field(field)?;
        let bindings = bind_params(&info.type_params, &args);
        Some(substitute(declared, &bindings))
    }

    /// `object.member` outside a call. Methods are returned with the receiver bound.
    pub(super) fn check_member_access(
        &mut self,
        object: &Expr,
        member: &Identifier,
        safe: bool,
    ) -> Type {
        let object_type = self.check_expr(object, None);
        let receiver = if safe {
            strip_nullable(&object_type)
        } else {
            object_type.clone()
        };
        let ty = match self.lookup_member(member, &receiver) {
            Member::Value(ty) => ty,
            Member::Methods(mut methods) if methods.len() == 1 => {
                Type::Function(methods.remove(0).bind_receiver())
            }
            Member::Methods(methods) => {
                Type::Overloads(methods.iter().map(FunctionType::bind_receiver).collect())
            }
            Member::Missing => Type::Unknown,
        };
        self.record(member.id, ty.clone());
        self.wrap_safe(safe, &object_type, ty)
    }

    pub(super) fn check_method_call(
        &mut self,
        site: CallSite<'_>,
        callee: NodeId,
        object: &Expr,
        member: &Identifier,
        safe: bool,
    ) -> Type {
        let object_type = self.check_expr(object, None);
        let receiver = if safe {
            strip_nullable(&object_type)
        } else {
            object_type.clone()
        };
        let result = match self.lookup_member(member, &receiver) {
            Member::Value(ty) => {
                self.record(callee, ty.clone());
                self.call_value(site, &member.name, ty)
            }
            Member::Methods(methods) => {
                if let [only] = methods.as_slice() {
                    self.record(callee, Type::Function(only.bind_receiver()));
                }
                self.call_candidates(site, &member.name, methods, Some(receiver))
            }
            Member::Missing => {
                self.check_arguments_loosely(site.args);
                Type::Unknown
            }
        };
        self.wrap_safe(safe, &object_type, result)
    }

    fn wrap_safe(&self, safe: bool, object_type: &Type, ty: Type) -> Type {
        let nullable_object = matches!(object_type.resolved(), Type::Nullable(_));
        if safe && nullable_object && !ty.is_unknown() {
            Type::nullable(ty)
        } else {
            ty
        }
    }

    fn lookup_member(&mut self, member: &Identifier, receiver: &Type) -> Member {
        let name = member.name.as_str();
        let resolved = receiver.resolved();
        match &resolved {
            Type::Unknown => return Member::Value(Type::Unknown),
            Type::Package(package) => {
                return match package.symbols.get(name) {
                    Some(ty) => Member::Value(ty.clone()),
                    None => {
                        self.error(
                            member.id,
                            format!("package '{}' has no symbol '{name}'", package.name),
                        );
                        Member::Missing
                    }
                };
            }
            Type::ImplementationNamespace(namespace) => {
                return match namespace.methods.get(name) {
                    Some(signature) => Member::Value(Type::Function(signature.clone())),
                    None => {
                        self.error(
                            member.id,
                            format!(
                                "implementation '{}' has no method '{name}'",
                                namespace.name
                            ),
                        );
                        Member::Missing
                    }
                };
            }
            _ => {}
        }
        if let Some(field) = self.field_type(&resolved, name) {
            return Member::Value(field);
        }

        let inherent = self.inherent_methods(member, &resolved);
        if !inherent.is_empty() {
            tracing::trace!(method = name, candidates = inherent.len(), "inherent methods");
            return Member::Methods(inherent);
        }
        let ufcs = self.ufcs_functions(name, &resolved);
        if !ufcs.is_empty() {
            tracing::trace!(method = name, candidates = ufcs.len(), "free functions via UFCS");
            return Member::Methods(ufcs);
        }
        self.report_missing_member(member, receiver, &resolved);
        Member::Missing
    }

    /// Method sets, implementations, constraint bounds and native container methods.
    fn inherent_methods(&mut self, member: &Identifier, receiver: &Type) -> Vec<FunctionType> {
        let name = member.name.as_str();
        let mut found = Vec::new();
        let ambiguities = {
            let solver = self.solver();
            for (_, signature) in solver.method_set_methods(receiver, name) {
                push_unique(&mut found, signature);
            }
            let lookup = solver.implementation_method(receiver, name);
            for (_, signature) in lookup.found {
                push_unique(&mut found, signature);
            }
            lookup.ambiguities
        };
        for detail in ambiguities {
            self.error(member.id, detail);
        }

        match receiver {
            Type::TypeParameter(param) => {
                for bound in self.type_param_bounds(param) {
                    if let Some(signature) = self.interface_method(&bound, name, receiver) {
                        push_unique(&mut found, signature);
                    }
                }
            }
            Type::Interface(iface) => {
                if let Some(signature) = self.interface_method(iface, name, receiver) {
                    push_unique(&mut found, signature);
                }
            }
            _ => {}
        }
        if found.is_empty() {
            found.extend(native_method(receiver, name));
        }
        found
    }

    fn interface_method(
        &self,
        iface: &crate::types::InterfaceRef,
        name: &str,
        receiver: &Type,
    ) -> Option<FunctionType> {
        let info = self.env.lookup_interface(&iface.name)?;
        let signature = info.methods.get(name)?;
        let mut bindings: Bindings = bind_params(&info.type_params, &iface.args);
        bindings.insert(SELF_TYPE.to_string(), receiver.clone());
        Some(substitute_function(signature, &bindings))
    }

    /// Free functions named `name` whose first parameter accepts the receiver.
    fn ufcs_functions(&self, name: &str, receiver: &Type) -> Vec<FunctionType> {
        let candidates = match self.env.lookup(name) {
            Some(Type::Function(signature)) => vec![signature.clone()],
            Some(Type::Overloads(signatures)) => signatures.clone(),
            _ => return Vec::new(),
        };
        candidates
            .into_iter()
            .filter(|signature| {
                signature
                    .params
                    .first()
                    .is_some_and(|first| self.accepts(receiver, first))
            })
            .collect()
    }

    fn report_missing_member(&mut self, member: &Identifier, receiver: &Type, resolved: &Type) {
        let name = &member.name;
        let message = match resolved {
            Type::Iterator(_) => format!("iterator has no member '{name}'"),
            Type::Proc(_) => format!("proc handle has no member '{name}'"),
            Type::Future(_) if name == "cancel" => "future handles do not support cancel()".into(),
            Type::Future(_) => format!("future handle has no member '{name}'"),
            Type::TypeParameter(param) => {
                format!("cannot access member '{name}' on type parameter {param}")
            }
            Type::Interface(iface) => {
                format!("interface '{}' has no method '{name}'", iface.name)
            }
            Type::Struct(_)
            | Type::StructInstance { .. }
            | Type::Union(_)
            | Type::Array(_)
            | Type::Map(_, _)
            | Type::Range(_)
            | Type::Primitive(crate::types::PrimitiveKind::String) => {
                format!("{receiver} has no member '{name}'")
            }
            other => format!("cannot access member '{name}' on type {other}"),
        };
        self.error(member.id, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_methods_take_the_receiver_first() {
        let receiver = Type::array(Type::string());
        let push = native_method(&receiver, "push").expect("push");
        assert_eq!(push.params, vec![receiver.clone(), Type::string()]);
        assert_eq!(Type::Function(push.bind_receiver()).to_string(), "fn(String) -> void");
        assert!(native_method(&receiver, "explode").is_none());
    }

    #[test]
    fn proc_value_can_fail_but_future_value_cannot() {
        let proc_value = native_method(&Type::Proc(Box::new(Type::bool())), "value")
            .expect("proc value");
        insta::assert_snapshot!(proc_value.ret.to_string(), @"bool | ProcError");
        let future_value = native_method(&Type::Future(Box::new(Type::bool())), "value")
            .expect("future value");
        assert_eq!(*future_value.ret, Type::bool());
        assert!(native_method(&Type::Future(Box::new(Type::bool())), "cancel").is_none());
    }
}
