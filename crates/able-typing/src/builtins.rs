use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use able_base::NodeId;
use able_syntax::{FloatKind, IntegerKind};

use crate::env::Scope;
use crate::types::{
    FunctionType, ImplementationSpec, InterfaceInfo, SELF_TYPE, StructInfo, Type, UnionType,
};

/// Interfaces whose primitive implementations a module can shadow by declaring its own.
pub const SUPPRESSIBLE_INTERFACES: [&str; 4] = ["Display", "Clone", "Ord", "Error"];

pub const PROC_ERROR: &str = "ProcError";
pub const ITERATOR_END: &str = "IteratorEnd";
pub const PROC_STATUS: &str = "ProcStatus";

const PROC_STATES: [&str; 4] = ["Pending", "Resolved", "Cancelled", "Failed"];

/// Builtin declarations shared by every checker in the process. Never mutated after creation.
#[derive(Debug)]
pub struct BuiltinRegistry {
    scope: Scope,
    implementations: Vec<ImplementationSpec>,
}

static REGISTRY: OnceLock<Arc<BuiltinRegistry>> = OnceLock::new();

impl BuiltinRegistry {
    pub fn shared() -> Arc<BuiltinRegistry> {
        REGISTRY.get_or_init(|| Arc::new(build_registry())).clone()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn implementations(&self) -> &[ImplementationSpec] {
        &self.implementations
    }

    /// Builtin implementations minus those for interfaces the module redeclares.
    pub fn implementations_for<'a>(
        &'a self,
        redeclared: &'a [String],
    ) -> impl Iterator<Item = &'a ImplementationSpec> + 'a {
        self.implementations.iter().filter(move |spec| {
            !(SUPPRESSIBLE_INTERFACES.contains(&spec.interface.as_str())
                && redeclared.iter().any(|name| name == &spec.interface))
        })
    }
}

fn self_method(extra: Vec<Type>, ret: Type) -> FunctionType {
    let mut params = vec![Type::param(SELF_TYPE)];
    params.extend(extra);
    FunctionType::new(params, ret)
}

fn interface(name: &str, methods: Vec<(&str, FunctionType)>) -> InterfaceInfo {
    InterfaceInfo {
        name: name.to_string(),
        type_params: Vec::new(),
        methods: methods
            .into_iter()
            .map(|(method, sig)| (method.to_string(), sig))
            .collect(),
        defaulted: Vec::new(),
        where_clause: Vec::new(),
        node: NodeId::DUMMY,
    }
}

fn singleton(name: &str) -> StructInfo {
    StructInfo {
        name: name.to_string(),
        type_params: Vec::new(),
        fields: Vec::new(),
        positional: false,
        node: NodeId::DUMMY,
    }
}

fn ordering() -> Type {
    Type::Union(UnionType {
        name: Some("Ordering".to_string()),
        type_params: Vec::new(),
        variants: vec![
            Type::Struct("Less".to_string()),
            Type::Struct("Equal".to_string()),
            Type::Struct("Greater".to_string()),
        ],
    })
}

/// Result of `status()` on proc and future handles.
pub fn proc_status() -> Type {
    Type::Union(UnionType {
        name: Some(PROC_STATUS.to_string()),
        type_params: Vec::new(),
        variants: PROC_STATES
            .iter()
            .map(|state| Type::Struct((*state).to_string()))
            .collect(),
    })
}

fn implementation(interface: &InterfaceInfo, target: Type) -> ImplementationSpec {
    let mut bindings = crate::substitute::Bindings::default();
    bindings.insert(SELF_TYPE.to_string(), target.clone());
    let methods: BTreeMap<String, FunctionType> = interface
        .methods
        .iter()
        .map(|(name, sig)| {
            (
                name.clone(),
                crate::substitute::substitute_function(sig, &bindings),
            )
        })
        .collect();
    ImplementationSpec {
        interface: interface.name.clone(),
        interface_args: Vec::new(),
        target,
        methods,
        type_params: Vec::new(),
        where_clause: Vec::new(),
        obligations: Vec::new(),
        impl_name: None,
        node: NodeId::DUMMY,
    }
}

fn build_registry() -> BuiltinRegistry {
    let display = interface("Display", vec![("to_string", self_method(vec![], Type::string()))]);
    let clone = interface(
        "Clone",
        vec![("clone", self_method(vec![], Type::param(SELF_TYPE)))],
    );
    let ord = interface(
        "Ord",
        vec![("cmp", self_method(vec![Type::param(SELF_TYPE)], ordering()))],
    );
    let error = interface(
        "Error",
        vec![
            ("message", self_method(vec![], Type::string())),
            (
                "cause",
                self_method(vec![], Type::nullable(Type::interface("Error"))),
            ),
        ],
    );

    let mut primitives: Vec<Type> = vec![Type::string(), Type::bool(), Type::char()];
    primitives.extend(IntegerKind::ALL.into_iter().map(Type::int));
    primitives.extend([Type::float(FloatKind::F32), Type::float(FloatKind::F64)]);

    let mut implementations = Vec::new();
    for target in &primitives {
        implementations.push(implementation(&display, target.clone()));
        implementations.push(implementation(&clone, target.clone()));
        let orderable = target.is_integer()
            || target.is_string()
            || matches!(target, Type::Primitive(crate::types::PrimitiveKind::Char));
        if orderable {
            implementations.push(implementation(&ord, target.clone()));
        }
    }
    implementations.push(implementation(&error, Type::Struct(PROC_ERROR.to_string())));
    implementations.push(implementation(
        &display,
        Type::Struct(PROC_ERROR.to_string()),
    ));

    let mut scope = Scope::new();
    for info in [display, clone, ord, error] {
        scope.define_interface(info);
    }
    scope.define_struct(StructInfo {
        fields: vec![("details".to_string(), Type::string())],
        ..singleton(PROC_ERROR)
    });
    for name in [ITERATOR_END, "Less", "Equal", "Greater"]
        .into_iter()
        .chain(PROC_STATES)
    {
        scope.define_struct(singleton(name));
    }
    scope.define("Ordering", ordering());
    scope.define(PROC_STATUS, proc_status());
    scope.define(
        "print",
        Type::Function(FunctionType::new(vec![Type::Unknown], Type::void())),
    );

    BuiltinRegistry {
        scope,
        implementations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_shared() {
        let a = BuiltinRegistry::shared();
        let b = BuiltinRegistry::shared();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.scope().interface("Display").is_some());
    }

    #[test]
    fn redeclared_interfaces_are_filtered_without_mutation() {
        let registry = BuiltinRegistry::shared();
        let total = registry.implementations().len();
        let redeclared = vec!["Display".to_string()];
        let filtered: Vec<_> = registry.implementations_for(&redeclared).collect();
        assert!(filtered.iter().all(|spec| spec.interface != "Display"));
        assert!(filtered.len() < total);
        assert_eq!(registry.implementations().len(), total);
    }

    #[test]
    fn error_interface_refers_to_itself_by_name() {
        let registry = BuiltinRegistry::shared();
        let error = registry.scope().interface("Error").expect("Error interface");
        let cause = error.methods.get("cause").expect("cause method");
        assert_eq!(cause.ret.to_string(), "?Error");
    }
}
