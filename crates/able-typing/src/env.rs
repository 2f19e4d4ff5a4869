use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::types::{InterfaceInfo, StructInfo, Type};

/// One level of name bindings.
///
/// Besides value bindings a scope owns the definitions of the interfaces and structs declared
/// in it. Types refer to those definitions by name, so definitions never contain themselves.
/// Cloning a scope yields an independent snapshot: later definitions in either copy are not
/// visible in the other.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    values: FxHashMap<String, Type>,
    interfaces: FxHashMap<String, Arc<InterfaceInfo>>,
    structs: FxHashMap<String, Arc<StructInfo>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: impl Into<String>, ty: Type) {
        self.values.insert(name.into(), ty);
    }

    pub fn define_interface(&mut self, info: InterfaceInfo) {
        self.values
            .insert(info.name.clone(), Type::interface(info.name.clone()));
        self.interfaces.insert(info.name.clone(), Arc::new(info));
    }

    pub fn define_struct(&mut self, info: StructInfo) {
        self.values
            .insert(info.name.clone(), Type::Struct(info.name.clone()));
        self.structs.insert(info.name.clone(), Arc::new(info));
    }

    /// Copies a definition shared with another scope without re-allocating it.
    pub fn adopt_interface(&mut self, info: Arc<InterfaceInfo>) {
        self.interfaces.insert(info.name.clone(), info);
    }

    pub fn adopt_struct(&mut self, info: Arc<StructInfo>) {
        self.structs.insert(info.name.clone(), info);
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn interface(&self, name: &str) -> Option<&Arc<InterfaceInfo>> {
        self.interfaces.get(name)
    }

    pub fn struct_info(&self, name: &str) -> Option<&Arc<StructInfo>> {
        self.structs.get(name)
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&String, &Type)> {
        self.values.iter()
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &Arc<InterfaceInfo>> {
        self.interfaces.values()
    }

    pub fn structs(&self) -> impl Iterator<Item = &Arc<StructInfo>> {
        self.structs.values()
    }

    /// Copies every binding and definition of `other` into this scope, replacing clashes.
    pub fn extend_from(&mut self, other: &Scope) {
        for (name, ty) in &other.values {
            self.values.insert(name.clone(), ty.clone());
        }
        for (name, info) in &other.interfaces {
            self.interfaces.insert(name.clone(), Arc::clone(info));
        }
        for (name, info) in &other.structs {
            self.structs.insert(name.clone(), Arc::clone(info));
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Chain of scopes; lookups walk from the innermost scope outwards.
///
/// Index 0 is the checker's global scope. While a module is being checked index 1 holds the
/// prelude and index 2 the module's own declarations.
#[derive(Debug, Clone)]
pub struct Environment {
    scopes: Vec<Scope>,
}

impl Environment {
    pub fn new(global: Scope) -> Self {
        Self {
            scopes: vec![global],
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(Scope::new());
    }

    pub fn push_scope(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    /// Removes the innermost scope; the global scope is never popped.
    pub fn pop(&mut self) -> Option<Scope> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn truncate(&mut self, depth: usize) {
        self.scopes.truncate(depth.max(1));
    }

    fn innermost(&mut self) -> &mut Scope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    pub fn define(&mut self, name: impl Into<String>, ty: Type) {
        self.innermost().define(name, ty);
    }

    pub fn define_interface(&mut self, info: InterfaceInfo) {
        self.innermost().define_interface(info);
    }

    pub fn define_struct(&mut self, info: StructInfo) {
        self.innermost().define_struct(info);
    }

    /// Rebinds the nearest existing binding of `name`, or defines it innermost.
    pub fn assign(&mut self, name: &str, ty: Type) {
        for scope in self.scopes.iter_mut().rev() {
            if scope.contains(name) {
                scope.define(name, ty);
                return;
            }
        }
        self.define(name, ty);
    }

    pub fn lookup(&self, name: &str) -> Option<&Type> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn lookup_interface(&self, name: &str) -> Option<&Arc<InterfaceInfo>> {
        self.scopes.iter().rev().find_map(|scope| scope.interface(name))
    }

    pub fn lookup_struct(&self, name: &str) -> Option<&Arc<StructInfo>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.struct_info(name))
    }

    pub fn defined_innermost(&self, name: &str) -> bool {
        self.scopes
            .last()
            .is_some_and(|scope| scope.contains(name))
    }

    pub fn global(&self) -> &Scope {
        &self.scopes[0]
    }

    pub fn scope(&self, depth: usize) -> Option<&Scope> {
        self.scopes.get(depth)
    }

    pub fn scope_mut(&mut self, depth: usize) -> Option<&mut Scope> {
        self.scopes.get_mut(depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_outwards_and_pop_restores() {
        let mut global = Scope::new();
        global.define("x", Type::bool());
        let mut env = Environment::new(global);
        env.push();
        env.define("x", Type::string());
        assert_eq!(env.lookup("x"), Some(&Type::string()));
        env.pop();
        assert_eq!(env.lookup("x"), Some(&Type::bool()));
        assert!(env.pop().is_none(), "global scope stays");
    }

    #[test]
    fn cloned_scope_is_independent() {
        let mut scope = Scope::new();
        scope.define("a", Type::bool());
        let snapshot = scope.clone();
        scope.define("b", Type::string());
        assert!(snapshot.get("b").is_none());
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn extend_from_shares_definitions() {
        let mut producer = Scope::new();
        producer.define_struct(StructInfo {
            name: "Point".into(),
            type_params: Vec::new(),
            fields: vec![("x".into(), Type::bool())],
            positional: false,
            node: able_base::NodeId::DUMMY,
        });
        let mut consumer = Scope::new();
        consumer.define("y", Type::string());
        consumer.extend_from(&producer);
        assert!(consumer.contains("y"));
        assert_eq!(consumer.get("Point"), Some(&Type::Struct("Point".into())));
        let shared = consumer.struct_info("Point").expect("adopted struct");
        assert!(Arc::ptr_eq(shared, producer.struct_info("Point").expect("struct")));
    }

    #[test]
    fn assign_updates_nearest_binding() {
        let mut env = Environment::new(Scope::new());
        env.push();
        env.define("count", Type::Unknown);
        env.push();
        env.assign("count", Type::bool());
        env.pop();
        assert_eq!(env.lookup("count"), Some(&Type::bool()));
    }
}
