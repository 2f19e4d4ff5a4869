use std::collections::BTreeMap;

use able_syntax::{ImportDecl, Module, Statement};
use rustc_hash::FxHashSet;

use super::{MODULE_DEPTH, TypeChecker};
use crate::env::Scope;
use crate::types::{ExportedSymbol, PackageType, Type};

/// Name, node and privacy of a top-level declaration.
fn declared_name(statement: &Statement) -> Option<(&str, able_base::NodeId, bool)> {
    match statement {
        Statement::Struct(def) => Some((&def.name.name, def.id, def.private)),
        Statement::Union(def) => Some((&def.name.name, def.id, def.private)),
        Statement::Interface(def) => Some((&def.name.name, def.id, def.private)),
        Statement::TypeAlias(def) => Some((&def.name.name, def.id, def.private)),
        Statement::Function(def) => Some((&def.name.name, def.id, def.private)),
        Statement::Impl(def) => def
            .name
            .as_ref()
            .map(|name| (name.name.as_str(), def.id, def.private)),
        _ => None,
    }
}

impl TypeChecker {
    /// Resolves an import path by its dotted name, falling back to its last segment.
    fn find_package(&self, import: &ImportDecl) -> Option<PackageType> {
        let dotted = import.dotted();
        let last = import.path.last().map(|segment| segment.name.as_str());
        std::iter::once(dotted.as_str())
            .chain(last)
            .find_map(|key| match self.env.lookup(key) {
                Some(Type::Package(package)) => Some(package.clone()),
                _ => None,
            })
    }

    fn bind_import(&mut self, name: &str, ty: Type) {
        if let Some(scope) = self.env.scope_mut(MODULE_DEPTH) {
            scope.define(name, ty);
        }
    }

    /// Binds imported packages and symbols into the module scope.
    pub(super) fn check_imports(&mut self, module: &Module) {
        for import in &module.imports {
            let Some(package) = self.find_package(import) else {
                self.error(
                    import.id,
                    format!("import references unknown package '{}'", import.dotted()),
                );
                continue;
            };
            if import.wildcard {
                for (name, ty) in &package.symbols {
                    self.bind_import(name, ty.clone());
                }
                continue;
            }
            if !import.selectors.is_empty() {
                for selector in &import.selectors {
                    let name = &selector.name.name;
                    let Some(ty) = package.symbols.get(name).cloned() else {
                        self.error(
                            selector.name.id,
                            format!("package '{}' has no symbol '{name}'", package.name),
                        );
                        continue;
                    };
                    let local = selector.alias.as_ref().unwrap_or(&selector.name);
                    self.bind_import(&local.name, ty);
                }
                continue;
            }
            let local = match (&import.alias, import.path.last()) {
                (Some(alias), _) => alias.name.clone(),
                (None, Some(last)) => last.name.clone(),
                (None, None) => continue,
            };
            tracing::trace!(package = %package.name, binding = %local, "package imported");
            self.bind_import(&local, Type::Package(package));
        }
    }

    /// Records every public top-level declaration once, with its final module-scope type.
    pub(super) fn collect_exports(&mut self, module: &Module) {
        let mut seen = FxHashSet::default();
        let mut exports = Vec::new();
        for statement in &module.body {
            let Some((name, node, private)) = declared_name(statement) else {
                continue;
            };
            if private || !seen.insert(name.to_string()) {
                continue;
            }
            let Some(ty) = self.module_scope().and_then(|scope| scope.get(name)) else {
                continue;
            };
            exports.push(ExportedSymbol {
                name: name.to_string(),
                ty: ty.clone(),
                node,
            });
        }
        self.exports = exports;
    }

    /// Snapshot of the last module's exports for [`set_prelude`](Self::set_prelude) of a
    /// dependent module. Exports are bound by name and under a `Package` entry for `package`.
    pub fn exported_scope(&self, package: &str) -> Scope {
        let mut scope = Scope::new();
        let mut symbols = BTreeMap::new();
        for symbol in &self.exports {
            scope.define(symbol.name.clone(), symbol.ty.clone());
            symbols.insert(symbol.name.clone(), symbol.ty.clone());
        }
        if let Some(module) = self.module_scope() {
            for info in module.structs() {
                if symbols.contains_key(&info.name) {
                    scope.adopt_struct(info.clone());
                }
            }
            for info in module.interfaces() {
                if symbols.contains_key(&info.name) {
                    scope.adopt_interface(info.clone());
                }
            }
        }
        if !package.is_empty() {
            scope.define(
                package,
                Type::Package(PackageType {
                    name: package.to_string(),
                    symbols,
                }),
            );
        }
        scope
    }
}
