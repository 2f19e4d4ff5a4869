use std::collections::BTreeMap;

use able_base::{Diagnostic, NodeId};
use able_syntax::{
    FunctionDef, GenericParam, Identifier, ImplDef, InterfaceDef, MethodsDef, Module, Param,
    Statement, StructDef, StructKind, TypeAliasDef, UnionDef,
};
use rustc_hash::FxHashSet;

use super::{BodyContext, MODULE_DEPTH, TypeChecker, constraint_map};
use crate::assignable::signatures_equivalent;
use crate::solver::deferred_obligations;
use crate::substitute::{Bindings, substitute_function};
use crate::types::{
    AliasType, FunctionType, GenericParamSpec, ImplementationNamespace, ImplementationSpec,
    InterfaceInfo, MethodSetSpec, SELF_TYPE, StructInfo, Type, UnionType,
};

fn generic_names(generics: &[GenericParam]) -> Vec<String> {
    generics.iter().map(|param| param.name.name.clone()).collect()
}

fn unconstrained(generics: &[GenericParam]) -> Vec<GenericParamSpec> {
    generics
        .iter()
        .map(|param| GenericParamSpec::unconstrained(param.name.name.clone()))
        .collect()
}

fn self_bindings(target: &Type) -> Bindings {
    let mut bindings = Bindings::default();
    bindings.insert(SELF_TYPE.to_string(), target.clone());
    bindings
}

impl TypeChecker {
    /// Registers every top-level declaration before any body is inferred, so declarations may
    /// refer to each other regardless of order.
    pub(super) fn collect_declarations(&mut self, module: &Module) {
        for statement in &module.body {
            self.declare_placeholder(statement);
        }
        // Aliases and unions may refer to each other; a second round settles forward references.
        for _ in 0..2 {
            for statement in &module.body {
                match statement {
                    Statement::TypeAlias(def) => self.collect_alias(def),
                    Statement::Union(def) => self.collect_union(def),
                    _ => {}
                }
            }
        }
        for statement in &module.body {
            match statement {
                Statement::Struct(def) => self.collect_struct(def),
                Statement::Interface(def) => self.collect_interface(def),
                _ => {}
            }
        }
        for statement in &module.body {
            if let Statement::Function(def) = statement {
                self.collect_function(def);
            }
        }
        for statement in &module.body {
            match statement {
                Statement::Methods(def) => self.collect_methods(def),
                Statement::Impl(def) => self.collect_impl(def),
                _ => {}
            }
        }
        tracing::debug!(
            declarations = self.declarations.len(),
            implementations = self.implementations.len() - self.local_implementations_start,
            method_sets = self.method_sets.len() - self.local_method_sets_start,
            "declarations collected"
        );
    }

    /// Claims `name` for the declaration `node`; reports a duplicate otherwise.
    pub(super) fn declare_name(&mut self, name: &Identifier, node: NodeId) -> bool {
        match self.declarations.get(&name.name).copied() {
            None => {
                self.declarations.insert(name.name.clone(), node);
                true
            }
            Some(previous) if previous == node => true,
            Some(previous) => {
                self.report_duplicate(name, previous);
                false
            }
        }
    }

    fn owns(&self, name: &str, node: NodeId) -> bool {
        self.declarations.get(name) == Some(&node)
    }

    fn report_duplicate(&mut self, name: &Identifier, previous: NodeId) {
        let mut diagnostic =
            Diagnostic::error(name.id, format!("duplicate declaration '{}'", name.name));
        if let Some(origin) = self.node_origins.get(&previous) {
            diagnostic =
                diagnostic.with_note(format!("previous declaration at {origin}"), Some(previous));
        }
        self.push_diagnostic(diagnostic);
    }

    fn module_define(&mut self, name: &str, ty: Type) {
        if let Some(scope) = self.env.scope_mut(MODULE_DEPTH) {
            scope.define(name, ty);
        }
    }

    fn declare_placeholder(&mut self, statement: &Statement) {
        match statement {
            Statement::Struct(def) => {
                if self.declare_name(&def.name, def.id) {
                    self.env.define_struct(StructInfo {
                        name: def.name.name.clone(),
                        type_params: unconstrained(&def.generics),
                        fields: Vec::new(),
                        positional: def.kind == StructKind::Positional,
                        node: def.id,
                    });
                }
            }
            Statement::Union(def) => {
                if self.declare_name(&def.name, def.id) {
                    self.env.define(
                        def.name.name.clone(),
                        Type::Union(UnionType {
                            name: Some(def.name.name.clone()),
                            type_params: unconstrained(&def.generics),
                            variants: Vec::new(),
                        }),
                    );
                }
            }
            Statement::Interface(def) => {
                if self.declare_name(&def.name, def.id) {
                    self.env.define_interface(InterfaceInfo {
                        name: def.name.name.clone(),
                        type_params: unconstrained(&def.generics),
                        methods: BTreeMap::new(),
                        defaulted: Vec::new(),
                        where_clause: Vec::new(),
                        node: def.id,
                    });
                }
            }
            Statement::TypeAlias(def) => {
                if self.declare_name(&def.name, def.id) {
                    self.env.define(
                        def.name.name.clone(),
                        Type::Alias(AliasType {
                            name: def.name.name.clone(),
                            type_params: unconstrained(&def.generics),
                            target: Box::new(Type::Unknown),
                            where_clause: Vec::new(),
                        }),
                    );
                }
            }
            _ => {}
        }
    }

    fn collect_alias(&mut self, def: &TypeAliasDef) {
        if !self.owns(&def.name.name, def.id) {
            return;
        }
        let names = generic_names(&def.generics);
        let mark = self.push_generics(&names, Default::default());
        let type_params = self.generic_specs(&def.generics);
        let target = self.resolve_type(&def.target);
        let where_clause = self.where_constraints(&def.where_clauses);
        self.pop_generics(mark);
        self.module_define(
            &def.name.name,
            Type::Alias(AliasType {
                name: def.name.name.clone(),
                type_params,
                target: Box::new(target),
                where_clause,
            }),
        );
    }

    fn collect_union(&mut self, def: &UnionDef) {
        if !self.owns(&def.name.name, def.id) {
            return;
        }
        let names = generic_names(&def.generics);
        let mark = self.push_generics(&names, Default::default());
        let type_params = self.generic_specs(&def.generics);
        let variants = def
            .variants
            .iter()
            .map(|variant| self.resolve_type(variant))
            .collect();
        self.pop_generics(mark);
        self.module_define(
            &def.name.name,
            Type::Union(UnionType {
                name: Some(def.name.name.clone()),
                type_params,
                variants,
            }),
        );
    }

    fn collect_struct(&mut self, def: &StructDef) {
        if !self.owns(&def.name.name, def.id) {
            return;
        }
        let names = generic_names(&def.generics);
        let mark = self.push_generics(&names, Default::default());
        let mut type_params = self.generic_specs(&def.generics);
        // Struct where clauses constrain the same parameters, so they are folded in.
        for clause in self.where_constraints(&def.where_clauses) {
            if let Some(param) = type_params
                .iter_mut()
                .find(|param| param.name == clause.type_param)
            {
                param.constraints.extend(clause.constraints);
            }
        }
        let mut fields = Vec::new();
        let mut seen = FxHashSet::default();
        for (idx, field) in def.fields.iter().enumerate() {
            let ty = self.resolve_type(&field.ty);
            let name = match (&field.name, def.kind) {
                (Some(name), StructKind::Named) => {
                    if !seen.insert(name.name.clone()) {
                        self.error(name.id, format!("duplicate struct field '{}'", name.name));
                        continue;
                    }
                    name.name.clone()
                }
                _ => idx.to_string(),
            };
            fields.push((name, ty));
        }
        self.pop_generics(mark);
        if let Some(scope) = self.env.scope_mut(MODULE_DEPTH) {
            scope.define_struct(StructInfo {
                name: def.name.name.clone(),
                type_params,
                fields,
                positional: def.kind == StructKind::Positional,
                node: def.id,
            });
        }
    }

    fn collect_interface(&mut self, def: &InterfaceDef) {
        if !self.owns(&def.name.name, def.id) {
            return;
        }
        let names = generic_names(&def.generics);
        let mark = self.push_generics(&names, Default::default());
        let type_params = self.generic_specs(&def.generics);
        let where_clause = self.where_constraints(&def.where_clauses);
        if let Some(self_type) = &def.self_type {
            self.resolve_type(self_type);
        }
        let mut methods = BTreeMap::new();
        let mut defaulted = Vec::new();
        for sig in &def.signatures {
            let name = &sig.name.name;
            if methods.contains_key(name) {
                self.error(sig.name.id, format!("duplicate interface method '{name}'"));
                continue;
            }
            let explicit = generic_names(&sig.generics);
            let inferred = self.inferred_generic_names(
                sig.params
                    .iter()
                    .filter_map(|param| param.ty.as_ref())
                    .chain(sig.return_type.as_ref()),
                &sig.where_clauses,
                &explicit,
            );
            let mut own_names = explicit;
            own_names.extend(inferred.iter().cloned());
            let inner = self.push_generics(&own_names, Default::default());
            let mut method_params = self.generic_specs(&sig.generics);
            method_params.extend(inferred.into_iter().map(GenericParamSpec::unconstrained));
            let params = sig
                .params
                .iter()
                .map(|param| self.param_type(param, None))
                .collect();
            let ret = match &sig.return_type {
                Some(ty) => self.resolve_type(ty),
                None => Type::void(),
            };
            let method_where = self.where_constraints(&sig.where_clauses);
            self.pop_generics(inner);
            methods.insert(
                name.clone(),
                FunctionType {
                    params,
                    ret: Box::new(ret),
                    type_params: method_params,
                    where_clause: method_where,
                    obligations: Vec::new(),
                },
            );
            if sig.default_body.is_some() {
                defaulted.push(name.clone());
            }
        }
        self.pop_generics(mark);
        if let Some(scope) = self.env.scope_mut(MODULE_DEPTH) {
            scope.define_interface(InterfaceInfo {
                name: def.name.name.clone(),
                type_params,
                methods,
                defaulted,
                where_clause,
                node: def.id,
            });
        }
    }

    /// Declared parameter type; an unannotated `self` takes the receiver (or `Self`).
    pub(super) fn param_type(&mut self, param: &Param, receiver: Option<&Type>) -> Type {
        match &param.ty {
            Some(ty) => self.resolve_type(ty),
            None if param.name() == Some("self") => receiver
                .cloned()
                .unwrap_or_else(|| Type::param(SELF_TYPE)),
            None => Type::Unknown,
        }
    }

    /// Signature of a function definition plus the generic names it introduced.
    ///
    /// Generic names already in scope (method-set or impl parameters) are expected to be pushed
    /// by the caller.
    pub(super) fn function_signature(
        &mut self,
        def: &FunctionDef,
        receiver: Option<&Type>,
    ) -> (FunctionType, Vec<String>) {
        let explicit = generic_names(&def.generics);
        let inferred = self.inferred_generic_names(
            def.params
                .iter()
                .filter_map(|param| param.ty.as_ref())
                .chain(def.return_type.as_ref()),
            &def.where_clauses,
            &explicit,
        );
        let mut names = explicit;
        names.extend(inferred.iter().cloned());
        let mark = self.push_generics(&names, Default::default());
        let mut type_params = self.generic_specs(&def.generics);
        type_params.extend(inferred.into_iter().map(GenericParamSpec::unconstrained));
        let where_clause = self.where_constraints(&def.where_clauses);
        let mut params = Vec::new();
        if def.method_shorthand {
            params.push(
                receiver
                    .cloned()
                    .unwrap_or_else(|| Type::param(SELF_TYPE)),
            );
        }
        for param in &def.params {
            params.push(self.param_type(param, receiver));
        }
        let ret = match &def.return_type {
            Some(ty) => self.resolve_type(ty),
            None => Type::Unknown,
        };
        self.pop_generics(mark);
        let signature = FunctionType {
            params,
            ret: Box::new(ret),
            type_params,
            where_clause,
            obligations: Vec::new(),
        };
        (signature, names)
    }

    /// Body context for a function whose enclosing generics are already pushed.
    pub(super) fn body_context(
        &mut self,
        def: &FunctionDef,
        receiver: Option<&Type>,
    ) -> BodyContext {
        let (signature, own_names) = self.function_signature(def, receiver);
        let mut generic_names: Vec<String> = self.generic_names.clone();
        generic_names.extend(own_names);
        let mut constraints = constraint_map(&signature.type_params, &signature.where_clause);
        for scope in &self.type_param_constraints {
            for (name, bounds) in scope {
                constraints
                    .entry(name.clone())
                    .or_default()
                    .extend(bounds.iter().cloned());
            }
        }
        BodyContext {
            signature,
            generic_names,
            constraints,
        }
    }

    fn collect_function(&mut self, def: &FunctionDef) {
        let context = self.body_context(def, None);
        let signature = context.signature.clone();
        self.bodies.insert(def.id, context);
        let name = &def.name;
        if !self.declarations.contains_key(&name.name) {
            self.declarations.insert(name.name.clone(), def.id);
            self.function_names.insert(name.name.clone());
            self.module_define(&name.name, Type::Function(signature));
            return;
        }
        let previous = self.declarations.get(&name.name).copied().unwrap_or(def.id);
        if !self.function_names.contains(&name.name) {
            self.report_duplicate(name, previous);
            return;
        }
        let existing = self
            .module_scope()
            .and_then(|scope| scope.get(&name.name))
            .cloned();
        let mut overloads = match existing {
            Some(Type::Function(sig)) => vec![sig],
            Some(Type::Overloads(list)) => list,
            _ => Vec::new(),
        };
        if overloads
            .iter()
            .any(|candidate| signatures_equivalent(candidate, &signature))
        {
            self.report_duplicate(name, previous);
            return;
        }
        overloads.push(signature);
        self.module_define(&name.name, Type::Overloads(overloads));
    }

    fn collect_methods(&mut self, def: &MethodsDef) {
        let explicit = generic_names(&def.generics);
        let inferred =
            self.inferred_generic_names([&def.target], &def.where_clauses, &explicit);
        let mut names = explicit;
        names.extend(inferred.iter().cloned());
        let mark = self.push_generics(&names, Default::default());
        let mut set_params = self.generic_specs(&def.generics);
        set_params.extend(inferred.into_iter().map(GenericParamSpec::unconstrained));
        let where_clause = self.where_constraints(&def.where_clauses);
        let target = self.resolve_type(&def.target);
        if let Some(bounds) = self.type_param_constraints.last_mut() {
            *bounds = constraint_map(&set_params, &where_clause);
        }
        let target_label = target.to_string();
        let set_obligations = deferred_obligations(
            &set_params,
            &where_clause,
            &format!("methods for {target_label}"),
            "via method set",
            NodeId::DUMMY,
        );

        let earlier: FxHashSet<String> = self.method_sets[self.local_method_sets_start..]
            .iter()
            .filter(|spec| crate::assignable::signature_types_equivalent(&spec.target, &target))
            .flat_map(|spec| spec.methods.keys().cloned())
            .collect();
        let self_binding = self_bindings(&target);
        let mut methods = BTreeMap::new();
        for fn_def in &def.definitions {
            let method = &fn_def.name.name;
            if methods.contains_key(method) || earlier.contains(method) {
                self.error(
                    fn_def.name.id,
                    format!("duplicate method '{method}' for target"),
                );
                continue;
            }
            let mut context = self.body_context(fn_def, Some(&target));
            let mut signature = substitute_function(&context.signature, &self_binding);
            let mut type_params: Vec<GenericParamSpec> = set_params
                .iter()
                .map(|param| GenericParamSpec::unconstrained(param.name.clone()))
                .collect();
            type_params.append(&mut signature.type_params);
            signature.type_params = type_params;
            signature.obligations = deferred_obligations(
                &set_params,
                &where_clause,
                &format!("methods for {target_label}::{method}"),
                "",
                NodeId::DUMMY,
            );
            context.signature = signature.clone();
            self.bodies.insert(fn_def.id, context);
            methods.insert(method.clone(), signature);
        }
        self.pop_generics(mark);
        self.method_sets.push(MethodSetSpec {
            target,
            methods,
            type_params: set_params,
            where_clause,
            obligations: set_obligations,
            node: def.id,
        });
    }

    fn collect_impl(&mut self, def: &ImplDef) {
        let explicit = generic_names(&def.generics);
        let inferred = self.inferred_generic_names(
            std::iter::once(&def.target).chain(&def.interface_args),
            &def.where_clauses,
            &explicit,
        );
        let mut names = explicit;
        names.extend(inferred.iter().cloned());
        let mark = self.push_generics(&names, Default::default());
        let mut type_params = self.generic_specs(&def.generics);
        type_params.extend(inferred.into_iter().map(GenericParamSpec::unconstrained));
        let where_clause = self.where_constraints(&def.where_clauses);
        let target = self.resolve_type(&def.target);
        let interface_args: Vec<Type> = def
            .interface_args
            .iter()
            .map(|arg| self.resolve_type(arg))
            .collect();
        if let Some(bounds) = self.type_param_constraints.last_mut() {
            *bounds = constraint_map(&type_params, &where_clause);
        }

        let iface_name = &def.interface.name;
        let info = self.env.lookup_interface(iface_name).cloned();
        if info.is_none() {
            let message = match self.env.lookup(iface_name) {
                Some(_) => format!("impl references '{iface_name}' which is not an interface"),
                None => format!("impl references unknown interface '{iface_name}'"),
            };
            self.error(def.interface.id, message);
        }
        let label = format!("impl {iface_name} for {target}");
        if let Some(info) = &info {
            if interface_args.len() != info.type_params.len() {
                self.error(
                    def.id,
                    format!(
                        "{label} expected {} interface type argument(s), got {}",
                        info.type_params.len(),
                        interface_args.len()
                    ),
                );
            }
        }

        let self_binding = self_bindings(&target);
        let mut methods = BTreeMap::new();
        for fn_def in &def.definitions {
            let method = &fn_def.name.name;
            if methods.contains_key(method) {
                self.error(
                    fn_def.name.id,
                    format!("duplicate method '{method}' in implementation"),
                );
                continue;
            }
            let mut context = self.body_context(fn_def, Some(&target));
            context.signature = substitute_function(&context.signature, &self_binding);
            methods.insert(method.clone(), context.signature.clone());
            self.bodies.insert(fn_def.id, context);
        }
        self.pop_generics(mark);

        if let Some(info) = &info {
            let mut bindings = self_binding;
            for (param, arg) in info.type_params.iter().zip(&interface_args) {
                bindings.insert(param.name.clone(), arg.clone());
            }
            for name in &info.defaulted {
                if methods.contains_key(name) {
                    continue;
                }
                if let Some(sig) = info.methods.get(name) {
                    methods.insert(name.clone(), substitute_function(sig, &bindings));
                }
            }
        }

        let obligations = deferred_obligations(&type_params, &where_clause, &label, "", def.id);
        if let Some(name) = &def.name {
            if self.declare_name(name, def.id) {
                self.module_define(
                    &name.name,
                    Type::ImplementationNamespace(ImplementationNamespace {
                        name: name.name.clone(),
                        interface: iface_name.clone(),
                        target: Box::new(target.clone()),
                        methods: methods.clone(),
                    }),
                );
            }
        }
        self.implementations.push(ImplementationSpec {
            interface: iface_name.clone(),
            interface_args,
            target,
            methods,
            type_params,
            where_clause,
            obligations,
            impl_name: def.name.as_ref().map(|name| name.name.clone()),
            node: def.id,
        });
    }
}
