use able_base::NodeId;
use able_syntax::{Block, Expr, FunctionDef, Identifier, InterfaceDef, Module, Param, Pattern, Statement};
use rustc_hash::FxHashMap;

use super::patterns::BindMode;
use super::{BodyContext, IteratorFrame, MODULE_DEPTH, TypeChecker, merge_branches};
use crate::solver::ImplementationLookup;
use crate::substitute::substitute;
use crate::types::{InterfaceRef, SELF_TYPE, Type};

/// Interface whose implementations can drive a `for` loop.
const ITERABLE: &str = "Iterable";

impl TypeChecker {
    pub(super) fn infer_module(&mut self, module: &Module) {
        for statement in &module.body {
            self.check_statement(statement);
        }
    }

    /// Checks one statement; expression statements yield their value type, everything else
    /// `void`.
    pub(super) fn check_statement(&mut self, statement: &Statement) -> Type {
        match statement {
            Statement::Expr(expr) => self.check_expr(expr, None),
            Statement::Struct(_) | Statement::Union(_) | Statement::TypeAlias(_) => Type::void(),
            Statement::Interface(def) => {
                self.check_interface_defaults(def);
                Type::void()
            }
            Statement::Function(def) => {
                self.check_function_statement(def);
                Type::void()
            }
            Statement::Impl(def) => {
                for method in &def.definitions {
                    self.check_declared_body(method);
                }
                Type::void()
            }
            Statement::Methods(def) => {
                for method in &def.definitions {
                    self.check_declared_body(method);
                }
                Type::void()
            }
            Statement::Return { id, value } => {
                self.check_return(*id, value.as_ref());
                Type::void()
            }
            Statement::Raise { value, .. } => {
                self.check_expr(value, None);
                Type::void()
            }
            Statement::Rethrow { id } => {
                if self.control.rescue_depth == 0 {
                    self.error(*id, "rethrow is only valid inside rescue handlers");
                }
                Type::void()
            }
            Statement::Break { id, label, value } => {
                self.check_break(*id, label.as_ref(), value.as_ref());
                Type::void()
            }
            Statement::Continue { id, label } => {
                match label {
                    Some(label) => {
                        if !self
                            .control
                            .breakpoints
                            .iter()
                            .any(|(name, _)| name == &label.name)
                        {
                            self.error(label.id, format!("unknown continue label '{}'", label.name));
                        }
                    }
                    None if self.control.loops.is_empty() => {
                        self.error(*id, "continue statement outside loop");
                    }
                    None => {}
                }
                Type::void()
            }
            Statement::Yield { id, value } => {
                self.check_yield(*id, value.as_ref());
                Type::void()
            }
            Statement::While {
                condition, body, ..
            } => {
                let condition_type = self.check_expr(condition, None);
                self.require_bool(condition.id(), &condition_type, "while condition");
                self.control.loops.push(Vec::new());
                self.check_block(body, None);
                self.control.loops.pop();
                Type::void()
            }
            Statement::For {
                pattern,
                iterable,
                body,
                ..
            } => {
                self.check_for(pattern, iterable, body);
                Type::void()
            }
        }
    }

    /// Checks a block in its own scope; the last expression statement gives its type.
    pub(super) fn check_block(&mut self, block: &Block, expected: Option<&Type>) -> Type {
        self.env.push();
        let mut result = Type::void();
        let last = block.statements.len().saturating_sub(1);
        for (idx, statement) in block.statements.iter().enumerate() {
            result = match statement {
                Statement::Expr(expr) if idx == last => self.check_expr(expr, expected),
                other => self.check_statement(other),
            };
        }
        self.env.pop();
        self.record(block.id, result)
    }

    fn check_break(&mut self, node: NodeId, label: Option<&Identifier>, value: Option<&Expr>) {
        let value_type = value.map(|value| self.check_expr(value, None));
        if let Some(label) = label {
            match self
                .control
                .breakpoints
                .iter_mut()
                .rev()
                .find(|(name, _)| name == &label.name)
            {
                Some((_, values)) => values.push(value_type.unwrap_or_else(Type::void)),
                None => self.error(label.id, format!("unknown break label '{}'", label.name)),
            }
            return;
        }
        match self.control.loops.last_mut() {
            Some(values) => values.extend(value_type),
            None => self.error(node, "break statement outside loop"),
        }
    }

    fn check_yield(&mut self, node: NodeId, value: Option<&Expr>) {
        let Some(element) = self.control.iterators.last().map(|frame| frame.element.clone())
        else {
            if let Some(value) = value {
                self.check_expr(value, None);
            }
            self.error(node, "yield statement outside iterator");
            return;
        };
        let yielded = match value {
            Some(value) => {
                let ty = self.check_expr(value, element.as_ref());
                if let Some(expected) = &element {
                    self.check_value(value.id(), &ty, expected, |actual, expected| {
                        format!("iterator annotation expects elements of type {expected}, got {actual}")
                    });
                }
                ty
            }
            None => Type::void(),
        };
        if let Some(frame) = self.control.iterators.last_mut() {
            frame.yields.push(yielded);
        }
    }

    fn check_for(&mut self, pattern: &Pattern, iterable: &Expr, body: &Block) {
        let iterable_type = self.check_expr(iterable, None);
        let resolved = iterable_type.resolved();
        let element = match self.iterable_element(&resolved) {
            Some(element) => element,
            None => {
                self.error(
                    iterable.id(),
                    format!("for-loop iterable must be an array, range, or iterator (got {resolved})"),
                );
                Type::Unknown
            }
        };
        self.env.push();
        if let Pattern::Typed { ty, .. } = pattern {
            let declared = self.resolve_type(ty);
            if !declared.is_unknown() && !self.accepts(&element, &declared) {
                self.error(
                    pattern.id(),
                    format!("for-loop pattern expects type {declared}, got {element}"),
                );
            }
        }
        self.bind_pattern(pattern, &element, BindMode::Declare);
        self.control.loops.push(Vec::new());
        self.check_block(body, None);
        self.control.loops.pop();
        self.env.pop();
    }

    /// Element type produced by iterating a value of type `iterable`, or `None` when the
    /// type is not iterable.
    fn iterable_element(&self, iterable: &Type) -> Option<Type> {
        match iterable {
            Type::Unknown => Some(Type::Unknown),
            Type::Array(element) | Type::Range(element) | Type::Iterator(element) => {
                Some(element.as_ref().clone())
            }
            Type::Interface(iface) if iface.name == ITERABLE => {
                Some(iface.args.first().cloned().unwrap_or_default())
            }
            Type::TypeParameter(name) => Some(
                self.type_param_bounds(name)
                    .into_iter()
                    .find(|bound| bound.name == ITERABLE)
                    .and_then(|bound| bound.args.into_iter().next())
                    .unwrap_or_default(),
            ),
            other => match self.solver().implementation_provides(
                other,
                &InterfaceRef::named(ITERABLE),
                0,
            ) {
                ImplementationLookup::Found { spec, bindings } => Some(
                    spec.interface_args
                        .first()
                        .map(|arg| substitute(arg, &bindings))
                        .unwrap_or_default(),
                ),
                _ => None,
            },
        }
    }

    fn check_return(&mut self, node: NodeId, value: Option<&Expr>) {
        let Some(declared) = self.functions.last().map(|frame| frame.declared_return.clone())
        else {
            if let Some(value) = value {
                self.check_expr(value, None);
            }
            self.error(node, "return statement outside function");
            return;
        };
        let (returned, at) = match value {
            Some(value) => (self.check_expr(value, declared.as_ref()), value.id()),
            None => (Type::void(), node),
        };
        if let Some(expected) = &declared {
            self.check_value(at, &returned, expected, |actual, expected| {
                format!("return type mismatch: expected {expected}, got {actual}")
            });
        }
        if let Some(frame) = self.functions.last_mut() {
            frame.returns.push(returned);
        }
    }

    fn check_function_statement(&mut self, def: &FunctionDef) {
        let top_level = self.env.depth() == MODULE_DEPTH + 1;
        let context = match self.bodies.get(&def.id).cloned() {
            Some(context) => context,
            None => {
                let context = self.body_context(def, None);
                self.env.define(
                    def.name.name.clone(),
                    Type::Function(context.signature.clone()),
                );
                context
            }
        };
        let inferred = self.check_function_body(&def.params, &context, &def.body, def.method_shorthand);
        if !context.signature.ret.is_unknown() {
            return;
        }
        // Fill in the inferred return type of a single, unannotated declaration.
        let binding = if top_level {
            self.module_scope().and_then(|scope| scope.get(&def.name.name))
        } else {
            self.env.lookup(&def.name.name)
        };
        if let Some(Type::Function(sig)) = binding.cloned() {
            if sig == context.signature {
                let mut updated = sig;
                updated.ret = Box::new(inferred);
                if top_level {
                    if let Some(scope) = self.env.scope_mut(MODULE_DEPTH) {
                        scope.define(def.name.name.clone(), Type::Function(updated));
                    }
                } else {
                    self.env.assign(&def.name.name, Type::Function(updated));
                }
            }
        }
    }

    /// Methods of impls and method sets; their contexts were built during collection.
    fn check_declared_body(&mut self, def: &FunctionDef) {
        let context = match self.bodies.get(&def.id).cloned() {
            Some(context) => context,
            None => self.body_context(def, None),
        };
        self.check_function_body(&def.params, &context, &def.body, def.method_shorthand);
    }

    fn check_interface_defaults(&mut self, def: &InterfaceDef) {
        let methods = self
            .env
            .lookup_interface(&def.name.name)
            .map(|info| info.methods.clone())
            .unwrap_or_default();
        for sig in &def.signatures {
            let Some(body) = &sig.default_body else {
                continue;
            };
            let Some(signature) = methods.get(&sig.name.name).cloned() else {
                continue;
            };
            let mut generic_names: Vec<String> = def
                .generics
                .iter()
                .map(|param| param.name.name.clone())
                .collect();
            generic_names.extend(signature.type_params.iter().map(|param| param.name.clone()));
            let mut constraints = super::constraint_map(&signature.type_params, &signature.where_clause);
            constraints.insert(
                SELF_TYPE.to_string(),
                vec![InterfaceRef {
                    name: def.name.name.clone(),
                    args: def
                        .generics
                        .iter()
                        .map(|param| Type::param(param.name.name.clone()))
                        .collect(),
                }],
            );
            let context = BodyContext {
                signature,
                generic_names,
                constraints,
            };
            self.check_function_body(&sig.params, &context, body, false);
        }
    }

    /// Checks a function body against its signature and returns the effective return type.
    pub(super) fn check_function_body(
        &mut self,
        params: &[Param],
        context: &BodyContext,
        body: &Block,
        shorthand: bool,
    ) -> Type {
        let mark = self.push_generics(&[], FxHashMap::default());
        self.generic_names.extend(context.generic_names.iter().cloned());
        if let Some(bounds) = self.type_param_constraints.last_mut() {
            *bounds = context.constraints.clone();
        }
        self.env.push();
        let mut param_types = context.signature.params.iter();
        if shorthand {
            if let Some(receiver) = param_types.next() {
                self.env.define("self", receiver.clone());
            }
        }
        for param in params {
            let ty = param_types.next().cloned().unwrap_or_default();
            self.bind_pattern(&param.pattern, &ty, BindMode::Declare);
        }

        let declared = (!context.signature.ret.is_unknown()).then(|| (*context.signature.ret).clone());
        let saved = self.enter_function(declared.clone());
        let body_type = self.check_block(body, declared.as_ref());
        let frame = self.leave_function(saved);
        self.env.pop();
        self.pop_generics(mark);

        if let Some(expected) = declared {
            if let Some(Statement::Expr(tail)) = body.statements.last() {
                self.check_value(tail.id(), &body_type, &expected, |actual, expected| {
                    format!("return type mismatch: expected {expected}, got {actual}")
                });
            }
            return expected;
        }
        let mut candidates = frame.returns;
        if matches!(body.statements.last(), Some(Statement::Expr(_))) || candidates.is_empty() {
            candidates.push(body_type);
        }
        merge_branches(candidates)
    }

    pub(super) fn require_bool(&mut self, node: NodeId, actual: &Type, what: &str) {
        let resolved = actual.resolved();
        if !(resolved.is_bool() || resolved.is_unknown() || resolved.is_type_parameter()) {
            self.error(node, format!("{what} must be bool (got {actual})"));
        }
    }

    pub(super) fn push_iterator(&mut self, element: Option<Type>) {
        self.control.iterators.push(IteratorFrame {
            element,
            yields: Vec::new(),
        });
    }

    pub(super) fn pop_iterator(&mut self) -> IteratorFrame {
        self.control.iterators.pop().unwrap_or_default()
    }
}
