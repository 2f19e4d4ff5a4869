use std::sync::Arc;
use std::time::Instant;

use able_base::{Diagnostic, NodeId};
use able_syntax::{Module, Statement};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::builtins::{BuiltinRegistry, SUPPRESSIBLE_INTERFACES};
use crate::config::CheckerConfig;
use crate::env::{Environment, Scope};
use crate::error::CheckError;
use crate::overload::argument_matches;
use crate::solver::Solver;
use crate::types::{
    AliasType, ConstraintObligation, ExportedSymbol, FunctionType, GenericParamSpec,
    ImplementationSpec, InterfaceRef, MethodSetSpec, Type, WhereConstraint,
};

mod calls;
mod coherence;
mod collect;
mod control;
mod exports;
mod expressions;
mod members;
mod patterns;
mod resolve;
mod statements;

/// Scope index holding the declarations of the module being checked.
const MODULE_DEPTH: usize = 2;

macro_rules! timing_step {
    ($trace:expr, $label:expr, $block:expr) => {{
        let _span = tracing::debug_span!("typecheck_pass", pass = $label).entered();
        let _t0 = if $trace { Some(Instant::now()) } else { None };
        let result = $block;
        if let Some(t0) = _t0 {
            tracing::info!(
                pass = $label,
                elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
                "typecheck pass finished"
            );
        }
        result
    }};
}

/// Signature and generic context needed to check one function body.
#[derive(Debug, Clone, Default)]
struct BodyContext {
    signature: FunctionType,
    generic_names: Vec<String>,
    constraints: FxHashMap<String, Vec<InterfaceRef>>,
}

#[derive(Debug, Default)]
struct FunctionFrame {
    declared_return: Option<Type>,
    returns: Vec<Type>,
}

#[derive(Debug, Default)]
struct IteratorFrame {
    element: Option<Type>,
    yields: Vec<Type>,
}

/// Loop, label and handler state that does not cross a function boundary.
#[derive(Debug, Default)]
struct ControlState {
    loops: Vec<Vec<Type>>,
    breakpoints: Vec<(String, Vec<Type>)>,
    iterators: Vec<IteratorFrame>,
    rescue_depth: usize,
}

/// A generic alias applied to arguments; its `where` clause is proven after inference.
#[derive(Debug, Clone)]
struct AliasInstantiation {
    alias: AliasType,
    args: Vec<Type>,
    node: NodeId,
}

/// Checks one module at a time.
///
/// Per-module state is reset at the start of every [`check_module`](Self::check_module) call,
/// so a checker must not be shared between concurrent runs. Separate checkers are independent.
pub struct TypeChecker {
    config: CheckerConfig,
    builtins: Arc<BuiltinRegistry>,
    env: Environment,
    node_origins: FxHashMap<NodeId, String>,

    prelude: Option<Scope>,
    prelude_implementations: Vec<ImplementationSpec>,
    prelude_method_sets: Vec<MethodSetSpec>,

    implementations: Vec<ImplementationSpec>,
    method_sets: Vec<MethodSetSpec>,
    local_implementations_start: usize,
    local_method_sets_start: usize,

    obligations: Vec<ConstraintObligation>,
    alias_instantiations: Vec<AliasInstantiation>,
    diagnostics: Vec<Diagnostic>,
    reported: FxHashSet<(NodeId, String)>,

    inferred: FxHashMap<NodeId, Type>,
    inferred_type_args: FxHashMap<NodeId, Vec<Type>>,
    declarations: FxHashMap<String, NodeId>,
    function_names: FxHashSet<String>,
    bodies: FxHashMap<NodeId, BodyContext>,
    exports: Vec<ExportedSymbol>,

    generic_names: Vec<String>,
    type_param_constraints: Vec<FxHashMap<String, Vec<InterfaceRef>>>,
    functions: Vec<FunctionFrame>,
    control: ControlState,
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeChecker {
    /// Checker with default configuration plus `ABLE_TRACE_TIMING`.
    pub fn new() -> Self {
        Self::with_config(CheckerConfig::from_env())
    }

    pub fn with_config(config: CheckerConfig) -> Self {
        let builtins = BuiltinRegistry::shared();
        let env = Environment::new(builtins.scope().clone());
        Self {
            config,
            builtins,
            env,
            node_origins: FxHashMap::default(),
            prelude: None,
            prelude_implementations: Vec::new(),
            prelude_method_sets: Vec::new(),
            implementations: Vec::new(),
            method_sets: Vec::new(),
            local_implementations_start: 0,
            local_method_sets_start: 0,
            obligations: Vec::new(),
            alias_instantiations: Vec::new(),
            diagnostics: Vec::new(),
            reported: FxHashSet::default(),
            inferred: FxHashMap::default(),
            inferred_type_args: FxHashMap::default(),
            declarations: FxHashMap::default(),
            function_names: FxHashSet::default(),
            bodies: FxHashMap::default(),
            exports: Vec::new(),
            generic_names: Vec::new(),
            type_param_constraints: Vec::new(),
            functions: Vec::new(),
            control: ControlState::default(),
        }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Source paths per node, used to point duplicate declarations at their first definition.
    pub fn set_node_origins(&mut self, origins: FxHashMap<NodeId, String>) {
        self.node_origins = origins;
    }

    /// Seeds the next [`check_module`](Self::check_module) with another module's exports.
    /// `None` clears the prelude together with its implementations and method sets.
    pub fn set_prelude(
        &mut self,
        scope: Option<&Scope>,
        implementations: Vec<ImplementationSpec>,
        method_sets: Vec<MethodSetSpec>,
    ) {
        match scope {
            Some(scope) => {
                self.prelude = Some(scope.clone());
                self.prelude_implementations = implementations;
                self.prelude_method_sets = method_sets;
            }
            None => {
                self.prelude = None;
                self.prelude_implementations.clear();
                self.prelude_method_sets.clear();
            }
        }
    }

    /// Runs every pass over `module`. Only a missing module is fatal; everything else is
    /// reported as a diagnostic.
    pub fn check_module(&mut self, module: Option<&Module>) -> Result<Vec<Diagnostic>, CheckError> {
        let module = module.ok_or(CheckError::MissingModule)?;
        let package = module
            .package
            .as_ref()
            .map(|package| package.dotted())
            .unwrap_or_default();
        let _span = tracing::debug_span!("check_module", package = %package).entered();
        let trace = self.config.trace_timing;

        self.reset(module);
        timing_step!(trace, "imports", self.check_imports(module));
        timing_step!(trace, "collect", self.collect_declarations(module));
        timing_step!(trace, "infer", self.infer_module(module));
        timing_step!(trace, "solve", self.solve_obligations());
        timing_step!(trace, "coherence", self.check_coherence());
        timing_step!(trace, "exports", self.collect_exports(module));

        let diagnostics = std::mem::take(&mut self.diagnostics);
        tracing::debug!(diagnostics = diagnostics.len(), "module checked");
        Ok(diagnostics)
    }

    /// Public top-level bindings of the last checked module.
    pub fn exported_symbols(&self) -> &[ExportedSymbol] {
        &self.exports
    }

    /// Implementations declared by the last checked module, without builtins or prelude.
    pub fn module_implementations(&self) -> &[ImplementationSpec] {
        self.implementations
            .get(self.local_implementations_start..)
            .unwrap_or_default()
    }

    pub fn module_method_sets(&self) -> &[MethodSetSpec] {
        self.method_sets
            .get(self.local_method_sets_start..)
            .unwrap_or_default()
    }

    pub fn global_environment(&self) -> &Scope {
        self.env.global()
    }

    pub fn inferred_type(&self, node: NodeId) -> Option<&Type> {
        self.inferred.get(&node)
    }

    /// Type arguments inferred for a generic call that did not spell them out.
    pub fn inferred_type_arguments(&self, node: NodeId) -> Option<&[Type]> {
        self.inferred_type_args.get(&node).map(Vec::as_slice)
    }

    fn reset(&mut self, module: &Module) {
        self.env.truncate(1);
        let prelude = self.prelude.clone().unwrap_or_default();
        self.env.push_scope(prelude);
        self.env.push();
        debug_assert_eq!(self.env.depth(), MODULE_DEPTH + 1);

        let redeclared: Vec<String> = module
            .body
            .iter()
            .filter_map(|statement| match statement {
                Statement::Interface(def)
                    if SUPPRESSIBLE_INTERFACES.contains(&def.name.name.as_str()) =>
                {
                    Some(def.name.name.clone())
                }
                _ => None,
            })
            .collect();
        self.implementations = self
            .builtins
            .implementations_for(&redeclared)
            .cloned()
            .collect();
        self.implementations
            .extend(self.prelude_implementations.iter().cloned());
        self.local_implementations_start = self.implementations.len();
        self.method_sets = self.prelude_method_sets.clone();
        self.local_method_sets_start = self.method_sets.len();

        self.obligations.clear();
        self.alias_instantiations.clear();
        self.diagnostics.clear();
        self.reported.clear();
        self.inferred.clear();
        self.inferred_type_args.clear();
        self.declarations.clear();
        self.function_names.clear();
        self.bodies.clear();
        self.exports.clear();
        self.generic_names.clear();
        self.type_param_constraints.clear();
        self.functions.clear();
        self.control = ControlState::default();
    }

    fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        if self
            .reported
            .insert((diagnostic.node, diagnostic.message.clone()))
        {
            self.diagnostics.push(diagnostic);
        }
    }

    fn error(&mut self, node: NodeId, message: impl Into<String>) {
        self.push_diagnostic(Diagnostic::error(node, message));
    }

    fn warning(&mut self, node: NodeId, message: impl Into<String>) {
        self.push_diagnostic(Diagnostic::warning(node, message));
    }

    fn record(&mut self, node: NodeId, ty: Type) -> Type {
        self.inferred.insert(node, ty.clone());
        ty
    }

    fn solver(&self) -> Solver<'_> {
        Solver::new(&self.implementations, &self.method_sets, &self.env)
    }

    fn module_scope(&self) -> Option<&Scope> {
        self.env.scope(MODULE_DEPTH)
    }

    /// Assignability that also counts interface implementations.
    fn accepts(&self, actual: &Type, expected: &Type) -> bool {
        argument_matches(actual, expected, &self.solver())
    }

    /// Reports `actual` flowing into `expected`: literal overflow first, otherwise the message
    /// built by `describe(actual, expected)`.
    fn check_value(
        &mut self,
        node: NodeId,
        actual: &Type,
        expected: &Type,
        describe: impl FnOnce(&Type, &Type) -> String,
    ) -> bool {
        if let Some(message) = crate::assignable::literal_mismatch(actual, expected) {
            self.error(node, message);
            return false;
        }
        if self.accepts(actual, expected) {
            return true;
        }
        self.error(node, describe(actual, expected));
        false
    }

    fn enter_function(&mut self, declared_return: Option<Type>) -> ControlState {
        self.functions.push(FunctionFrame {
            declared_return,
            returns: Vec::new(),
        });
        std::mem::take(&mut self.control)
    }

    fn leave_function(&mut self, saved: ControlState) -> FunctionFrame {
        self.control = saved;
        self.functions.pop().unwrap_or_default()
    }

    fn push_generics(&mut self, names: &[String], constraints: FxHashMap<String, Vec<InterfaceRef>>) -> usize {
        let mark = self.generic_names.len();
        self.generic_names.extend(names.iter().cloned());
        self.type_param_constraints.push(constraints);
        mark
    }

    fn pop_generics(&mut self, mark: usize) {
        self.generic_names.truncate(mark);
        self.type_param_constraints.pop();
    }

    /// Interfaces a type parameter is known to implement in the current generic context.
    fn type_param_bounds(&self, name: &str) -> Vec<InterfaceRef> {
        self.type_param_constraints
            .iter()
            .rev()
            .filter_map(|scope| scope.get(name))
            .flatten()
            .cloned()
            .collect()
    }
}

fn constraint_map(
    params: &[GenericParamSpec],
    where_clause: &[WhereConstraint],
) -> FxHashMap<String, Vec<InterfaceRef>> {
    let mut map: FxHashMap<String, Vec<InterfaceRef>> = FxHashMap::default();
    for param in params {
        map.entry(param.name.clone())
            .or_default()
            .extend(param.constraints.iter().cloned());
    }
    for clause in where_clause {
        map.entry(clause.type_param.clone())
            .or_default()
            .extend(clause.constraints.iter().cloned());
    }
    map
}

/// Drops literal provenance so a binding keeps the literal's kind but not its value.
fn settle(ty: &Type) -> Type {
    match ty {
        Type::Integer(int) if int.literal.is_some() && !int.explicit => {
            Type::Integer(crate::types::IntegerType {
                kind: int.kind,
                literal: None,
                explicit: false,
            })
        }
        Type::Float(float) if float.literal && !float.explicit => {
            Type::Float(crate::types::FloatType {
                kind: float.kind,
                literal: false,
                explicit: false,
            })
        }
        other => other.clone(),
    }
}

/// Joins branch types: the first one when every branch fits it, a union otherwise.
fn merge_branches(types: Vec<Type>) -> Type {
    let known: Vec<Type> = types
        .iter()
        .filter(|ty| !ty.is_unknown())
        .map(settle)
        .collect();
    let Some(first) = known.first().cloned() else {
        return Type::Unknown;
    };
    if known
        .iter()
        .all(|ty| crate::assignable::type_assignable(ty, &first))
    {
        first
    } else {
        Type::union_of(known)
    }
}

#[cfg(test)]
mod tests {
    use able_syntax::IntegerKind;

    use super::*;

    #[test]
    fn settle_keeps_kind_and_drops_value() {
        let literal = Type::Integer(crate::types::IntegerType {
            kind: IntegerKind::I32,
            literal: Some(7.into()),
            explicit: false,
        });
        match settle(&literal) {
            Type::Integer(int) => {
                assert_eq!(int.kind, IntegerKind::I32);
                assert!(int.literal.is_none());
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn merge_branches_unions_disagreeing_types() {
        assert_eq!(
            merge_branches(vec![Type::string(), Type::string()]),
            Type::string()
        );
        assert_eq!(
            merge_branches(vec![Type::string(), Type::bool()]).to_string(),
            "String | bool"
        );
        assert_eq!(merge_branches(vec![Type::Unknown]), Type::Unknown);
    }

    #[test]
    fn missing_module_is_fatal() {
        let mut checker = TypeChecker::with_config(CheckerConfig::default());
        assert_eq!(checker.check_module(None), Err(CheckError::MissingModule));
    }
}
