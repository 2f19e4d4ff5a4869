//! Constructors for program trees.
//!
//! Each helper allocates fresh node ids, so trees built here can be handed straight to the
//! checker. Definitions come back as plain structs; the `with_*` methods fill in the optional
//! parts.

use able_base::NodeId;
use num_bigint::BigInt;

use crate::ast::*;
use crate::{FloatKind, IntegerKind};

fn fresh() -> NodeId {
    NodeId::fresh()
}

pub fn ident(name: &str) -> Identifier {
    Identifier {
        id: fresh(),
        name: name.to_string(),
    }
}

pub fn module(body: Vec<Statement>) -> Module {
    Module {
        id: fresh(),
        package: None,
        imports: Vec::new(),
        body,
    }
}

pub fn package_module(package: &str, imports: Vec<ImportDecl>, body: Vec<Statement>) -> Module {
    Module {
        id: fresh(),
        package: Some(PackageDecl {
            id: fresh(),
            path: package.split('.').map(ident).collect(),
            private: false,
        }),
        imports,
        body,
    }
}

pub fn import(path: &str) -> ImportDecl {
    ImportDecl {
        id: fresh(),
        path: path.split('.').map(ident).collect(),
        alias: None,
        selectors: Vec::new(),
        wildcard: false,
    }
}

pub fn import_selected(path: &str, names: &[&str]) -> ImportDecl {
    ImportDecl {
        selectors: names
            .iter()
            .map(|name| ImportSelector {
                id: fresh(),
                name: ident(name),
                alias: None,
            })
            .collect(),
        ..import(path)
    }
}

pub fn import_wildcard(path: &str) -> ImportDecl {
    ImportDecl {
        wildcard: true,
        ..import(path)
    }
}

// Expressions.

pub fn name(value: &str) -> Expr {
    Expr::Ident(ident(value))
}

pub fn int(value: i64) -> Expr {
    Expr::Integer {
        id: fresh(),
        value: BigInt::from(value),
        suffix: None,
    }
}

pub fn int_big(value: BigInt, suffix: Option<IntegerKind>) -> Expr {
    Expr::Integer {
        id: fresh(),
        value,
        suffix,
    }
}

pub fn int_typed(value: i128, suffix: IntegerKind) -> Expr {
    int_big(BigInt::from(value), Some(suffix))
}

pub fn float(value: f64) -> Expr {
    Expr::Float {
        id: fresh(),
        value,
        suffix: None,
    }
}

pub fn float_typed(value: f64, suffix: FloatKind) -> Expr {
    Expr::Float {
        id: fresh(),
        value,
        suffix: Some(suffix),
    }
}

pub fn boolean(value: bool) -> Expr {
    Expr::Bool { id: fresh(), value }
}

pub fn nil() -> Expr {
    Expr::Nil { id: fresh() }
}

pub fn chr(value: char) -> Expr {
    Expr::Char { id: fresh(), value }
}

pub fn string(value: &str) -> Expr {
    Expr::String {
        id: fresh(),
        value: value.to_string(),
    }
}

pub fn array(elements: Vec<Expr>) -> Expr {
    Expr::Array {
        id: fresh(),
        elements,
    }
}

pub fn map(elements: Vec<MapElement>) -> Expr {
    Expr::Map {
        id: fresh(),
        elements,
    }
}

pub fn entry(key: Expr, value: Expr) -> MapElement {
    MapElement::Entry {
        id: fresh(),
        key,
        value,
    }
}

pub fn spread(value: Expr) -> MapElement {
    MapElement::Spread { id: fresh(), value }
}

pub fn struct_lit(struct_name: &str, fields: Vec<(&str, Expr)>) -> Expr {
    Expr::StructLiteral {
        id: fresh(),
        name: ident(struct_name),
        type_args: Vec::new(),
        fields: fields
            .into_iter()
            .map(|(field, value)| StructFieldInit {
                id: fresh(),
                name: Some(ident(field)),
                value,
            })
            .collect(),
        positional: false,
    }
}

pub fn positional_lit(struct_name: &str, values: Vec<Expr>) -> Expr {
    Expr::StructLiteral {
        id: fresh(),
        name: ident(struct_name),
        type_args: Vec::new(),
        fields: values
            .into_iter()
            .map(|value| StructFieldInit {
                id: fresh(),
                name: None,
                value,
            })
            .collect(),
        positional: true,
    }
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    Expr::Unary {
        id: fresh(),
        op,
        operand: Box::new(operand),
    }
}

pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        id: fresh(),
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn call(callee: &str, args: Vec<Expr>) -> Expr {
    call_expr(name(callee), args)
}

pub fn call_expr(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::Call {
        id: fresh(),
        callee: Box::new(callee),
        args,
        type_args: Vec::new(),
    }
}

pub fn call_with_types(callee: &str, args: Vec<Expr>, type_args: Vec<TypeExpr>) -> Expr {
    Expr::Call {
        id: fresh(),
        callee: Box::new(name(callee)),
        args,
        type_args,
    }
}

pub fn member(object: Expr, field: &str) -> Expr {
    Expr::Member {
        id: fresh(),
        object: Box::new(object),
        member: ident(field),
        safe: false,
    }
}

pub fn safe_member(object: Expr, field: &str) -> Expr {
    Expr::Member {
        id: fresh(),
        object: Box::new(object),
        member: ident(field),
        safe: true,
    }
}

pub fn method_call(receiver: Expr, method: &str, args: Vec<Expr>) -> Expr {
    call_expr(member(receiver, method), args)
}

pub fn index(object: Expr, idx: Expr) -> Expr {
    Expr::Index {
        id: fresh(),
        object: Box::new(object),
        index: Box::new(idx),
    }
}

pub fn block(statements: Vec<Statement>) -> Block {
    Block {
        id: fresh(),
        statements,
    }
}

pub fn block_expr(statements: Vec<Statement>) -> Expr {
    Expr::Block(block(statements))
}

pub fn assign_pattern(op: AssignOp, pattern: Pattern, value: Expr) -> Expr {
    Expr::Assign {
        id: fresh(),
        op,
        target: AssignTarget::Pattern(pattern),
        value: Box::new(value),
    }
}

/// `name := value`
pub fn declare(binding: &str, value: Expr) -> Statement {
    Statement::Expr(assign_pattern(AssignOp::Declare, bind(binding), value))
}

/// `name: ty := value`
pub fn declare_typed(binding: &str, ty: TypeExpr, value: Expr) -> Statement {
    Statement::Expr(assign_pattern(
        AssignOp::Declare,
        typed(bind(binding), ty),
        value,
    ))
}

/// `name = value`
pub fn assign(binding: &str, value: Expr) -> Statement {
    Statement::Expr(assign_pattern(AssignOp::Assign, bind(binding), value))
}

/// `place = value` or `place := value` where `place` is a member or index expression.
pub fn assign_place(op: AssignOp, place: Expr, value: Expr) -> Statement {
    Statement::Expr(Expr::Assign {
        id: fresh(),
        op,
        target: AssignTarget::Place(Box::new(place)),
        value: Box::new(value),
    })
}

pub fn range(start: Expr, end: Expr, inclusive: bool) -> Expr {
    Expr::Range {
        id: fresh(),
        start: Box::new(start),
        end: Box::new(end),
        inclusive,
    }
}

pub fn interpolate(parts: Vec<Expr>) -> Expr {
    Expr::Interpolation { id: fresh(), parts }
}

pub fn lambda(params: Vec<Param>, return_type: Option<TypeExpr>, body: Expr) -> Expr {
    Expr::Lambda {
        id: fresh(),
        params,
        return_type,
        body: Box::new(body),
    }
}

pub fn proc_expr(expr: Expr) -> Expr {
    Expr::Proc {
        id: fresh(),
        expr: Box::new(expr),
    }
}

pub fn spawn(expr: Expr) -> Expr {
    Expr::Spawn {
        id: fresh(),
        expr: Box::new(expr),
    }
}

pub fn await_expr(expr: Expr) -> Expr {
    Expr::Await {
        id: fresh(),
        expr: Box::new(expr),
    }
}

pub fn propagate(expr: Expr) -> Expr {
    Expr::Propagate {
        id: fresh(),
        expr: Box::new(expr),
    }
}

pub fn or_else(expr: Expr, binding: Option<&str>, handler: Vec<Statement>) -> Expr {
    Expr::OrElse {
        id: fresh(),
        expr: Box::new(expr),
        binding: binding.map(ident),
        handler: block(handler),
    }
}

pub fn breakpoint(label: &str, body: Vec<Statement>) -> Expr {
    Expr::Breakpoint {
        id: fresh(),
        label: ident(label),
        body: block(body),
    }
}

pub fn if_expr(condition: Expr, then_branch: Vec<Statement>, else_branch: Option<Expr>) -> Expr {
    Expr::If {
        id: fresh(),
        condition: Box::new(condition),
        then_branch: block(then_branch),
        else_branch: else_branch.map(Box::new),
    }
}

pub fn match_expr(subject: Expr, clauses: Vec<MatchClause>) -> Expr {
    Expr::Match {
        id: fresh(),
        subject: Box::new(subject),
        clauses,
    }
}

pub fn clause(pattern: Pattern, body: Expr) -> MatchClause {
    MatchClause {
        id: fresh(),
        pattern,
        guard: None,
        body,
    }
}

pub fn guarded_clause(pattern: Pattern, guard: Expr, body: Expr) -> MatchClause {
    MatchClause {
        guard: Some(guard),
        ..clause(pattern, body)
    }
}

pub fn loop_expr(body: Vec<Statement>) -> Expr {
    Expr::Loop {
        id: fresh(),
        body: block(body),
    }
}

pub fn iterator(element_type: Option<TypeExpr>, body: Vec<Statement>) -> Expr {
    Expr::Iterator {
        id: fresh(),
        element_type,
        body: block(body),
    }
}

pub fn rescue(expr: Expr, clauses: Vec<MatchClause>) -> Expr {
    Expr::Rescue {
        id: fresh(),
        expr: Box::new(expr),
        clauses,
    }
}

pub fn ensure(expr: Expr, ensure: Vec<Statement>) -> Expr {
    Expr::Ensure {
        id: fresh(),
        expr: Box::new(expr),
        ensure: block(ensure),
    }
}

// Statements.

pub fn stmt(expr: Expr) -> Statement {
    Statement::Expr(expr)
}

pub fn ret(value: Option<Expr>) -> Statement {
    Statement::Return { id: fresh(), value }
}

pub fn raise(value: Expr) -> Statement {
    Statement::Raise { id: fresh(), value }
}

pub fn rethrow() -> Statement {
    Statement::Rethrow { id: fresh() }
}

pub fn break_stmt(label: Option<&str>, value: Option<Expr>) -> Statement {
    Statement::Break {
        id: fresh(),
        label: label.map(ident),
        value,
    }
}

pub fn continue_stmt(label: Option<&str>) -> Statement {
    Statement::Continue {
        id: fresh(),
        label: label.map(ident),
    }
}

pub fn yield_stmt(value: Expr) -> Statement {
    Statement::Yield {
        id: fresh(),
        value: Some(value),
    }
}

pub fn while_loop(condition: Expr, body: Vec<Statement>) -> Statement {
    Statement::While {
        id: fresh(),
        condition,
        body: block(body),
    }
}

pub fn for_loop(pattern: Pattern, iterable: Expr, body: Vec<Statement>) -> Statement {
    Statement::For {
        id: fresh(),
        pattern,
        iterable,
        body: block(body),
    }
}

// Patterns.

pub fn bind(binding: &str) -> Pattern {
    Pattern::Ident(ident(binding))
}

pub fn wildcard() -> Pattern {
    Pattern::Wildcard { id: fresh() }
}

pub fn literal_pattern(value: Expr) -> Pattern {
    Pattern::Literal {
        id: fresh(),
        value: Box::new(value),
    }
}

pub fn typed(pattern: Pattern, ty: TypeExpr) -> Pattern {
    Pattern::Typed {
        id: fresh(),
        pattern: Box::new(pattern),
        ty,
    }
}

pub fn struct_pattern(struct_name: Option<&str>, fields: Vec<(&str, Pattern)>) -> Pattern {
    Pattern::Struct {
        id: fresh(),
        name: struct_name.map(ident),
        fields: fields
            .into_iter()
            .map(|(field, pattern)| FieldPattern {
                id: fresh(),
                field: Some(ident(field)),
                pattern,
            })
            .collect(),
        positional: false,
    }
}

pub fn array_pattern(elements: Vec<Pattern>, rest: Option<Pattern>) -> Pattern {
    Pattern::Array {
        id: fresh(),
        elements,
        rest: rest.map(Box::new),
    }
}

// Type expressions.

pub fn ty(type_name: &str) -> TypeExpr {
    TypeExpr::Named(ident(type_name))
}

pub fn generic_ty(base: &str, args: Vec<TypeExpr>) -> TypeExpr {
    TypeExpr::Generic {
        id: fresh(),
        base: ident(base),
        args,
    }
}

pub fn fn_ty(params: Vec<TypeExpr>, ret: TypeExpr) -> TypeExpr {
    TypeExpr::Function {
        id: fresh(),
        params,
        ret: Box::new(ret),
    }
}

pub fn nullable(inner: TypeExpr) -> TypeExpr {
    TypeExpr::Nullable {
        id: fresh(),
        inner: Box::new(inner),
    }
}

pub fn result_ty(inner: TypeExpr) -> TypeExpr {
    TypeExpr::Result {
        id: fresh(),
        inner: Box::new(inner),
    }
}

pub fn union_ty(members: Vec<TypeExpr>) -> TypeExpr {
    TypeExpr::Union {
        id: fresh(),
        members,
    }
}

pub fn wildcard_ty() -> TypeExpr {
    TypeExpr::Wildcard { id: fresh() }
}

// Definitions.

pub fn param(param_name: &str, param_type: TypeExpr) -> Param {
    Param {
        id: fresh(),
        pattern: bind(param_name),
        ty: Some(param_type),
    }
}

pub fn untyped_param(param_name: &str) -> Param {
    Param {
        id: fresh(),
        pattern: bind(param_name),
        ty: None,
    }
}

pub fn generic(param_name: &str, constraints: Vec<TypeExpr>) -> GenericParam {
    GenericParam {
        id: fresh(),
        name: ident(param_name),
        constraints,
    }
}

pub fn where_clause(type_param: &str, constraints: Vec<TypeExpr>) -> WhereClause {
    WhereClause {
        id: fresh(),
        type_param: ident(type_param),
        constraints,
    }
}

pub fn fn_def(
    fn_name: &str,
    params: Vec<Param>,
    return_type: Option<TypeExpr>,
    body: Vec<Statement>,
) -> FunctionDef {
    FunctionDef {
        id: fresh(),
        name: ident(fn_name),
        generics: Vec::new(),
        params,
        return_type,
        body: block(body),
        where_clauses: Vec::new(),
        method_shorthand: false,
        private: false,
    }
}

impl FunctionDef {
    pub fn with_generics(mut self, generics: Vec<GenericParam>) -> Self {
        self.generics = generics;
        self
    }

    pub fn with_where(mut self, where_clauses: Vec<WhereClause>) -> Self {
        self.where_clauses = where_clauses;
        self
    }

    pub fn shorthand(mut self) -> Self {
        self.method_shorthand = true;
        self
    }

    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }
}

pub fn field(field_name: &str, field_type: TypeExpr) -> StructField {
    StructField {
        id: fresh(),
        name: Some(ident(field_name)),
        ty: field_type,
    }
}

pub fn struct_def(struct_name: &str, fields: Vec<StructField>) -> StructDef {
    StructDef {
        id: fresh(),
        name: ident(struct_name),
        generics: Vec::new(),
        fields,
        kind: StructKind::Named,
        where_clauses: Vec::new(),
        private: false,
    }
}

pub fn positional_struct_def(struct_name: &str, fields: Vec<TypeExpr>) -> StructDef {
    StructDef {
        fields: fields
            .into_iter()
            .map(|field_type| StructField {
                id: fresh(),
                name: None,
                ty: field_type,
            })
            .collect(),
        kind: StructKind::Positional,
        ..struct_def(struct_name, Vec::new())
    }
}

impl StructDef {
    pub fn with_generics(mut self, generics: Vec<GenericParam>) -> Self {
        self.generics = generics;
        self
    }

    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }
}

pub fn union_def(union_name: &str, variants: Vec<TypeExpr>) -> UnionDef {
    UnionDef {
        id: fresh(),
        name: ident(union_name),
        generics: Vec::new(),
        variants,
        where_clauses: Vec::new(),
        private: false,
    }
}

pub fn signature(sig_name: &str, params: Vec<Param>, return_type: Option<TypeExpr>) -> FunctionSig {
    FunctionSig {
        id: fresh(),
        name: ident(sig_name),
        generics: Vec::new(),
        params,
        return_type,
        where_clauses: Vec::new(),
        default_body: None,
    }
}

pub fn interface_def(interface_name: &str, signatures: Vec<FunctionSig>) -> InterfaceDef {
    InterfaceDef {
        id: fresh(),
        name: ident(interface_name),
        generics: Vec::new(),
        self_type: None,
        signatures,
        where_clauses: Vec::new(),
        private: false,
    }
}

impl InterfaceDef {
    pub fn with_generics(mut self, generics: Vec<GenericParam>) -> Self {
        self.generics = generics;
        self
    }
}

pub fn alias_def(alias_name: &str, target: TypeExpr) -> TypeAliasDef {
    TypeAliasDef {
        id: fresh(),
        name: ident(alias_name),
        generics: Vec::new(),
        target,
        where_clauses: Vec::new(),
        private: false,
    }
}

impl TypeAliasDef {
    pub fn with_generics(mut self, generics: Vec<GenericParam>) -> Self {
        self.generics = generics;
        self
    }

    pub fn with_where(mut self, where_clauses: Vec<WhereClause>) -> Self {
        self.where_clauses = where_clauses;
        self
    }
}

pub fn impl_def(interface: &str, target: TypeExpr, definitions: Vec<FunctionDef>) -> ImplDef {
    ImplDef {
        id: fresh(),
        interface: ident(interface),
        interface_args: Vec::new(),
        target,
        generics: Vec::new(),
        definitions,
        where_clauses: Vec::new(),
        name: None,
        private: false,
    }
}

impl ImplDef {
    pub fn with_generics(mut self, generics: Vec<GenericParam>) -> Self {
        self.generics = generics;
        self
    }

    pub fn with_interface_args(mut self, args: Vec<TypeExpr>) -> Self {
        self.interface_args = args;
        self
    }

    pub fn named(mut self, impl_name: &str) -> Self {
        self.name = Some(ident(impl_name));
        self
    }
}

pub fn methods_def(target: TypeExpr, definitions: Vec<FunctionDef>) -> MethodsDef {
    MethodsDef {
        id: fresh(),
        target,
        generics: Vec::new(),
        definitions,
        where_clauses: Vec::new(),
    }
}

impl MethodsDef {
    pub fn with_generics(mut self, generics: Vec<GenericParam>) -> Self {
        self.generics = generics;
        self
    }

    pub fn with_where(mut self, where_clauses: Vec<WhereClause>) -> Self {
        self.where_clauses = where_clauses;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_allocate_distinct_ids() {
        let a = int(1);
        let b = int(1);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn package_paths_split_on_dots() {
        let module = package_module("app.util", vec![import("core.text")], Vec::new());
        let package = module.package.expect("package decl");
        assert_eq!(package.dotted(), "app.util");
        assert_eq!(module.imports[0].dotted(), "core.text");
    }

    #[test]
    fn declare_builds_typed_pattern() {
        let statement = declare_typed("x", ty("u8"), int(300));
        insta::assert_snapshot!(
            match statement {
                Statement::Expr(Expr::Assign {
                    op,
                    target: AssignTarget::Pattern(Pattern::Typed { .. }),
                    ..
                }) => format!("{op:?} typed"),
                other => format!("{other:?}"),
            },
            @"Declare typed"
        );
    }
}
