use able_base::NodeId;
use num_bigint::BigInt;

use crate::{FloatKind, IntegerKind};

#[derive(Debug, Clone)]
pub struct Identifier {
    pub id: NodeId,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Module {
    pub id: NodeId,
    pub package: Option<PackageDecl>,
    pub imports: Vec<ImportDecl>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub struct PackageDecl {
    pub id: NodeId,
    pub path: Vec<Identifier>,
    pub private: bool,
}

impl PackageDecl {
    pub fn dotted(&self) -> String {
        dotted_path(&self.path)
    }
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub id: NodeId,
    pub path: Vec<Identifier>,
    pub alias: Option<Identifier>,
    pub selectors: Vec<ImportSelector>,
    pub wildcard: bool,
}

impl ImportDecl {
    pub fn dotted(&self) -> String {
        dotted_path(&self.path)
    }
}

#[derive(Debug, Clone)]
pub struct ImportSelector {
    pub id: NodeId,
    pub name: Identifier,
    pub alias: Option<Identifier>,
}

fn dotted_path(path: &[Identifier]) -> String {
    path.iter()
        .map(|segment| segment.name.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

#[derive(Debug, Clone)]
pub enum Statement {
    Expr(Expr),
    Struct(StructDef),
    Union(UnionDef),
    Interface(InterfaceDef),
    TypeAlias(TypeAliasDef),
    Function(FunctionDef),
    Impl(ImplDef),
    Methods(MethodsDef),
    Return {
        id: NodeId,
        value: Option<Expr>,
    },
    Raise {
        id: NodeId,
        value: Expr,
    },
    Rethrow {
        id: NodeId,
    },
    Break {
        id: NodeId,
        label: Option<Identifier>,
        value: Option<Expr>,
    },
    Continue {
        id: NodeId,
        label: Option<Identifier>,
    },
    Yield {
        id: NodeId,
        value: Option<Expr>,
    },
    While {
        id: NodeId,
        condition: Expr,
        body: Block,
    },
    For {
        id: NodeId,
        pattern: Pattern,
        iterable: Expr,
        body: Block,
    },
}

impl Statement {
    pub fn id(&self) -> NodeId {
        match self {
            Statement::Expr(expr) => expr.id(),
            Statement::Struct(def) => def.id,
            Statement::Union(def) => def.id,
            Statement::Interface(def) => def.id,
            Statement::TypeAlias(def) => def.id,
            Statement::Function(def) => def.id,
            Statement::Impl(def) => def.id,
            Statement::Methods(def) => def.id,
            Statement::Return { id, .. }
            | Statement::Raise { id, .. }
            | Statement::Rethrow { id }
            | Statement::Break { id, .. }
            | Statement::Continue { id, .. }
            | Statement::Yield { id, .. }
            | Statement::While { id, .. }
            | Statement::For { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    pub id: NodeId,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => ".~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Pow => "^",
            BinaryOp::BitAnd => ".&",
            BinaryOp::BitOr => ".|",
            BinaryOp::BitXor => ".^",
            BinaryOp::Shl => ".<<",
            BinaryOp::Shr => ".>>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `:=`
    Declare,
    /// `=`
    Assign,
    /// `+=`, `-=`, ...
    Compound(BinaryOp),
}

#[derive(Debug, Clone)]
pub enum AssignTarget {
    Pattern(Pattern),
    /// A member access or index expression.
    Place(Box<Expr>),
}

#[derive(Debug, Clone)]
pub enum MapElement {
    Entry {
        id: NodeId,
        key: Expr,
        value: Expr,
    },
    Spread {
        id: NodeId,
        value: Expr,
    },
}

#[derive(Debug, Clone)]
pub struct StructFieldInit {
    pub id: NodeId,
    pub name: Option<Identifier>,
    pub value: Expr,
}

#[derive(Debug, Clone)]
pub struct MatchClause {
    pub id: NodeId,
    pub pattern: Pattern,
    pub guard: Option<Expr>,
    pub body: Expr,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Ident(Identifier),
    Integer {
        id: NodeId,
        value: BigInt,
        suffix: Option<IntegerKind>,
    },
    Float {
        id: NodeId,
        value: f64,
        suffix: Option<FloatKind>,
    },
    Bool {
        id: NodeId,
        value: bool,
    },
    Nil {
        id: NodeId,
    },
    Char {
        id: NodeId,
        value: char,
    },
    String {
        id: NodeId,
        value: String,
    },
    Array {
        id: NodeId,
        elements: Vec<Expr>,
    },
    Map {
        id: NodeId,
        elements: Vec<MapElement>,
    },
    StructLiteral {
        id: NodeId,
        name: Identifier,
        type_args: Vec<TypeExpr>,
        fields: Vec<StructFieldInit>,
        positional: bool,
    },
    Unary {
        id: NodeId,
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        id: NodeId,
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        id: NodeId,
        callee: Box<Expr>,
        args: Vec<Expr>,
        type_args: Vec<TypeExpr>,
    },
    Member {
        id: NodeId,
        object: Box<Expr>,
        member: Identifier,
        safe: bool,
    },
    Index {
        id: NodeId,
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Block(Block),
    Assign {
        id: NodeId,
        op: AssignOp,
        target: AssignTarget,
        value: Box<Expr>,
    },
    Range {
        id: NodeId,
        start: Box<Expr>,
        end: Box<Expr>,
        inclusive: bool,
    },
    Interpolation {
        id: NodeId,
        parts: Vec<Expr>,
    },
    Lambda {
        id: NodeId,
        params: Vec<Param>,
        return_type: Option<TypeExpr>,
        body: Box<Expr>,
    },
    Proc {
        id: NodeId,
        expr: Box<Expr>,
    },
    Spawn {
        id: NodeId,
        expr: Box<Expr>,
    },
    Await {
        id: NodeId,
        expr: Box<Expr>,
    },
    /// Postfix `!`.
    Propagate {
        id: NodeId,
        expr: Box<Expr>,
    },
    OrElse {
        id: NodeId,
        expr: Box<Expr>,
        binding: Option<Identifier>,
        handler: Block,
    },
    Breakpoint {
        id: NodeId,
        label: Identifier,
        body: Block,
    },
    If {
        id: NodeId,
        condition: Box<Expr>,
        then_branch: Block,
        else_branch: Option<Box<Expr>>,
    },
    Match {
        id: NodeId,
        subject: Box<Expr>,
        clauses: Vec<MatchClause>,
    },
    Loop {
        id: NodeId,
        body: Block,
    },
    Iterator {
        id: NodeId,
        element_type: Option<TypeExpr>,
        body: Block,
    },
    Rescue {
        id: NodeId,
        expr: Box<Expr>,
        clauses: Vec<MatchClause>,
    },
    Ensure {
        id: NodeId,
        expr: Box<Expr>,
        ensure: Block,
    },
}

impl Expr {
    pub fn id(&self) -> NodeId {
        match self {
            Expr::Ident(ident) => ident.id,
            Expr::Block(block) => block.id,
            Expr::Integer { id, .. }
            | Expr::Float { id, .. }
            | Expr::Bool { id, .. }
            | Expr::Nil { id }
            | Expr::Char { id, .. }
            | Expr::String { id, .. }
            | Expr::Array { id, .. }
            | Expr::Map { id, .. }
            | Expr::StructLiteral { id, .. }
            | Expr::Unary { id, .. }
            | Expr::Binary { id, .. }
            | Expr::Call { id, .. }
            | Expr::Member { id, .. }
            | Expr::Index { id, .. }
            | Expr::Assign { id, .. }
            | Expr::Range { id, .. }
            | Expr::Interpolation { id, .. }
            | Expr::Lambda { id, .. }
            | Expr::Proc { id, .. }
            | Expr::Spawn { id, .. }
            | Expr::Await { id, .. }
            | Expr::Propagate { id, .. }
            | Expr::OrElse { id, .. }
            | Expr::Breakpoint { id, .. }
            | Expr::If { id, .. }
            | Expr::Match { id, .. }
            | Expr::Loop { id, .. }
            | Expr::Iterator { id, .. }
            | Expr::Rescue { id, .. }
            | Expr::Ensure { id, .. } => *id,
        }
    }

    pub fn as_ident(&self) -> Option<&Identifier> {
        match self {
            Expr::Ident(ident) => Some(ident),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldPattern {
    pub id: NodeId,
    pub field: Option<Identifier>,
    pub pattern: Pattern,
}

#[derive(Debug, Clone)]
pub enum Pattern {
    Ident(Identifier),
    Wildcard {
        id: NodeId,
    },
    Literal {
        id: NodeId,
        value: Box<Expr>,
    },
    Struct {
        id: NodeId,
        name: Option<Identifier>,
        fields: Vec<FieldPattern>,
        positional: bool,
    },
    Array {
        id: NodeId,
        elements: Vec<Pattern>,
        rest: Option<Box<Pattern>>,
    },
    Typed {
        id: NodeId,
        pattern: Box<Pattern>,
        ty: TypeExpr,
    },
}

impl Pattern {
    pub fn id(&self) -> NodeId {
        match self {
            Pattern::Ident(ident) => ident.id,
            Pattern::Wildcard { id }
            | Pattern::Literal { id, .. }
            | Pattern::Struct { id, .. }
            | Pattern::Array { id, .. }
            | Pattern::Typed { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TypeExpr {
    Named(Identifier),
    Generic {
        id: NodeId,
        base: Identifier,
        args: Vec<TypeExpr>,
    },
    Function {
        id: NodeId,
        params: Vec<TypeExpr>,
        ret: Box<TypeExpr>,
    },
    Nullable {
        id: NodeId,
        inner: Box<TypeExpr>,
    },
    /// `!T`, shorthand for `T | Error`.
    Result {
        id: NodeId,
        inner: Box<TypeExpr>,
    },
    Union {
        id: NodeId,
        members: Vec<TypeExpr>,
    },
    Wildcard {
        id: NodeId,
    },
}

impl TypeExpr {
    pub fn id(&self) -> NodeId {
        match self {
            TypeExpr::Named(ident) => ident.id,
            TypeExpr::Generic { id, .. }
            | TypeExpr::Function { id, .. }
            | TypeExpr::Nullable { id, .. }
            | TypeExpr::Result { id, .. }
            | TypeExpr::Union { id, .. }
            | TypeExpr::Wildcard { id } => *id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenericParam {
    pub id: NodeId,
    pub name: Identifier,
    pub constraints: Vec<TypeExpr>,
}

#[derive(Debug, Clone)]
pub struct WhereClause {
    pub id: NodeId,
    pub type_param: Identifier,
    pub constraints: Vec<TypeExpr>,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub id: NodeId,
    pub pattern: Pattern,
    pub ty: Option<TypeExpr>,
}

impl Param {
    pub fn name(&self) -> Option<&str> {
        match &self.pattern {
            Pattern::Ident(ident) => Some(ident.name.as_str()),
            Pattern::Typed { pattern, .. } => match pattern.as_ref() {
                Pattern::Ident(ident) => Some(ident.name.as_str()),
                _ => None,
            },
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructKind {
    Named,
    Positional,
    Singleton,
}

#[derive(Debug, Clone)]
pub struct StructField {
    pub id: NodeId,
    pub name: Option<Identifier>,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone)]
pub struct StructDef {
    pub id: NodeId,
    pub name: Identifier,
    pub generics: Vec<GenericParam>,
    pub fields: Vec<StructField>,
    pub kind: StructKind,
    pub where_clauses: Vec<WhereClause>,
    pub private: bool,
}

#[derive(Debug, Clone)]
pub struct UnionDef {
    pub id: NodeId,
    pub name: Identifier,
    pub generics: Vec<GenericParam>,
    pub variants: Vec<TypeExpr>,
    pub where_clauses: Vec<WhereClause>,
    pub private: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionSig {
    pub id: NodeId,
    pub name: Identifier,
    pub generics: Vec<GenericParam>,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub where_clauses: Vec<WhereClause>,
    pub default_body: Option<Block>,
}

#[derive(Debug, Clone)]
pub struct InterfaceDef {
    pub id: NodeId,
    pub name: Identifier,
    pub generics: Vec<GenericParam>,
    pub self_type: Option<TypeExpr>,
    pub signatures: Vec<FunctionSig>,
    pub where_clauses: Vec<WhereClause>,
    pub private: bool,
}

#[derive(Debug, Clone)]
pub struct TypeAliasDef {
    pub id: NodeId,
    pub name: Identifier,
    pub generics: Vec<GenericParam>,
    pub target: TypeExpr,
    pub where_clauses: Vec<WhereClause>,
    pub private: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub id: NodeId,
    pub name: Identifier,
    pub generics: Vec<GenericParam>,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub body: Block,
    pub where_clauses: Vec<WhereClause>,
    /// `fn #name(...)`: the receiver is implicit.
    pub method_shorthand: bool,
    pub private: bool,
}

#[derive(Debug, Clone)]
pub struct ImplDef {
    pub id: NodeId,
    pub interface: Identifier,
    pub interface_args: Vec<TypeExpr>,
    pub target: TypeExpr,
    pub generics: Vec<GenericParam>,
    pub definitions: Vec<FunctionDef>,
    pub where_clauses: Vec<WhereClause>,
    /// Named implementations are reachable as a namespace value.
    pub name: Option<Identifier>,
    pub private: bool,
}

#[derive(Debug, Clone)]
pub struct MethodsDef {
    pub id: NodeId,
    pub target: TypeExpr,
    pub generics: Vec<GenericParam>,
    pub definitions: Vec<FunctionDef>,
    pub where_clauses: Vec<WhereClause>,
}

macro_rules! statement_from {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Statement {
                fn from(value: $ty) -> Self {
                    Statement::$variant(value)
                }
            }
        )*
    };
}

statement_from! {
    Expr => Expr,
    StructDef => Struct,
    UnionDef => Union,
    InterfaceDef => Interface,
    TypeAliasDef => TypeAlias,
    FunctionDef => Function,
    ImplDef => Impl,
    MethodsDef => Methods,
}
