use std::collections::BTreeMap;
use std::fmt;

use able_base::NodeId;
use able_syntax::{FloatKind, IntegerKind};
use num_bigint::BigInt;

/// Name of the implicit receiver type parameter inside interfaces and method sets.
pub const SELF_TYPE: &str = "Self";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    String,
    Bool,
    Char,
    Nil,
    Void,
}

impl PrimitiveKind {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::String => "String",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Nil => "nil",
            PrimitiveKind::Void => "void",
        }
    }
}

/// An integer type, optionally remembering the literal it was inferred from.
///
/// Two integer types are equal when their kinds match; literal provenance only matters for
/// range checks and widening.
#[derive(Debug, Clone)]
pub struct IntegerType {
    pub kind: IntegerKind,
    pub literal: Option<BigInt>,
    /// `false` for unsuffixed literals, whose kind is only a default.
    pub explicit: bool,
}

impl IntegerType {
    pub fn of(kind: IntegerKind) -> Self {
        Self {
            kind,
            literal: None,
            explicit: true,
        }
    }

    pub fn is_flexible_literal(&self) -> bool {
        self.literal.is_some() && !self.explicit
    }
}

impl PartialEq for IntegerType {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

#[derive(Debug, Clone)]
pub struct FloatType {
    pub kind: FloatKind,
    pub literal: bool,
    pub explicit: bool,
}

impl FloatType {
    pub fn of(kind: FloatKind) -> Self {
        Self {
            kind,
            literal: false,
            explicit: true,
        }
    }
}

impl PartialEq for FloatType {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

/// Handle to an interface definition held in a scope's interface table.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceRef {
    pub name: String,
    pub args: Vec<Type>,
}

impl InterfaceRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericParamSpec {
    pub name: String,
    pub constraints: Vec<InterfaceRef>,
}

impl GenericParamSpec {
    pub fn unconstrained(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraints: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhereConstraint {
    pub type_param: String,
    pub constraints: Vec<InterfaceRef>,
}

/// A deferred request to prove that `subject` implements `constraint`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintObligation {
    /// `fn name`, `methods for T::m`, `impl I for T` ...
    pub owner: String,
    pub type_param: String,
    pub constraint: InterfaceRef,
    pub subject: Type,
    /// Provenance, e.g. `via method 'format'`.
    pub context: String,
    pub node: NodeId,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionType {
    pub params: Vec<Type>,
    pub ret: Box<Type>,
    pub type_params: Vec<GenericParamSpec>,
    pub where_clause: Vec<WhereConstraint>,
    pub obligations: Vec<ConstraintObligation>,
}

impl FunctionType {
    pub fn new(params: Vec<Type>, ret: Type) -> Self {
        Self {
            params,
            ret: Box::new(ret),
            ..Self::default()
        }
    }

    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }

    pub fn has_optional_last(&self) -> bool {
        matches!(self.params.last(), Some(Type::Nullable(_)))
    }

    /// Drops the receiver parameter of a method so it can be called on a value.
    pub fn bind_receiver(&self) -> FunctionType {
        let mut bound = self.clone();
        if !bound.params.is_empty() {
            bound.params.remove(0);
        }
        bound
    }
}

/// Signatures compare by shape; generics, where clauses and queued obligations are ignored.
impl PartialEq for FunctionType {
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params && self.ret == other.ret
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionType {
    /// `None` for anonymous `A | B` unions.
    pub name: Option<String>,
    pub type_params: Vec<GenericParamSpec>,
    pub variants: Vec<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AliasType {
    pub name: String,
    pub type_params: Vec<GenericParamSpec>,
    pub target: Box<Type>,
    pub where_clause: Vec<WhereConstraint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageType {
    pub name: String,
    pub symbols: BTreeMap<String, Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImplementationNamespace {
    pub name: String,
    pub interface: String,
    pub target: Box<Type>,
    pub methods: BTreeMap<String, FunctionType>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Primitive(PrimitiveKind),
    Integer(IntegerType),
    Float(FloatType),
    /// Named struct; its layout lives in the scope's struct table.
    Struct(String),
    StructInstance {
        name: String,
        args: Vec<Type>,
    },
    Interface(InterfaceRef),
    Union(UnionType),
    Array(Box<Type>),
    Map(Box<Type>, Box<Type>),
    Range(Box<Type>),
    Iterator(Box<Type>),
    Nullable(Box<Type>),
    Function(FunctionType),
    Proc(Box<Type>),
    Future(Box<Type>),
    TypeParameter(String),
    Alias(AliasType),
    Applied {
        base: Box<Type>,
        args: Vec<Type>,
    },
    Package(PackageType),
    ImplementationNamespace(ImplementationNamespace),
    /// Same-name functions collected into one binding.
    Overloads(Vec<FunctionType>),
    Unknown,
}

impl Default for Type {
    fn default() -> Self {
        Type::Unknown
    }
}

impl Type {
    pub fn string() -> Type {
        Type::Primitive(PrimitiveKind::String)
    }

    pub fn bool() -> Type {
        Type::Primitive(PrimitiveKind::Bool)
    }

    pub fn char() -> Type {
        Type::Primitive(PrimitiveKind::Char)
    }

    pub fn nil() -> Type {
        Type::Primitive(PrimitiveKind::Nil)
    }

    pub fn void() -> Type {
        Type::Primitive(PrimitiveKind::Void)
    }

    pub fn int(kind: IntegerKind) -> Type {
        Type::Integer(IntegerType::of(kind))
    }

    pub fn float(kind: FloatKind) -> Type {
        Type::Float(FloatType::of(kind))
    }

    pub fn array(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    pub fn nullable(inner: Type) -> Type {
        match inner {
            Type::Nullable(_) | Type::Unknown => inner,
            other => Type::Nullable(Box::new(other)),
        }
    }

    pub fn interface(name: impl Into<String>) -> Type {
        Type::Interface(InterfaceRef::named(name))
    }

    pub fn param(name: impl Into<String>) -> Type {
        Type::TypeParameter(name.into())
    }

    /// Anonymous union; collapses to the single member when only one remains.
    pub fn union_of(variants: Vec<Type>) -> Type {
        let mut members: Vec<Type> = Vec::new();
        for variant in variants {
            let flattened = match variant {
                Type::Union(UnionType {
                    name: None,
                    variants,
                    ..
                }) => variants,
                other => vec![other],
            };
            for member in flattened {
                if !members.contains(&member) {
                    members.push(member);
                }
            }
        }
        match members.len() {
            0 => Type::Unknown,
            1 => members.remove(0),
            _ => Type::Union(UnionType {
                name: None,
                type_params: Vec::new(),
                variants: members,
            }),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Integer(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::Float(_))
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Type::Primitive(PrimitiveKind::String))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Type::Primitive(PrimitiveKind::Bool))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Type::Primitive(PrimitiveKind::Nil))
    }

    pub fn is_type_parameter(&self) -> bool {
        matches!(self, Type::TypeParameter(_))
    }

    pub fn contains_unknown(&self) -> bool {
        match self {
            Type::Unknown => true,
            Type::Array(inner)
            | Type::Range(inner)
            | Type::Iterator(inner)
            | Type::Nullable(inner)
            | Type::Proc(inner)
            | Type::Future(inner) => inner.contains_unknown(),
            Type::Map(key, value) => key.contains_unknown() || value.contains_unknown(),
            Type::StructInstance { args, .. } => args.iter().any(Type::contains_unknown),
            Type::Applied { base, args } => {
                base.contains_unknown() || args.iter().any(Type::contains_unknown)
            }
            Type::Union(union) => union.variants.iter().any(Type::contains_unknown),
            Type::Function(func) => {
                func.params.iter().any(Type::contains_unknown) || func.ret.contains_unknown()
            }
            _ => false,
        }
    }

    /// Name used to key struct layouts and method-set targets.
    pub fn nominal_name(&self) -> Option<&str> {
        match self {
            Type::Struct(name) | Type::StructInstance { name, .. } => Some(name),
            Type::Interface(iface) => Some(&iface.name),
            Type::Union(UnionType {
                name: Some(name), ..
            }) => Some(name),
            Type::Alias(alias) => Some(&alias.name),
            Type::Applied { base, .. } => base.nominal_name(),
            _ => None,
        }
    }

    /// Strips aliases and applies generic alias/union arguments.
    pub fn resolved(&self) -> Type {
        match self {
            Type::Alias(alias) => alias.target.resolved(),
            Type::Applied { base, args } => match base.as_ref() {
                Type::Alias(alias) => {
                    let bindings = crate::substitute::bind_params(&alias.type_params, args);
                    crate::substitute::substitute(&alias.target, &bindings).resolved()
                }
                Type::Union(union) if !union.type_params.is_empty() => {
                    let bindings = crate::substitute::bind_params(&union.type_params, args);
                    Type::Union(UnionType {
                        name: union.name.clone(),
                        type_params: Vec::new(),
                        variants: union
                            .variants
                            .iter()
                            .map(|variant| crate::substitute::substitute(variant, &bindings))
                            .collect(),
                    })
                }
                Type::Struct(name) => Type::StructInstance {
                    name: name.clone(),
                    args: args.clone(),
                },
                Type::Interface(iface) => Type::Interface(InterfaceRef {
                    name: iface.name.clone(),
                    args: args.clone(),
                }),
                _ => self.clone(),
            },
            _ => self.clone(),
        }
    }
}

fn needs_parens(ty: &Type) -> bool {
    match ty {
        Type::StructInstance { args, .. } => !args.is_empty(),
        Type::Interface(iface) => !iface.args.is_empty(),
        Type::Applied { args, .. } => !args.is_empty(),
        Type::Array(_)
        | Type::Map(_, _)
        | Type::Range(_)
        | Type::Iterator(_)
        | Type::Proc(_)
        | Type::Future(_)
        | Type::Function(_) => true,
        Type::Union(union) => union.name.is_none(),
        _ => false,
    }
}

struct Arg<'a>(&'a Type);

impl fmt::Display for Arg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if needs_parens(self.0) {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

fn write_applied(f: &mut fmt::Formatter<'_>, base: &str, args: &[Type]) -> fmt::Result {
    f.write_str(base)?;
    for arg in args {
        write!(f, " {}", Arg(arg))?;
    }
    Ok(())
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(kind) => f.write_str(kind.name()),
            Type::Integer(int) => f.write_str(int.kind.name()),
            Type::Float(float) => f.write_str(float.kind.name()),
            Type::Struct(name) => f.write_str(name),
            Type::StructInstance { name, args } => write_applied(f, name, args),
            Type::Interface(iface) => write_applied(f, &iface.name, &iface.args),
            Type::Union(union) => match &union.name {
                Some(name) => f.write_str(name),
                None => {
                    for (idx, variant) in union.variants.iter().enumerate() {
                        if idx > 0 {
                            f.write_str(" | ")?;
                        }
                        write!(f, "{variant}")?;
                    }
                    Ok(())
                }
            },
            Type::Array(inner) => write!(f, "Array {}", Arg(inner)),
            Type::Map(key, value) => write!(f, "Map {} {}", Arg(key), Arg(value)),
            Type::Range(inner) => write!(f, "Range {}", Arg(inner)),
            Type::Iterator(inner) => write!(f, "Iterator {}", Arg(inner)),
            Type::Nullable(inner) => write!(f, "?{}", Arg(inner)),
            Type::Proc(inner) => write!(f, "Proc {}", Arg(inner)),
            Type::Future(inner) => write!(f, "Future {}", Arg(inner)),
            Type::Function(func) => {
                f.write_str("fn(")?;
                for (idx, param) in func.params.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ") -> {}", func.ret)
            }
            Type::TypeParameter(name) => f.write_str(name),
            Type::Alias(alias) => f.write_str(&alias.name),
            Type::Applied { base, args } => {
                let base_name = base.to_string();
                write_applied(f, &base_name, args)
            }
            Type::Package(package) => write!(f, "package {}", package.name),
            Type::ImplementationNamespace(ns) => f.write_str(&ns.name),
            Type::Overloads(_) => f.write_str("<function overload>"),
            Type::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Structural definition of a named struct.
#[derive(Debug, Clone, PartialEq)]
pub struct StructInfo {
    pub name: String,
    pub type_params: Vec<GenericParamSpec>,
    /// Named fields in declaration order; positional structs use `"0"`, `"1"`, ...
    pub fields: Vec<(String, Type)>,
    pub positional: bool,
    pub node: NodeId,
}

impl StructInfo {
    pub fn field(&self, name: &str) -> Option<&Type> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, ty)| ty)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceInfo {
    pub name: String,
    pub type_params: Vec<GenericParamSpec>,
    pub methods: BTreeMap<String, FunctionType>,
    /// Methods with a default body; implementations may omit them.
    pub defaulted: Vec<String>,
    pub where_clause: Vec<WhereConstraint>,
    pub node: NodeId,
}

/// "`target` implements `interface`".
#[derive(Debug, Clone, PartialEq)]
pub struct ImplementationSpec {
    pub interface: String,
    pub interface_args: Vec<Type>,
    pub target: Type,
    pub methods: BTreeMap<String, FunctionType>,
    pub type_params: Vec<GenericParamSpec>,
    pub where_clause: Vec<WhereConstraint>,
    pub obligations: Vec<ConstraintObligation>,
    pub impl_name: Option<String>,
    pub node: NodeId,
}

impl ImplementationSpec {
    pub fn label(&self) -> String {
        format!("impl {} for {}", self.interface, self.target)
    }
}

/// Inherent methods attached to a target type.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSetSpec {
    pub target: Type,
    pub methods: BTreeMap<String, FunctionType>,
    pub type_params: Vec<GenericParamSpec>,
    pub where_clause: Vec<WhereConstraint>,
    pub obligations: Vec<ConstraintObligation>,
    pub node: NodeId,
}

/// A public top-level binding of a checked module.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedSymbol {
    pub name: String,
    pub ty: Type,
    pub node: NodeId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_types_in_able_syntax() {
        let ty = Type::Map(
            Box::new(Type::string()),
            Box::new(Type::array(Type::nullable(Type::int(IntegerKind::U8)))),
        );
        insta::assert_snapshot!(ty.to_string(), @"Map String (Array ?u8)");
        let func = Type::Function(FunctionType::new(
            vec![Type::int(IntegerKind::I32), Type::param("T")],
            Type::union_of(vec![Type::param("T"), Type::interface("Error")]),
        ));
        insta::assert_snapshot!(func.to_string(), @"fn(i32, T) -> T | Error");
    }

    #[test]
    fn integer_equality_ignores_literal_provenance() {
        let literal = Type::Integer(IntegerType {
            kind: IntegerKind::I32,
            literal: Some(BigInt::from(7)),
            explicit: false,
        });
        assert_eq!(literal, Type::int(IntegerKind::I32));
        assert_ne!(literal, Type::int(IntegerKind::I64));
    }

    #[test]
    fn union_of_flattens_and_dedups() {
        let ty = Type::union_of(vec![
            Type::string(),
            Type::union_of(vec![Type::string(), Type::nil()]),
        ]);
        assert_eq!(ty.to_string(), "String | nil");
        assert_eq!(Type::union_of(vec![Type::bool()]), Type::bool());
    }
}
