use able_base::NodeId;
use able_syntax::{FloatKind, GenericParam, Identifier, IntegerKind, TypeExpr, WhereClause};

use super::{AliasInstantiation, TypeChecker};
use crate::types::{FunctionType, GenericParamSpec, InterfaceRef, SELF_TYPE, Type, WhereConstraint};

/// Builtin containers and the number of type arguments they take.
const CONTAINERS: [(&str, usize); 6] = [
    ("Array", 1),
    ("Map", 2),
    ("Range", 1),
    ("Iterator", 1),
    ("Proc", 1),
    ("Future", 1),
];

pub(super) fn builtin_type(name: &str) -> Option<Type> {
    match name {
        "String" => Some(Type::string()),
        "bool" => Some(Type::bool()),
        "char" => Some(Type::char()),
        "nil" => Some(Type::nil()),
        "void" => Some(Type::void()),
        _ => IntegerKind::from_name(name)
            .map(Type::int)
            .or_else(|| FloatKind::from_name(name).map(Type::float)),
    }
}

fn container(name: &str, mut args: Vec<Type>) -> Option<Type> {
    let arity = CONTAINERS
        .iter()
        .find(|(container, _)| *container == name)
        .map(|(_, arity)| *arity)?;
    args.resize(arity, Type::Unknown);
    let mut args = args.into_iter();
    let mut next = || Box::new(args.next().unwrap_or_default());
    Some(match name {
        "Array" => Type::Array(next()),
        "Map" => {
            let key = next();
            Type::Map(key, next())
        }
        "Range" => Type::Range(next()),
        "Iterator" => Type::Iterator(next()),
        "Proc" => Type::Proc(next()),
        _ => Type::Future(next()),
    })
}

/// Names that can never be inferred as implicit generic parameters.
fn is_reserved(name: &str) -> bool {
    name == SELF_TYPE
        || name == "_"
        || builtin_type(name).is_some()
        || CONTAINERS.iter().any(|(container, _)| *container == name)
}

fn collect_names<'a>(expr: &'a TypeExpr, out: &mut Vec<&'a Identifier>) {
    match expr {
        TypeExpr::Named(ident) => out.push(ident),
        TypeExpr::Generic { base, args, .. } => {
            out.push(base);
            for arg in args {
                collect_names(arg, out);
            }
        }
        TypeExpr::Function { params, ret, .. } => {
            for param in params {
                collect_names(param, out);
            }
            collect_names(ret, out);
        }
        TypeExpr::Nullable { inner, .. } | TypeExpr::Result { inner, .. } => {
            collect_names(inner, out)
        }
        TypeExpr::Union { members, .. } => {
            for member in members {
                collect_names(member, out);
            }
        }
        TypeExpr::Wildcard { .. } => {}
    }
}

impl TypeChecker {
    pub(super) fn resolve_type(&mut self, expr: &TypeExpr) -> Type {
        match expr {
            TypeExpr::Named(ident) => self.resolve_named_type(ident),
            TypeExpr::Generic { id, base, args } => {
                let args: Vec<Type> = args.iter().map(|arg| self.resolve_type(arg)).collect();
                self.apply_type(*id, base, args)
            }
            TypeExpr::Function { params, ret, .. } => {
                let params = params.iter().map(|param| self.resolve_type(param)).collect();
                let ret = self.resolve_type(ret);
                Type::Function(FunctionType::new(params, ret))
            }
            TypeExpr::Nullable { inner, .. } => Type::nullable(self.resolve_type(inner)),
            TypeExpr::Result { inner, .. } => {
                Type::union_of(vec![self.resolve_type(inner), Type::interface("Error")])
            }
            TypeExpr::Union { members, .. } => Type::union_of(
                members
                    .iter()
                    .map(|member| self.resolve_type(member))
                    .collect(),
            ),
            TypeExpr::Wildcard { .. } => Type::Unknown,
        }
    }

    fn is_generic_name(&self, name: &str) -> bool {
        name == SELF_TYPE || self.generic_names.iter().any(|generic| generic == name)
    }

    fn resolve_named_type(&mut self, ident: &Identifier) -> Type {
        let name = ident.name.as_str();
        if self.is_generic_name(name) {
            return Type::param(name);
        }
        if let Some(ty) = builtin_type(name) {
            return ty;
        }
        if let Some(ty) = container(name, Vec::new()) {
            return ty;
        }
        match self.env.lookup(name) {
            Some(
                ty @ (Type::Struct(_)
                | Type::StructInstance { .. }
                | Type::Interface(_)
                | Type::Union(_)
                | Type::Alias(_)),
            ) => ty.clone(),
            _ => {
                self.error(ident.id, format!("unknown type '{name}'"));
                Type::Unknown
            }
        }
    }

    fn apply_type(&mut self, node: NodeId, base: &Identifier, args: Vec<Type>) -> Type {
        let name = base.name.as_str();
        if self.is_generic_name(name) {
            return Type::Applied {
                base: Box::new(Type::param(name)),
                args,
            };
        }
        if let Some(ty) = container(name, args.clone()) {
            return ty;
        }
        match self.env.lookup(name).cloned() {
            Some(Type::Struct(struct_name)) => {
                let expected = self
                    .env
                    .lookup_struct(&struct_name)
                    .map(|info| info.type_params.len())
                    .unwrap_or_default();
                if expected != args.len() {
                    self.error(
                        node,
                        format!(
                            "type '{struct_name}' expects {expected} type argument(s), got {}",
                            args.len()
                        ),
                    );
                }
                Type::StructInstance {
                    name: struct_name,
                    args,
                }
            }
            Some(Type::Interface(iface)) => Type::Interface(InterfaceRef {
                name: iface.name,
                args,
            }),
            Some(union @ Type::Union(_)) => Type::Applied {
                base: Box::new(union),
                args,
            },
            Some(Type::Alias(alias)) => {
                if !alias.where_clause.is_empty() {
                    self.alias_instantiations.push(AliasInstantiation {
                        alias: alias.clone(),
                        args: args.clone(),
                        node,
                    });
                }
                Type::Applied {
                    base: Box::new(Type::Alias(alias)),
                    args,
                }
            }
            _ => {
                self.error(base.id, format!("unknown type '{name}'"));
                Type::Unknown
            }
        }
    }

    /// Resolves generic parameters; constraints must name interfaces.
    pub(super) fn generic_specs(&mut self, generics: &[GenericParam]) -> Vec<GenericParamSpec> {
        generics
            .iter()
            .map(|param| GenericParamSpec {
                name: param.name.name.clone(),
                constraints: self.interface_constraints(&param.name.name, &param.constraints),
            })
            .collect()
    }

    pub(super) fn where_constraints(&mut self, clauses: &[WhereClause]) -> Vec<WhereConstraint> {
        clauses
            .iter()
            .map(|clause| WhereConstraint {
                type_param: clause.type_param.name.clone(),
                constraints: self
                    .interface_constraints(&clause.type_param.name, &clause.constraints),
            })
            .collect()
    }

    fn interface_constraints(&mut self, param: &str, exprs: &[TypeExpr]) -> Vec<InterfaceRef> {
        let mut constraints = Vec::new();
        for expr in exprs {
            match self.resolve_type(expr) {
                Type::Interface(iface) => constraints.push(iface),
                Type::Unknown => {}
                other => self.error(
                    expr.id(),
                    format!("constraint on {param} must be an interface, got {other}"),
                ),
            }
        }
        constraints
    }

    /// Type names in a signature that are neither declared nor builtin become implicit generic
    /// parameters, in order of first appearance.
    pub(super) fn inferred_generic_names<'a>(
        &mut self,
        exprs: impl IntoIterator<Item = &'a TypeExpr>,
        where_clauses: &[WhereClause],
        explicit: &[String],
    ) -> Vec<String> {
        let mut occurrences = Vec::new();
        for expr in exprs {
            collect_names(expr, &mut occurrences);
        }
        let mut inferred: Vec<String> = Vec::new();
        for ident in occurrences {
            let name = ident.name.as_str();
            if explicit.iter().any(|known| known == name)
                || inferred.iter().any(|known| known == name)
                || self.is_generic_name(name)
                || is_reserved(name)
                || name.contains('.')
            {
                continue;
            }
            if matches!(
                self.env.lookup(name),
                Some(ty) if !matches!(ty, Type::Function(_) | Type::Overloads(_))
            ) {
                continue;
            }
            inferred.push(name.to_string());
        }
        for clause in where_clauses {
            let name = clause.type_param.name.as_str();
            if explicit.iter().any(|known| known == name)
                || inferred.iter().any(|known| known == name)
                || self.is_generic_name(name)
            {
                continue;
            }
            if self.env.lookup(name).is_some() || is_reserved(name) {
                self.error(
                    clause.type_param.id,
                    format!(
                        "cannot infer type parameter '{name}' because a type with the same name exists; declare it explicitly or qualify the type"
                    ),
                );
                continue;
            }
            inferred.push(name.to_string());
        }
        inferred
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containers_fill_missing_arguments() {
        assert_eq!(
            container("Map", vec![Type::string()]).map(|ty| ty.to_string()),
            Some("Map String Unknown".to_string())
        );
        assert!(container("Point", Vec::new()).is_none());
    }

    #[test]
    fn builtin_names_are_reserved() {
        assert!(is_reserved("u8"));
        assert!(is_reserved("Iterator"));
        assert!(is_reserved(SELF_TYPE));
        assert!(!is_reserved("T"));
    }
}
