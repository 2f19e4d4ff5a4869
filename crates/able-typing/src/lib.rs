//! Static type checker for Able modules.
//!
//! A [`TypeChecker`] runs four passes over a module: declaration collection, inference,
//! obligation solving and coherence validation. Results come back as plain
//! [`Diagnostic`](able_base::Diagnostic) values; the export surface of the last checked module
//! can seed the prelude of a dependent module's checker.

#![deny(clippy::unwrap_used)]

mod assignable;
mod builtins;
mod checker;
mod config;
mod env;
mod error;
mod numeric;
mod overload;
mod solver;
mod substitute;
mod types;

#[cfg(test)]
mod numeric_tests;
#[cfg(test)]
mod overload_tests;

pub use assignable::{literal_mismatch, type_assignable, types_equivalent};
pub use builtins::BuiltinRegistry;
pub use checker::TypeChecker;
pub use config::{CheckerConfig, TRACE_TIMING_ENV};
pub use env::{Environment, Scope};
pub use error::{CheckError, ConfigError};
pub use numeric::{PromotionError, promote_floats, promote_integers};
pub use overload::{
    ImplementationOracle, Instantiation, NoImplementations, OverloadCandidate, OverloadOutcome,
    resolve_overload, resolve_overload_with_type_args,
};
pub use types::{
    AliasType, ConstraintObligation, ExportedSymbol, FloatType, FunctionType, GenericParamSpec,
    ImplementationNamespace, ImplementationSpec, IntegerType, InterfaceInfo, InterfaceRef,
    MethodSetSpec, PackageType, PrimitiveKind, SELF_TYPE, StructInfo, Type, UnionType,
    WhereConstraint,
};
