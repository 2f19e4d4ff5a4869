//! Program tree handed to the checker by the parser.
//!
//! Every node carries a [`NodeId`](able_base::NodeId) that stays stable for a checking run, so
//! diagnostics and inference side tables can refer back to it.

mod ast;
pub mod build;
mod numeric;

pub use ast::*;
pub use numeric::{FloatKind, IntegerKind};
