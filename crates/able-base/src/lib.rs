mod diagnostics;
mod node;

pub use diagnostics::{
    Diagnostic, DiagnosticNote, DiagnosticSeverity, diagnostics_have_errors, render_plain,
};
pub use node::NodeId;
