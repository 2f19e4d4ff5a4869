use std::fmt;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::NodeId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosticNote {
    pub message: String,
    pub node: Option<NodeId>,
}

/// A checker finding attached to the offending node.
///
/// Diagnostics are plain data: producing one never aborts the run. Callers map `node` back to a
/// source span with whatever location table their parser keeps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub message: String,
    pub node: NodeId,
    pub notes: Vec<DiagnosticNote>,
}

impl Diagnostic {
    pub fn error(node: NodeId, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            message: message.into(),
            node,
            notes: Vec::new(),
        }
    }

    pub fn warning(node: NodeId, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            message: message.into(),
            node,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, message: impl Into<String>, node: Option<NodeId>) -> Self {
        self.notes.push(DiagnosticNote {
            message: message.into(),
            node,
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Error => write!(f, "error"),
            DiagnosticSeverity::Warning => write!(f, "warning"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

pub fn diagnostics_have_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics
        .iter()
        .any(|diag| diag.severity == DiagnosticSeverity::Error)
}

/// Renders diagnostics one per line, notes indented underneath. Location rendering is left to
/// callers that own a span table.
pub fn render_plain(diagnostics: &[Diagnostic]) -> String {
    let mut output = String::new();
    for diagnostic in diagnostics {
        let _ = writeln!(output, "{} [{}]", diagnostic, diagnostic.node);
        for note in &diagnostic.notes {
            let _ = writeln!(output, "  note: {}", note.message);
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_serializes_lowercase() {
        let diag = Diagnostic::warning(NodeId::from_raw(7), "rescue has no handler clauses");
        let json = serde_json::to_string(&diag).expect("serialize diagnostic");
        assert!(json.contains("\"severity\":\"warning\""), "{json}");
    }

    #[test]
    fn render_plain_lists_notes() {
        let diag = Diagnostic::error(NodeId::from_raw(3), "duplicate declaration 'x'")
            .with_note("previous declaration at main.able", Some(NodeId::from_raw(1)));
        assert_eq!(
            render_plain(&[diag]),
            "error: duplicate declaration 'x' [#3]\n  note: previous declaration at main.able\n"
        );
        assert!(!diagnostics_have_errors(&[Diagnostic::warning(
            NodeId::DUMMY,
            "w"
        )]));
    }
}
