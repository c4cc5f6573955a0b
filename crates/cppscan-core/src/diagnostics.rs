//! Per-file diagnostics
//!
//! Nothing the engine finds while scanning is fatal: malformed input becomes a
//! [`Diagnostic`] and scanning carries on. Whether diagnostics fail a run is a
//! decision for the caller.

use facet::Facet;

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Facet)]
#[repr(u8)]
pub enum DiagnosticKind {
    /// Macro arguments did not split into exactly two non-empty identifiers
    MalformedDeclaration,
    /// A `@testmethods` token outside the whitelist
    InvalidEnumValue,
    /// A `@defect` token that is not a `PREFIX-#digits` ticket
    InvalidTicketReference,
    /// A recognized tag normalized to zero tokens
    EmptyTagValue,
    /// No balanced closing parenthesis before end of file
    UnbalancedParens,
    /// A `/*` comment with no closing `*/`
    UnterminatedComment,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::MalformedDeclaration => "MalformedDeclaration",
            DiagnosticKind::InvalidEnumValue => "InvalidEnumValue",
            DiagnosticKind::InvalidTicketReference => "InvalidTicketReference",
            DiagnosticKind::EmptyTagValue => "EmptyTagValue",
            DiagnosticKind::UnbalancedParens => "UnbalancedParens",
            DiagnosticKind::UnterminatedComment => "UnterminatedComment",
        }
    }
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A problem found while scanning one file
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Line number (1-indexed)
    pub line: usize,
    /// Human-readable description
    pub detail: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, line: usize, detail: impl Into<String>) -> Self {
        Self {
            kind,
            line,
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}: {}", self.line, self.kind, self.detail)
    }
}
