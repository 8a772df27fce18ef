//! Defines the diagnostics reported by flow validation.
use crate::graph::LinkId;

/// The category of a link diagnostic.
///
// Kept separate from the message so callers can branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkDiagnosticKind {
    /// The source's actual type is not assignable to the target's expected type.
    TypeMismatch,
    /// One of the link's modules is gone or no longer part of the flow.
    DanglingEndpoint,
}

/// One problem found on one link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDiagnostic {
    pub link: LinkId,
    pub kind: LinkDiagnosticKind,
    pub message: String,
}
