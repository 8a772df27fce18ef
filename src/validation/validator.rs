//! Checks every link of a flow against a type context.
use super::error::{LinkDiagnostic, LinkDiagnosticKind};
use crate::graph::{Flow, Link};
use crate::type_system::TypeContext;

/// Collects link diagnostics for a whole flow.
///
/// The flow attaches links regardless of their types (unless configured to
/// validate on insertion), so a flow being edited can be temporarily invalid.
/// Run this before executing it.
pub struct FlowValidator<'a> {
    flow: &'a Flow,
    context: &'a dyn TypeContext,
}

impl<'a> FlowValidator<'a> {
    /// Validates against the flow's own type context.
    pub fn new(flow: &'a Flow) -> Self {
        Self { flow, context: flow.type_context() }
    }

    pub fn with_context(flow: &'a Flow, context: &'a dyn TypeContext) -> Self {
        Self { flow, context }
    }

    /// `Ok(())` if every link is valid, otherwise every diagnostic found.
    pub fn validate(&self) -> Result<(), Vec<LinkDiagnostic>> {
        let errors: Vec<LinkDiagnostic> = self.flow.links().iter().filter_map(|link| self.check(link)).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn check(&self, link: &Link) -> Option<LinkDiagnostic> {
        let endpoints = [link.source_module(), link.target_module()];
        if endpoints.iter().any(|module| !module.as_ref().is_some_and(|m| self.flow.contains_module(m))) {
            return Some(LinkDiagnostic {
                link: link.id(),
                kind: LinkDiagnosticKind::DanglingEndpoint,
                message: format!("Link {} has an endpoint outside the flow", link.id()),
            });
        }
        let (expected, actual) = (link.target_type()?, link.source_type()?);
        if self.context.is_assignable(&expected, &actual) {
            return None;
        }
        Some(LinkDiagnostic {
            link: link.id(),
            kind: LinkDiagnosticKind::TypeMismatch,
            message: format!("Type Error: link {} carries '{actual}' into a slot expecting '{expected}'", link.id()),
        })
    }
}
