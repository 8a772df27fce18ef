//! Whole-flow static checks, run before execution.
pub mod error;
pub mod validator;

pub use error::{LinkDiagnostic, LinkDiagnosticKind};
pub use validator::FlowValidator;
