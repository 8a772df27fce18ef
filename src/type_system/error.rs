//! Defines the error types for the type system module.
use super::expr::ContextId;
use thiserror::Error;

/// Failures raised while building, parsing or instantiating type expressions.
///
/// These are integration errors: a module whose slot types cannot be
/// instantiated cannot be constructed at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// `instantiate` reached a variable that was never passed through `register`.
    #[error("type variable '{name}' of {context} was never registered with this instantiator")]
    UnregisteredTypeVariable { name: String, context: ContextId },

    /// The input describes a type form the expression model has no variant for.
    #[error("unsupported type expression: '{expression}'")]
    UnsupportedTypeExpression { expression: String },

    /// The textual form of a type expression could not be parsed.
    #[error("malformed type expression '{input}' at offset {offset}: {message}")]
    Malformed {
        input: String,
        offset: usize,
        message: String,
    },
}
