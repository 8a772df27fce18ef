//! The runtime type model for module slots.
//!
//! Modules are discovered and instantiated at runtime, so slot types cannot
//! lean on Rust generics. Instead each slot carries a `TypeExpr`, links are
//! checked through a pluggable `TypeContext`, and every module instance gets
//! its own copy of the declared type variables via `TypeVariableInstantiator`.

// Publicly export the primary components for use by other modules.
pub use self::context::{FreeVariableContext, TypeContext, TypeHierarchy};
pub use self::error::TypeError;
pub use self::expr::{ContextId, GenericDeclarationContext, TypeExpr, TypeVariable};
pub use self::instantiator::TypeVariableInstantiator;
pub use self::parse::parse_type;

// --- MODULE DECLARATIONS ---
mod context;
mod error;
mod expr;
mod instantiator;
mod parse;
