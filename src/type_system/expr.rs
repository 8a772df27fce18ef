//! Defines `TypeExpr`, the closed set of type shapes that slots declare and
//! that links are checked against, together with type variables and the
//! declaration contexts that own them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONTEXT: AtomicU64 = AtomicU64::new(1);

/// A unique, process-wide identifier for a `GenericDeclarationContext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextId(pub u64);

impl ContextId {
    fn next() -> Self {
        Self(NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline(always)]
    pub fn index(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context #{}", self.0)
    }
}

/// The owner of a group of co-declared type variables.
///
/// A module kind declares its variables against one context; each module
/// instance gets a fresh context derived from it (see `TypeVariableInstantiator`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenericDeclarationContext {
    id: ContextId,
    /// The declared context this one was instantiated from, if any.
    origin: Option<ContextId>,
}

impl GenericDeclarationContext {
    pub fn new() -> Self {
        Self { id: ContextId::next(), origin: None }
    }

    pub(crate) fn derived_from(origin: ContextId) -> Self {
        Self { id: ContextId::next(), origin: Some(origin) }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn origin(&self) -> Option<ContextId> {
        self.origin
    }

    /// Declares an unbounded variable owned by this context.
    pub fn variable(&self, name: impl Into<String>) -> TypeVariable {
        TypeVariable::new(name, self.id)
    }
}

impl Default for GenericDeclarationContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A named placeholder type scoped to a declaration context.
///
/// Identity is the pair `(name, context)`; bounds do not take part in
/// equality or hashing. A bound that refers back to a variable whose bounds
/// are being declared (`T extends Comparable<T>`) holds a bare reference to it,
/// so every value stays a finite tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeVariable {
    name: String,
    context: ContextId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    bounds: Vec<TypeExpr>,
}

impl TypeVariable {
    pub fn new(name: impl Into<String>, context: ContextId) -> Self {
        Self { name: name.into(), context, bounds: Vec::new() }
    }

    pub fn with_bounds(mut self, bounds: impl IntoIterator<Item = TypeExpr>) -> Self {
        self.bounds = bounds.into_iter().collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn bounds(&self) -> &[TypeExpr] {
        &self.bounds
    }

    pub fn is_unbounded(&self) -> bool {
        self.bounds.is_empty()
    }

    /// A bare reference with the same identity and no bounds.
    pub fn reference(&self) -> Self {
        Self::new(self.name.clone(), self.context)
    }

    pub(crate) fn key(&self) -> VariableKey {
        VariableKey { name: self.name.clone(), context: self.context }
    }
}

impl PartialEq for TypeVariable {
    fn eq(&self, other: &Self) -> bool {
        self.context == other.context && self.name == other.name
    }
}

impl Eq for TypeVariable {}

impl Hash for TypeVariable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.context.hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct VariableKey {
    pub(crate) name: String,
    pub(crate) context: ContextId,
}

/// The primary enum representing a type in slot declarations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeExpr {
    /// A plain named type, e.g. `String`.
    Concrete(String),
    /// A generic type applied to arguments, e.g. `List<T>`.
    Parameterized { base: String, args: Vec<TypeExpr> },
    /// A type argument with variance bounds, e.g. `? extends Number`.
    Wildcard { lower: Vec<TypeExpr>, upper: Vec<TypeExpr> },
    /// An array of the element type.
    Array(Box<TypeExpr>),
    Variable(TypeVariable),
}

impl TypeExpr {
    pub fn concrete(name: impl Into<String>) -> Self {
        TypeExpr::Concrete(name.into())
    }

    pub fn parameterized(base: impl Into<String>, args: impl IntoIterator<Item = TypeExpr>) -> Self {
        TypeExpr::Parameterized { base: base.into(), args: args.into_iter().collect() }
    }

    pub fn array_of(element: TypeExpr) -> Self {
        TypeExpr::Array(Box::new(element))
    }

    /// The unbounded wildcard `?`.
    pub fn wildcard() -> Self {
        TypeExpr::Wildcard { lower: Vec::new(), upper: Vec::new() }
    }

    /// `? extends upper`
    pub fn extends(upper: TypeExpr) -> Self {
        TypeExpr::Wildcard { lower: Vec::new(), upper: vec![upper] }
    }

    /// `? super lower`
    pub fn super_of(lower: TypeExpr) -> Self {
        TypeExpr::Wildcard { lower: vec![lower], upper: Vec::new() }
    }

    pub fn as_variable(&self) -> Option<&TypeVariable> {
        match self {
            TypeExpr::Variable(var) => Some(var),
            _ => None,
        }
    }

    /// Every variable occurrence in the expression, outermost first. Bounds of
    /// the variables themselves are not descended into.
    pub fn variables(&self) -> Vec<&TypeVariable> {
        let mut found = Vec::new();
        self.collect_variables(&mut found);
        found
    }

    fn collect_variables<'a>(&'a self, found: &mut Vec<&'a TypeVariable>) {
        match self {
            TypeExpr::Concrete(_) => {}
            TypeExpr::Parameterized { args, .. } => {
                for arg in args {
                    arg.collect_variables(found);
                }
            }
            TypeExpr::Wildcard { lower, upper } => {
                for bound in lower.iter().chain(upper) {
                    bound.collect_variables(found);
                }
            }
            TypeExpr::Array(element) => element.collect_variables(found),
            TypeExpr::Variable(var) => found.push(var),
        }
    }

    pub fn is_ground(&self) -> bool {
        self.variables().is_empty()
    }
}

impl From<TypeVariable> for TypeExpr {
    fn from(var: TypeVariable) -> Self {
        TypeExpr::Variable(var)
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[TypeExpr], separator: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Concrete(name) => f.write_str(name),
            TypeExpr::Parameterized { base, args } => {
                write!(f, "{}<", base)?;
                write_joined(f, args, ", ")?;
                f.write_str(">")
            }
            TypeExpr::Wildcard { lower, upper } => {
                f.write_str("?")?;
                if !upper.is_empty() {
                    f.write_str(" extends ")?;
                    write_joined(f, upper, " & ")?;
                }
                if !lower.is_empty() {
                    f.write_str(" super ")?;
                    write_joined(f, lower, " & ")?;
                }
                Ok(())
            }
            TypeExpr::Array(element) => write!(f, "{}[]", element),
            TypeExpr::Variable(var) => f.write_str(var.name()),
        }
    }
}
