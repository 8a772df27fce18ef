//! Pluggable assignability between type expressions.
use super::expr::TypeExpr;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

/// Answers whether a value of one type may flow into a slot of another.
///
/// Implementations must be pure and deterministic: the relation is queried on
/// every link validity check and every compatibility search.
pub trait TypeContext: Send + Sync {
    /// Is `to` assignable from `from`?
    fn is_assignable(&self, to: &TypeExpr, from: &TypeExpr) -> bool;

    fn resolve_type(&self, ty: &TypeExpr) -> TypeExpr {
        ty.clone()
    }
}

impl fmt::Debug for dyn TypeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn TypeContext")
    }
}

/// A nominal subtype table for concrete type names.
///
/// Subtyping is reflexive and transitive. If a top type is set, every type
/// (including arrays and parameterized types) is a subtype of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeHierarchy {
    supertypes: HashMap<String, Vec<String>>,
    top: Option<String>,
}

impl TypeHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_top(mut self, name: impl Into<String>) -> Self {
        self.top = Some(name.into());
        self
    }

    /// Declares `sub` as a direct subtype of `sup`.
    pub fn declare(&mut self, sub: impl Into<String>, sup: impl Into<String>) -> &mut Self {
        let sup = sup.into();
        let entry = self.supertypes.entry(sub.into()).or_default();
        if !entry.contains(&sup) {
            entry.push(sup);
        }
        self
    }

    /// Builder form of `declare`.
    pub fn subtype(mut self, sub: impl Into<String>, sup: impl Into<String>) -> Self {
        self.declare(sub, sup);
        self
    }

    pub fn top(&self) -> Option<&str> {
        self.top.as_deref()
    }

    pub fn is_top(&self, name: &str) -> bool {
        self.top.as_deref() == Some(name)
    }

    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        if sub == sup || self.is_top(sup) {
            return true;
        }
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([sub]);
        while let Some(name) = queue.pop_front() {
            if !visited.insert(name) {
                continue;
            }
            for parent in self.supertypes.get(name).into_iter().flatten() {
                if parent == sup {
                    return true;
                }
                queue.push_back(parent.as_str());
            }
        }
        false
    }
}

/// The default context: unbounded type variables are assignable to and from
/// anything, while concrete, parameterized and array types are matched
/// structurally (type arguments are invariant unless a wildcard says otherwise).
#[derive(Debug, Clone, Default)]
pub struct FreeVariableContext {
    hierarchy: TypeHierarchy,
}

impl FreeVariableContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hierarchy(hierarchy: TypeHierarchy) -> Self {
        Self { hierarchy }
    }

    pub fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }

    fn is_top(&self, ty: &TypeExpr) -> bool {
        matches!(ty, TypeExpr::Concrete(name) if self.hierarchy.is_top(name))
    }

    fn assignable(&self, to: &TypeExpr, from: &TypeExpr) -> bool {
        use TypeExpr::*;
        match (to, from) {
            (Variable(a), Variable(b)) if a == b => true,
            (Variable(var), _) => var.bounds().iter().all(|bound| self.assignable(bound, from)),
            (_, Variable(var)) => {
                var.is_unbounded() || var.bounds().iter().any(|bound| self.assignable(to, bound))
            }
            (Wildcard { lower, upper }, _) => self.within_bounds(lower, upper, from),
            // A captured wildcard is known only through its upper bounds.
            (_, Wildcard { upper, .. }) => {
                if upper.is_empty() {
                    self.is_top(to)
                } else {
                    upper.iter().any(|bound| self.assignable(to, bound))
                }
            }
            (Concrete(a), Concrete(b)) => self.hierarchy.is_subtype(b, a),
            (Concrete(a), Parameterized { base, .. }) => self.hierarchy.is_subtype(base, a),
            (Concrete(a), Array(_)) => self.hierarchy.is_top(a),
            // Raw source into a parameterized target of the same base.
            (Parameterized { base, .. }, Concrete(b)) => self.hierarchy.is_subtype(b, base),
            (
                Parameterized { base: to_base, args: to_args },
                Parameterized { base: from_base, args: from_args },
            ) => {
                to_args.len() == from_args.len()
                    && self.hierarchy.is_subtype(from_base, to_base)
                    && to_args.iter().zip(from_args).all(|(t, f)| self.contains(t, f))
            }
            (Array(to_element), Array(from_element)) => self.assignable(to_element, from_element),
            _ => false,
        }
    }

    fn within_bounds(&self, lower: &[TypeExpr], upper: &[TypeExpr], ty: &TypeExpr) -> bool {
        upper.iter().all(|bound| self.assignable(bound, ty))
            && lower.iter().all(|bound| self.assignable(ty, bound))
    }

    /// Type-argument containment: does the argument `to` admit the argument `from`?
    fn contains(&self, to: &TypeExpr, from: &TypeExpr) -> bool {
        use TypeExpr::*;
        match (to, from) {
            (Wildcard { lower: to_lower, upper: to_upper }, Wildcard { lower: from_lower, upper: from_upper }) => {
                let upper_ok = to_upper.iter().all(|t| {
                    if from_upper.is_empty() {
                        self.is_top(t)
                    } else {
                        from_upper.iter().any(|f| self.assignable(t, f))
                    }
                });
                let lower_ok = to_lower
                    .iter()
                    .all(|t| from_lower.iter().any(|f| self.assignable(f, t)));
                upper_ok && lower_ok
            }
            (Wildcard { lower, upper }, _) => self.within_bounds(lower, upper, from),
            (Variable(_), _) | (_, Variable(_)) => self.assignable(to, from),
            // Only a wildcard argument can contain a captured wildcard.
            (_, Wildcard { .. }) => false,
            _ => self.assignable(to, from) && self.assignable(from, to),
        }
    }
}

impl TypeContext for FreeVariableContext {
    fn is_assignable(&self, to: &TypeExpr, from: &TypeExpr) -> bool {
        let to = self.resolve_type(to);
        let from = self.resolve_type(from);
        self.assignable(&to, &from)
    }
}
