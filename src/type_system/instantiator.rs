//! Per-module-instance instantiation of declared type variables.
//!
//! Every module instance builds its slot types through its own
//! `TypeVariableInstantiator`. The protocol has two phases:
//!
//! 1. `register` every slot type of the instance. The first time a variable
//!    is seen it gets a fresh variable in a fresh declaration context derived
//!    from the variable's declared context.
//! 2. `instantiate` each slot type, replacing every variable by its fresh
//!    counterpart.
//!
//! Registering all slot types before instantiating any of them is what makes
//! a `T` shared between an input and an output resolve to one fresh variable,
//! while two instances of the same module kind never share a variable.

use super::error::TypeError;
use super::expr::{ContextId, GenericDeclarationContext, TypeExpr, TypeVariable, VariableKey};
use std::collections::HashMap;

#[derive(Debug, Clone)]
enum Registration {
    /// The fresh variable exists but its bounds are still being instantiated.
    /// References met while in this state resolve to the bare placeholder,
    /// which is what keeps F-bounded declarations finite.
    Pending(TypeVariable),
    Done(TypeVariable),
}

impl Registration {
    fn variable(&self) -> &TypeVariable {
        match self {
            Registration::Pending(var) | Registration::Done(var) => var,
        }
    }
}

#[derive(Debug, Default)]
pub struct TypeVariableInstantiator {
    /// Fresh contexts in allocation order.
    arena: Vec<GenericDeclarationContext>,
    /// Declared context id -> index into `arena`.
    derived: HashMap<ContextId, usize>,
    variables: HashMap<VariableKey, Registration>,
}

impl TypeVariableInstantiator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fresh contexts allocated so far, oldest first.
    pub fn contexts(&self) -> &[GenericDeclarationContext] {
        &self.arena
    }

    /// The fresh variable registered for `original`, if any.
    pub fn fresh_variable(&self, original: &TypeVariable) -> Option<&TypeVariable> {
        self.variables.get(&original.key()).map(Registration::variable)
    }

    pub fn register(&mut self, ty: &TypeExpr) -> Result<(), TypeError> {
        match ty {
            TypeExpr::Concrete(_) => Ok(()),
            TypeExpr::Parameterized { args, .. } => {
                for arg in args {
                    self.register(arg)?;
                }
                Ok(())
            }
            TypeExpr::Wildcard { lower, upper } => {
                for bound in lower.iter().chain(upper) {
                    self.register(bound)?;
                }
                Ok(())
            }
            TypeExpr::Array(element) => self.register(element),
            TypeExpr::Variable(var) => self.register_variable(var),
        }
    }

    fn register_variable(&mut self, original: &TypeVariable) -> Result<(), TypeError> {
        let key = original.key();
        let placeholder = match self.variables.get(&key) {
            None => {
                let context = self.context_for(original.context());
                TypeVariable::new(format!("{}_{}", original.name(), context.id().index()), context.id())
            }
            // A bare reference was registered first; the bounds arrive with
            // this occurrence and complete the same fresh variable.
            Some(Registration::Done(var)) if var.is_unbounded() && !original.is_unbounded() => var.reference(),
            Some(_) => return Ok(()),
        };
        // The placeholder goes in before the bounds are walked so that a bound
        // mentioning this variable (directly or through another variable)
        // stops here instead of recursing forever.
        self.variables.insert(key.clone(), Registration::Pending(placeholder.clone()));

        for bound in original.bounds() {
            self.register(bound)?;
        }
        let bounds = original
            .bounds()
            .iter()
            .map(|bound| self.instantiate(bound))
            .collect::<Result<Vec<_>, _>>()?;

        self.variables.insert(key, Registration::Done(placeholder.with_bounds(bounds)));
        Ok(())
    }

    fn context_for(&mut self, declared: ContextId) -> GenericDeclarationContext {
        if let Some(&index) = self.derived.get(&declared) {
            return self.arena[index];
        }
        let context = GenericDeclarationContext::derived_from(declared);
        self.derived.insert(declared, self.arena.len());
        self.arena.push(context);
        context
    }

    /// Rebuilds `ty` with every variable replaced by its registered fresh variable.
    pub fn instantiate(&self, ty: &TypeExpr) -> Result<TypeExpr, TypeError> {
        Ok(match ty {
            TypeExpr::Concrete(name) => TypeExpr::Concrete(name.clone()),
            TypeExpr::Parameterized { base, args } => TypeExpr::Parameterized {
                base: base.clone(),
                args: self.instantiate_all(args)?,
            },
            TypeExpr::Wildcard { lower, upper } => TypeExpr::Wildcard {
                lower: self.instantiate_all(lower)?,
                upper: self.instantiate_all(upper)?,
            },
            TypeExpr::Array(element) => TypeExpr::array_of(self.instantiate(element)?),
            TypeExpr::Variable(var) => match self.variables.get(&var.key()) {
                Some(registration) => TypeExpr::Variable(registration.variable().clone()),
                None => {
                    return Err(TypeError::UnregisteredTypeVariable {
                        name: var.name().to_string(),
                        context: var.context(),
                    })
                }
            },
        })
    }

    fn instantiate_all(&self, types: &[TypeExpr]) -> Result<Vec<TypeExpr>, TypeError> {
        types.iter().map(|ty| self.instantiate(ty)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn list_of(ty: TypeExpr) -> TypeExpr {
        TypeExpr::parameterized("List", [ty])
    }

    fn fresh(instantiator: &mut TypeVariableInstantiator, ty: &TypeExpr) -> TypeExpr {
        instantiator.register(ty).unwrap();
        instantiator.instantiate(ty).unwrap()
    }

    #[test]
    fn test_ground_types_are_unchanged() {
        let mut inst = TypeVariableInstantiator::new();
        let ty = TypeExpr::parameterized("Map", [TypeExpr::concrete("String"), TypeExpr::array_of(TypeExpr::concrete("int"))]);
        assert_eq!(fresh(&mut inst, &ty), ty);
        assert!(inst.contexts().is_empty());
    }

    #[test]
    fn test_shared_variable_resolves_to_one_fresh_variable() {
        let t = GenericDeclarationContext::new().variable("T");
        let input = list_of(t.clone().into());
        let output = TypeExpr::from(t.clone());

        let mut inst = TypeVariableInstantiator::new();
        inst.register(&input).unwrap();
        inst.register(&output).unwrap();
        let input = inst.instantiate(&input).unwrap();
        let output = inst.instantiate(&output).unwrap();

        let TypeExpr::Parameterized { args, .. } = &input else { panic!("expected List<T>") };
        assert_eq!(args[0], output);
        assert_ne!(output, TypeExpr::from(t));
    }

    #[test]
    fn test_instances_never_share_variables() {
        let t: TypeExpr = GenericDeclarationContext::new().variable("T").into();
        let a = fresh(&mut TypeVariableInstantiator::new(), &t);
        let b = fresh(&mut TypeVariableInstantiator::new(), &t);
        assert_ne!(a, b);
        let (a, b) = (a.as_variable().unwrap(), b.as_variable().unwrap());
        assert_ne!(a.context(), b.context());
    }

    #[test]
    fn test_fresh_contexts_follow_declared_contexts() {
        let first = GenericDeclarationContext::new();
        let second = GenericDeclarationContext::new();
        let ty = TypeExpr::parameterized(
            "Triple",
            [first.variable("A").into(), first.variable("B").into(), second.variable("C").into()],
        );
        let mut inst = TypeVariableInstantiator::new();
        let out = fresh(&mut inst, &ty);
        let contexts: Vec<ContextId> = out.variables().iter().map(|var| var.context()).collect();
        assert_eq!(contexts[0], contexts[1]);
        assert_ne!(contexts[0], contexts[2]);
        assert_eq!(inst.contexts().len(), 2);
        assert_eq!(inst.contexts()[0].origin(), Some(first.id()));
        assert_eq!(inst.contexts()[1].origin(), Some(second.id()));
    }

    #[test]
    fn test_fresh_name_carries_context_id() {
        let t = GenericDeclarationContext::new().variable("T");
        let mut inst = TypeVariableInstantiator::new();
        let out = fresh(&mut inst, &t.clone().into());
        let var = out.as_variable().unwrap();
        assert_eq!(var.name(), format!("T_{}", var.context().index()));
        assert_eq!(inst.fresh_variable(&t), Some(var));
    }

    #[test]
    fn test_unregistered_variable_fails() {
        let t = GenericDeclarationContext::new().variable("T");
        let err = TypeVariableInstantiator::new().instantiate(&list_of(t.into())).unwrap_err();
        assert!(matches!(err, TypeError::UnregisteredTypeVariable { ref name, .. } if name == "T"));
    }

    #[test]
    fn test_self_referential_bound() {
        // T extends Comparable<T>
        let t = GenericDeclarationContext::new().variable("T");
        let t = t.clone().with_bounds([TypeExpr::parameterized("Comparable", [t.into()])]);

        let mut inst = TypeVariableInstantiator::new();
        let out = fresh(&mut inst, &t.into());
        let fresh_t = out.as_variable().unwrap();
        let [TypeExpr::Parameterized { base, args }] = fresh_t.bounds() else {
            panic!("expected a single Comparable bound")
        };
        assert_eq!(base, "Comparable");
        assert_eq!(args[0].as_variable(), Some(fresh_t));
    }

    #[test]
    fn test_mutually_referential_bounds() {
        // T extends Node<U>, U extends Edge<T>
        let ctx = GenericDeclarationContext::new();
        let (t_ref, u_ref) = (ctx.variable("T"), ctx.variable("U"));
        let u = u_ref.clone().with_bounds([TypeExpr::parameterized("Edge", [t_ref.clone().into()])]);
        let t = t_ref.with_bounds([TypeExpr::parameterized("Node", [u.clone().into()])]);

        let mut inst = TypeVariableInstantiator::new();
        let ty = TypeExpr::parameterized("Graph", [t.into(), u_ref.into()]);
        let out = fresh(&mut inst, &ty);
        let vars = out.variables();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars[0].context(), vars[1].context());
        // U was completed while registering T's bound, so both occurrences agree.
        assert_eq!(vars[1].bounds().len(), 1);
        let nested_u = vars[0].bounds()[0].variables()[0];
        assert_eq!(nested_u, vars[1]);
    }

    #[test]
    fn test_bounds_survive_a_bare_first_occurrence() {
        let t = GenericDeclarationContext::new().variable("T");
        let bounded = t.clone().with_bounds([TypeExpr::concrete("Number")]);
        let input = list_of(t.reference().into());
        let output = TypeExpr::from(bounded);

        let mut inst = TypeVariableInstantiator::new();
        inst.register(&input).unwrap();
        inst.register(&output).unwrap();
        let input = inst.instantiate(&input).unwrap();
        let output = inst.instantiate(&output).unwrap();

        let fresh_t = output.as_variable().unwrap();
        assert_eq!(fresh_t.bounds(), &[TypeExpr::concrete("Number")]);
        assert_eq!(input.variables()[0].bounds(), fresh_t.bounds());
        assert_eq!(inst.contexts().len(), 1);
    }
}
