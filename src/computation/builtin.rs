//! Module kinds that need no external callable.
use super::process::{BoxError, Computation, ProcessContext};
use crate::graph::{Module, ModuleInfo, SlotInfo, Value};
use crate::type_system::{GenericDeclarationContext, TypeError, TypeExpr};
use std::sync::Arc;

/// A source with no inputs whose single output is its configuration.
#[derive(Debug, Default, Clone, Copy)]
pub struct Constant;

impl Constant {
    pub fn module_info(ty: TypeExpr) -> ModuleInfo {
        ModuleInfo::new("Constant")
            .with_description("Emits its configured value")
            .output(SlotInfo::new(ty, "value"))
    }

    pub fn module(ty: TypeExpr) -> Result<Arc<Module>, TypeError> {
        Module::new(Arc::new(Self::module_info(ty)), Arc::new(Constant))
    }

    /// A constant module already configured with `value`.
    pub fn with_value(ty: TypeExpr, value: Value) -> Result<Arc<Module>, TypeError> {
        let module = Self::module(ty)?;
        module.store_configuration(Some(value));
        Ok(module)
    }
}

impl Computation for Constant {
    fn process(
        &self,
        cx: &ProcessContext<'_>,
        _inputs: &[Option<Value>],
        outputs: &mut [Option<Value>],
    ) -> Result<(), BoxError> {
        if let Some(out) = outputs.first_mut() {
            *out = cx.configuration();
        }
        Ok(())
    }

    fn accepts_configuration(&self) -> bool {
        true
    }
}

/// Passes its single input through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct Identity;

impl Identity {
    /// `T -> T`, with `T` declared in a context of its own.
    pub fn module_info() -> ModuleInfo {
        let t: TypeExpr = GenericDeclarationContext::new().variable("T").into();
        Self::typed_info(t)
    }

    /// A pass-through fixed to one type.
    pub fn typed_info(ty: TypeExpr) -> ModuleInfo {
        ModuleInfo::new("Identity")
            .with_description("Forwards its input unchanged")
            .input(SlotInfo::new(ty.clone(), "in"))
            .output(SlotInfo::new(ty, "out"))
    }

    pub fn module() -> Result<Arc<Module>, TypeError> {
        Module::new(Arc::new(Self::module_info()), Arc::new(Identity))
    }

    pub fn typed(ty: TypeExpr) -> Result<Arc<Module>, TypeError> {
        Module::new(Arc::new(Self::typed_info(ty)), Arc::new(Identity))
    }
}

impl Computation for Identity {
    fn process(
        &self,
        _cx: &ProcessContext<'_>,
        inputs: &[Option<Value>],
        outputs: &mut [Option<Value>],
    ) -> Result<(), BoxError> {
        for (out, input) in outputs.iter_mut().zip(inputs) {
            *out = input.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Slot;

    #[test]
    fn test_constant_emits_configuration() {
        let module = Constant::with_value(TypeExpr::concrete("Integer"), Value::new(42_i64)).unwrap();
        assert!(module.inputs().is_empty());
        module.execute().unwrap();
        assert_eq!(module.last_output(0).unwrap().downcast_ref::<i64>(), Some(&42));
    }

    #[test]
    fn test_unconfigured_constant_emits_nothing() {
        let module = Constant::module(TypeExpr::concrete("Integer")).unwrap();
        module.execute().unwrap();
        assert!(module.last_output(0).is_none());
    }

    #[test]
    fn test_identity_instances_get_distinct_variables() {
        let a = Identity::module().unwrap();
        let b = Identity::module().unwrap();
        assert_eq!(a.inputs()[0].expected_type(), a.outputs()[0].expected_type());
        assert_ne!(a.inputs()[0].expected_type(), b.inputs()[0].expected_type());
    }
}
