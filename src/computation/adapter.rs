//! Wraps an externally described callable as a module kind.
//!
//! The callable's receiver (unless it is static) and parameters become the
//! module's inputs, in that order. Outputs follow `output_layout`: the
//! receiver, then the return value (unless the callable returns nothing),
//! then every non-primitive argument so in-place changes are visible
//! downstream. `module_info` and `process` both read the same layout.
use super::process::{BoxError, Computation, ProcessContext};
use crate::graph::{Module, ModuleInfo, SlotInfo, Value};
use crate::type_system::{TypeError, TypeExpr};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// One declared parameter of a callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeExpr,
    /// Primitive arguments are passed by value and never mapped back to an output.
    pub primitive: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self { name: name.into(), ty, primitive: false }
    }

    pub fn primitive(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self { name: name.into(), ty, primitive: true }
    }
}

#[derive(Error, Debug)]
pub enum InvocationError {
    #[error("'{callable}' needs a receiver but none was provided")]
    MissingReceiver { callable: String },

    #[error("'{callable}' is missing argument '{parameter}'")]
    MissingArgument { callable: String, parameter: String },

    #[error("'{callable}' expects {expected} arguments, got {actual}")]
    Arity {
        callable: String,
        expected: usize,
        actual: usize,
    },

    #[error("argument '{parameter}' has an unexpected runtime type '{found}'")]
    ArgumentType { parameter: String, found: &'static str },

    #[error("'{callable}' raised: {message}")]
    Raised { callable: String, message: String },
}

/// A callable with an introspectable signature.
pub trait Invocable: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// `None` for static callables.
    fn receiver_type(&self) -> Option<&TypeExpr> {
        None
    }

    fn parameters(&self) -> &[Parameter];

    /// `None` for callables that return nothing.
    fn return_type(&self) -> Option<&TypeExpr>;

    /// Calls the callable. It may replace entries of `args` to report
    /// in-place changes.
    fn invoke(&self, receiver: Option<&Value>, args: &mut [Value]) -> Result<Option<Value>, InvocationError>;
}

/// What an adapter output slot carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputRole {
    Receiver,
    ReturnValue,
    Argument(usize),
}

pub fn output_layout(callable: &dyn Invocable) -> Vec<OutputRole> {
    let mut layout = Vec::new();
    if callable.receiver_type().is_some() {
        layout.push(OutputRole::Receiver);
    }
    if callable.return_type().is_some() {
        layout.push(OutputRole::ReturnValue);
    }
    layout.extend(
        callable
            .parameters()
            .iter()
            .enumerate()
            .filter(|(_, parameter)| !parameter.primitive)
            .map(|(index, _)| OutputRole::Argument(index)),
    );
    layout
}

type CallFn = dyn Fn(Option<&Value>, &mut [Value]) -> Result<Option<Value>, InvocationError> + Send + Sync;

/// An `Invocable` backed by a closure and an explicit signature.
pub struct FunctionCallable {
    name: String,
    description: String,
    receiver: Option<TypeExpr>,
    parameters: Vec<Parameter>,
    returns: Option<TypeExpr>,
    call: Box<CallFn>,
}

impl FunctionCallable {
    pub fn new<F>(name: impl Into<String>, call: F) -> Self
    where
        F: Fn(Option<&Value>, &mut [Value]) -> Result<Option<Value>, InvocationError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: String::new(),
            receiver: None,
            parameters: Vec::new(),
            returns: None,
            call: Box::new(call),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn receiver(mut self, ty: TypeExpr) -> Self {
        self.receiver = Some(ty);
        self
    }

    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn returns(mut self, ty: TypeExpr) -> Self {
        self.returns = Some(ty);
        self
    }
}

impl Invocable for FunctionCallable {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn receiver_type(&self) -> Option<&TypeExpr> {
        self.receiver.as_ref()
    }

    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn return_type(&self) -> Option<&TypeExpr> {
        self.returns.as_ref()
    }

    fn invoke(&self, receiver: Option<&Value>, args: &mut [Value]) -> Result<Option<Value>, InvocationError> {
        if args.len() != self.parameters.len() {
            return Err(InvocationError::Arity {
                callable: self.name.clone(),
                expected: self.parameters.len(),
                actual: args.len(),
            });
        }
        (self.call)(receiver, args)
    }
}

impl fmt::Debug for FunctionCallable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionCallable")
            .field("name", &self.name)
            .field("receiver", &self.receiver)
            .field("parameters", &self.parameters)
            .field("returns", &self.returns)
            .finish()
    }
}

/// Runs an `Invocable` as a module computation.
#[derive(Clone)]
pub struct AdapterComputation {
    callable: Arc<dyn Invocable>,
    layout: Vec<OutputRole>,
}

impl AdapterComputation {
    pub fn new(callable: Arc<dyn Invocable>) -> Self {
        let layout = output_layout(callable.as_ref());
        Self { callable, layout }
    }

    pub fn callable(&self) -> &Arc<dyn Invocable> {
        &self.callable
    }

    pub fn layout(&self) -> &[OutputRole] {
        &self.layout
    }

    pub fn module_info(&self) -> ModuleInfo {
        let callable = self.callable.as_ref();
        let mut info = ModuleInfo::new(callable.name()).with_description(callable.description());
        if let Some(receiver) = callable.receiver_type() {
            info = info.input(SlotInfo::new(receiver.clone(), "this"));
        }
        for parameter in callable.parameters() {
            info = info.input(SlotInfo::new(parameter.ty.clone(), parameter.name.clone()));
        }
        for role in &self.layout {
            let slot = match *role {
                OutputRole::Receiver => callable.receiver_type().map(|ty| SlotInfo::new(ty.clone(), "this")),
                OutputRole::ReturnValue => callable.return_type().map(|ty| SlotInfo::new(ty.clone(), "result")),
                OutputRole::Argument(index) => callable
                    .parameters()
                    .get(index)
                    .map(|parameter| SlotInfo::new(parameter.ty.clone(), parameter.name.clone())),
            };
            if let Some(slot) = slot {
                info = info.output(slot);
            }
        }
        info
    }

    pub fn into_module(self) -> Result<Arc<Module>, TypeError> {
        let info = Arc::new(self.module_info());
        Module::new(info, Arc::new(self))
    }
}

impl Computation for AdapterComputation {
    fn process(
        &self,
        _cx: &ProcessContext<'_>,
        inputs: &[Option<Value>],
        outputs: &mut [Option<Value>],
    ) -> Result<(), BoxError> {
        let callable = self.callable.as_ref();
        let (receiver, arguments) = if callable.receiver_type().is_some() {
            let receiver = inputs.first().cloned().flatten().ok_or_else(|| InvocationError::MissingReceiver {
                callable: callable.name().to_string(),
            })?;
            (Some(receiver), inputs.get(1..).unwrap_or_default())
        } else {
            (None, inputs)
        };

        let mut args = callable
            .parameters()
            .iter()
            .enumerate()
            .map(|(index, parameter)| {
                arguments.get(index).cloned().flatten().ok_or_else(|| InvocationError::MissingArgument {
                    callable: callable.name().to_string(),
                    parameter: parameter.name.clone(),
                })
            })
            .collect::<Result<Vec<Value>, _>>()?;

        let returned = callable.invoke(receiver.as_ref(), &mut args)?;

        for (out, role) in outputs.iter_mut().zip(&self.layout) {
            *out = match *role {
                OutputRole::Receiver => receiver.clone(),
                OutputRole::ReturnValue => returned.clone(),
                OutputRole::Argument(index) => args.get(index).cloned(),
            };
        }
        Ok(())
    }
}

impl fmt::Debug for AdapterComputation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterComputation")
            .field("callable", &self.callable.name())
            .field("layout", &self.layout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computation::builtin::Constant;
    use crate::graph::{Flow, Link};
    use pretty_assertions::assert_eq;

    fn string() -> TypeExpr {
        TypeExpr::concrete("String")
    }

    /// `StringBuilder.append(String, int) -> int`, where the builder and the
    /// string are non-primitive.
    fn append() -> FunctionCallable {
        FunctionCallable::new("append", |receiver, args| {
            let base = receiver.and_then(|value| value.downcast_ref::<String>()).cloned().unwrap_or_default();
            let suffix = args[0].downcast_ref::<String>().cloned().unwrap_or_default();
            let count = *args[1].downcast_ref::<i32>().unwrap_or(&1);
            args[0] = Value::new(suffix.repeat(count as usize));
            Ok(Some(Value::new(format!("{base}{}", suffix.repeat(count as usize)))))
        })
        .receiver(TypeExpr::concrete("StringBuilder"))
        .parameter(Parameter::new("suffix", string()))
        .parameter(Parameter::primitive("count", TypeExpr::concrete("int")))
        .returns(string())
    }

    #[test]
    fn test_layout_order() {
        let adapter = AdapterComputation::new(Arc::new(append()));
        assert_eq!(
            adapter.layout(),
            &[OutputRole::Receiver, OutputRole::ReturnValue, OutputRole::Argument(0)]
        );
        let info = adapter.module_info();
        let inputs: Vec<_> = info.inputs.iter().map(|slot| slot.name.as_str()).collect();
        let outputs: Vec<_> = info.outputs.iter().map(|slot| slot.name.as_str()).collect();
        assert_eq!(inputs, vec!["this", "suffix", "count"]);
        assert_eq!(outputs, vec!["this", "result", "suffix"]);
    }

    #[test]
    fn test_static_void_callable_exposes_only_mutable_arguments() {
        let callable = FunctionCallable::new("log", |_, _| Ok(None))
            .parameter(Parameter::primitive("level", TypeExpr::concrete("int")))
            .parameter(Parameter::new("buffer", string()));
        let adapter = AdapterComputation::new(Arc::new(callable));
        assert_eq!(adapter.layout(), &[OutputRole::Argument(1)]);
    }

    #[test]
    fn test_execution_remaps_outputs() {
        let mut flow = Flow::new();
        let builder = Constant::with_value(TypeExpr::concrete("StringBuilder"), Value::new("ab".to_string())).unwrap();
        let suffix = Constant::with_value(string(), Value::new("c".to_string())).unwrap();
        let count = Constant::with_value(TypeExpr::concrete("int"), Value::new(2_i32)).unwrap();
        let adapter = AdapterComputation::new(Arc::new(append())).into_module().unwrap();
        for module in [&builder, &suffix, &count, &adapter] {
            flow.add_module(module.clone()).unwrap();
        }
        for (index, source) in [&builder, &suffix, &count].into_iter().enumerate() {
            flow.add_link(Link::connect(source, 0, &adapter, index).unwrap()).unwrap();
            source.execute().unwrap();
        }

        adapter.execute().unwrap();

        let text = |index: usize| adapter.last_output(index).and_then(|v| v.downcast_ref::<String>().cloned());
        assert_eq!(text(0).as_deref(), Some("ab"));
        assert_eq!(text(1).as_deref(), Some("abcc"));
        assert_eq!(text(2).as_deref(), Some("cc"));
    }

    #[test]
    fn test_missing_argument_fails_execution() {
        let adapter = AdapterComputation::new(Arc::new(append())).into_module().unwrap();
        let err = adapter.execute().unwrap_err();
        assert!(err.to_string().contains("receiver"), "{err}");
    }
}
