use crate::computation::{AdapterComputation, Constant, FlowExecutor, Invocable, InvocationError, Parameter};
use crate::config::FlowOptions;
use crate::graph::{Flow, Link, Module, Value};
use crate::type_system::{parse_type, TypeExpr};
use crate::validation::FlowValidator;
use pyo3::exceptions::{PyIndexError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyTuple;
use std::sync::Arc;

fn parse(text: &str) -> PyResult<TypeExpr> {
    parse_type(text, &[]).map_err(|e| PyValueError::new_err(e.to_string()))
}

/// A Python callable with a declared signature. Arguments and results cross
/// the boundary as Python objects stored in `Value`s.
struct PyCallable {
    name: String,
    parameters: Vec<Parameter>,
    returns: Option<TypeExpr>,
    func: Py<PyAny>,
}

impl PyCallable {
    fn raised(&self, err: PyErr) -> InvocationError {
        InvocationError::Raised { callable: self.name.clone(), message: err.to_string() }
    }
}

impl Invocable for PyCallable {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn return_type(&self) -> Option<&TypeExpr> {
        self.returns.as_ref()
    }

    fn invoke(&self, _receiver: Option<&Value>, args: &mut [Value]) -> Result<Option<Value>, InvocationError> {
        Python::attach(|py| {
            let mut items = Vec::with_capacity(args.len());
            for (arg, parameter) in args.iter().zip(&self.parameters) {
                let object = arg.downcast_ref::<Py<PyAny>>().ok_or_else(|| InvocationError::ArgumentType {
                    parameter: parameter.name.clone(),
                    found: arg.type_name(),
                })?;
                items.push(object.clone_ref(py));
            }
            let tuple = PyTuple::new(py, items).map_err(|e| self.raised(e))?;
            let result = self.func.bind(py).call1(tuple).map_err(|e| self.raised(e))?;
            Ok(self.returns.as_ref().map(|_| Value::new(result.unbind())))
        })
    }
}

#[pyclass(name = "_Flow")]
pub struct PyFlow {
    flow: Flow,
    handles: Vec<Option<Arc<Module>>>,
}

impl PyFlow {
    fn module(&self, handle: usize) -> PyResult<&Arc<Module>> {
        self.handles
            .get(handle)
            .and_then(Option::as_ref)
            .ok_or_else(|| PyIndexError::new_err(format!("Invalid module handle {handle}")))
    }

    fn insert(&mut self, module: Arc<Module>) -> PyResult<usize> {
        self.flow.add_module(module.clone()).map_err(|e| PyValueError::new_err(e.to_string()))?;
        self.handles.push(Some(module));
        Ok(self.handles.len() - 1)
    }
}

#[pymethods]
impl PyFlow {
    #[new]
    #[pyo3(signature = (validate_links = false))]
    pub fn new(validate_links: bool) -> Self {
        let options = FlowOptions { validate_links, ..FlowOptions::default() };
        Self { flow: Flow::new().with_options(options), handles: Vec::new() }
    }

    /// Adds a source module emitting `value` with the declared type `ty`.
    pub fn add_constant(&mut self, ty: &str, value: Py<PyAny>) -> PyResult<usize> {
        let module = Constant::with_value(parse(ty)?, Value::new(value))
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        self.insert(module)
    }

    /// Adds a module calling `func`. `parameters` lists `(name, type)` pairs;
    /// every parameter is passed by value.
    #[pyo3(signature = (name, func, parameters, returns = None))]
    pub fn add_callable(
        &mut self,
        name: String,
        func: Py<PyAny>,
        parameters: Vec<(String, String)>,
        returns: Option<String>,
    ) -> PyResult<usize> {
        let parameters = parameters
            .into_iter()
            .map(|(name, ty)| Ok(Parameter::primitive(name, parse(&ty)?)))
            .collect::<PyResult<Vec<_>>>()?;
        let returns = returns.as_deref().map(parse).transpose()?;
        let callable = PyCallable { name, parameters, returns, func };
        let module = AdapterComputation::new(Arc::new(callable))
            .into_module()
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        self.insert(module)
    }

    pub fn connect(&mut self, source: usize, output: usize, target: usize, input: usize) -> PyResult<bool> {
        let link = Link::connect(self.module(source)?, output, self.module(target)?, input)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        self.flow.add_link(link).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    pub fn remove_module(&mut self, handle: usize) -> PyResult<bool> {
        let module = self.module(handle)?.clone();
        self.handles[handle] = None;
        Ok(self.flow.remove_module(&module))
    }

    pub fn execute(&self, handle: usize) -> PyResult<()> {
        self.module(handle)?
            .execute()
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }

    /// Runs every module once in dependency order. Returns the number executed.
    pub fn run(&self) -> PyResult<usize> {
        FlowExecutor::new(&self.flow)
            .run()
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }

    /// The last value produced on an output, if it came from Python.
    pub fn output(&self, py: Python<'_>, handle: usize, index: usize) -> PyResult<Option<Py<PyAny>>> {
        let value = self.module(handle)?.last_output(index);
        Ok(value.and_then(|v| v.downcast_ref::<Py<PyAny>>().map(|object| object.clone_ref(py))))
    }

    /// Human-readable messages for every invalid link.
    pub fn validate(&self) -> Vec<String> {
        match FlowValidator::new(&self.flow).validate() {
            Ok(()) => Vec::new(),
            Err(errors) => errors.into_iter().map(|e| e.message).collect(),
        }
    }

    pub fn module_count(&self) -> usize {
        self.flow.modules().len()
    }

    pub fn link_count(&self) -> usize {
        self.flow.links().len()
    }
}
