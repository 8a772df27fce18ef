//! A runtime-typed dataflow graph: generic module kinds whose type variables
//! are instantiated per instance, a flow of modules and links, and a
//! synchronous execution protocol with listeners.
pub mod analysis;
pub mod computation;
pub mod config;
pub mod graph;
pub mod store;
pub mod type_system;
pub mod validation;

#[cfg(feature = "python")]
mod bindings;

pub use computation::{Computation, ExecutionError, FlowExecutor};
pub use config::FlowOptions;
pub use graph::{Flow, FlowError, Link, Module, ModuleInfo, SlotInfo, Value};
pub use type_system::{FreeVariableContext, TypeContext, TypeExpr, TypeVariable};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// A simple function to confirm the Rust core is callable from Python.
#[cfg(feature = "python")]
#[pyfunction]
fn rust_core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// This function defines the `_core` Python module.
#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(rust_core_version, m)?)?;
    m.add_class::<bindings::python::PyFlow>()?;
    Ok(())
}
