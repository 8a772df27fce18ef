//! Runs modules: the computation seam, the execution protocol, built-in and
//! adapted module kinds, and a whole-flow executor.
pub mod adapter;
pub mod builtin;
pub mod engine;
pub mod error;
pub mod process;
pub mod scheduler;

pub use adapter::{AdapterComputation, FunctionCallable, Invocable, InvocationError, OutputRole, Parameter};
pub use builtin::{Constant, Identity};
pub use engine::{ExecutionPhase, ModuleExecutionListener};
pub use error::ExecutionError;
pub use process::{from_fn, BoxError, Computation, FnComputation, ProcessContext, Progress};
pub use scheduler::FlowExecutor;
