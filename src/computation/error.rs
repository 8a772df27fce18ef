//! Defines the error types for module execution.
use crate::graph::FlowError;
use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ExecutionError {
    /// The computation of `module` failed. The cause is shared so the same
    /// error can be handed to listeners and returned to the caller.
    #[error("module '{module}' failed: {source}")]
    Failed {
        module: String,
        #[source]
        source: Arc<dyn Error + Send + Sync>,
    },

    #[error("cannot schedule flow: {0}")]
    Scheduling(#[from] FlowError),
}

impl ExecutionError {
    /// The label of the module that failed, if the failure came from a computation.
    pub fn module(&self) -> Option<&str> {
        match self {
            ExecutionError::Failed { module, .. } => Some(module),
            ExecutionError::Scheduling(_) => None,
        }
    }
}
