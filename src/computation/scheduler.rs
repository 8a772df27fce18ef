//! An executor that runs a whole flow in dependency order.
//!
//! Modules know nothing about scheduling; this collaborator decides the order
//! and calls `Module::execute`. The first failure stops the run and is
//! returned.
use super::error::ExecutionError;
use crate::analysis::topology;
use crate::graph::{Flow, Module, ModuleId};
use rayon::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
pub struct FlowExecutor<'a> {
    flow: &'a Flow,
}

impl<'a> FlowExecutor<'a> {
    pub fn new(flow: &'a Flow) -> Self {
        Self { flow }
    }

    /// Executes every module once, one at a time, in topological order.
    pub fn run(&self) -> Result<usize, ExecutionError> {
        let order = topology::execution_order(self.flow)?;
        tracing::debug!(modules = order.len(), "running flow");
        run_in_order(&order)
    }

    /// Executes level by level; modules of one level run on the rayon pool.
    pub fn run_parallel(&self) -> Result<usize, ExecutionError> {
        let levels = topology::execution_levels(self.flow)?;
        tracing::debug!(levels = levels.len(), "running flow in parallel");
        let mut executed = 0;
        for level in &levels {
            level.par_iter().try_for_each(|module| module.execute())?;
            executed += level.len();
        }
        Ok(executed)
    }

    /// Re-executes `changed` and everything downstream of it, in order.
    pub fn run_downstream(&self, changed: &[ModuleId]) -> Result<usize, ExecutionError> {
        let affected = topology::downstream_of(self.flow, changed);
        let order: Vec<Arc<Module>> = topology::execution_order(self.flow)?
            .into_iter()
            .filter(|module| affected.contains(&module.id()))
            .collect();
        tracing::debug!(modules = order.len(), "re-running downstream modules");
        run_in_order(&order)
    }
}

fn run_in_order(order: &[Arc<Module>]) -> Result<usize, ExecutionError> {
    for module in order {
        module.execute()?;
    }
    Ok(order.len())
}
